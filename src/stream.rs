//! Stream resources held in the handle stores
//!
//! [`InputStream`] and [`OutputStream`] wrap the raw streams returned by a
//! filesystem backend, apply the codec chosen for the file, and implement
//! [`Closeable`] so they can be registered in a [`crate::HandleStore`].
//!
//! # Read positioning
//!
//! `read_at(offset, size)` always reads from the absolute `offset` of the
//! decoded content:
//! - uncompressed streams seek to `offset` when it differs from the cursor
//! - decompressed streams are forward-only: a larger offset discards the bytes
//!   in between, a smaller one fails with `InvalidInput`

use crate::codec::{Codec, Encoder};
use crate::handle_store::Closeable;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Upper bound on the buffer preallocated for a single read
const MAX_READ_PREALLOC: usize = 1024 * 1024;

/// Byte source that supports random access
pub trait SeekableRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableRead for T {}

enum Source {
    Plain(Box<dyn SeekableRead>),
    Decoded(Box<dyn Read + Send>),
}

/// An open read stream
pub struct InputStream {
    path: String,
    source: Option<Source>,
    position: u64,
}

impl std::fmt::Debug for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("path", &self.path)
            .field("position", &self.position)
            .field("open", &self.source.is_some())
            .finish_non_exhaustive()
    }
}

impl InputStream {
    /// Wrap a raw stream, decoding it with `codec` when one applies
    #[must_use]
    pub fn new(path: impl Into<String>, raw: Box<dyn SeekableRead>, codec: Option<Codec>) -> Self {
        let source = match codec {
            Some(codec) => Source::Decoded(codec.decoder(raw)),
            None => Source::Plain(raw),
        };
        Self {
            path: path.into(),
            source: Some(source),
            position: 0,
        }
    }

    /// Path the stream was opened for
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current position in the decoded content
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Whether the stream transparently decompresses its content
    #[must_use]
    pub const fn is_decoded(&self) -> bool {
        matches!(self.source, Some(Source::Decoded(_)))
    }

    /// Whether `read_at(offset, ..)` can be served without seeking backwards
    /// in a decompressed stream
    #[must_use]
    pub const fn can_read_at(&self, offset: u64) -> bool {
        !(self.is_decoded() && offset < self.position)
    }

    /// Read up to `size` bytes starting at `offset`
    ///
    /// Fewer bytes are returned only at end of stream. Bytes consumed before a
    /// failure still advance the position, so a retry at the same offset
    /// never returns data from somewhere else.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when seeking backwards in a decompressed stream,
    /// and any I/O error from the underlying stream. Fails if the stream was
    /// closed.
    pub fn read_at(&mut self, offset: u64, size: usize) -> io::Result<Vec<u8>> {
        let Some(source) = self.source.as_mut() else {
            return Err(closed(&self.path));
        };

        if offset != self.position {
            match source {
                Source::Plain(reader) => {
                    reader.seek(SeekFrom::Start(offset))?;
                    self.position = offset;
                }
                Source::Decoded(reader) => {
                    if offset < self.position {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!(
                                "cannot seek backwards in compressed stream {}: at {}, requested {}",
                                self.path, self.position, offset
                            ),
                        ));
                    }
                    let gap = offset - self.position;
                    let (skipped, result) = copy_counted(reader, gap, &mut io::sink());
                    self.position += skipped;
                    result?;
                    if skipped < gap {
                        // Offset lies past the end of the content
                        return Ok(Vec::new());
                    }
                }
            }
        }

        let mut data = Vec::with_capacity(size.min(MAX_READ_PREALLOC));
        let (consumed, result) = match source {
            Source::Plain(reader) => copy_counted(reader, size as u64, &mut data),
            Source::Decoded(reader) => copy_counted(reader, size as u64, &mut data),
        };
        self.position += consumed;
        result?;
        Ok(data)
    }
}

/// Reader adapter that counts the bytes handed out by `inner`
struct Counting<'a, R: ?Sized> {
    inner: &'a mut R,
    count: u64,
}

impl<R: Read + ?Sized> Read for Counting<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Copy up to `limit` bytes from `reader` into `out`
///
/// Returns how many bytes left `reader` together with the outcome, so callers
/// can account for them even when the copy fails partway.
fn copy_counted<R, W>(reader: &mut R, limit: u64, out: &mut W) -> (u64, io::Result<u64>)
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut counting = Counting {
        inner: reader,
        count: 0,
    };
    let result = io::copy(&mut Read::take(&mut counting, limit), out);
    (counting.count, result)
}

impl Closeable for InputStream {
    fn close(&mut self) -> io::Result<()> {
        self.source.take();
        Ok(())
    }
}

enum Sink {
    Plain(Box<dyn Write + Send>),
    Encoded(Encoder<Box<dyn Write + Send>>),
}

/// An open write stream
pub struct OutputStream {
    path: String,
    sink: Option<Sink>,
    bytes_written: u64,
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("path", &self.path)
            .field("bytes_written", &self.bytes_written)
            .field("open", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl OutputStream {
    /// Wrap a raw sink, encoding with `codec` when one applies
    #[must_use]
    pub fn new(path: impl Into<String>, raw: Box<dyn Write + Send>, codec: Option<Codec>) -> Self {
        let sink = match codec {
            Some(codec) => Sink::Encoded(codec.encoder(raw)),
            None => Sink::Plain(raw),
        };
        Self {
            path: path.into(),
            sink: Some(sink),
            bytes_written: 0,
        }
    }

    /// Path the stream was created for
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Uncompressed bytes appended so far
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append `data` to the stream
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying sink, or an error if the
    /// stream was closed.
    pub fn append(&mut self, data: &[u8]) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(Sink::Plain(writer)) => writer.write_all(data)?,
            Some(Sink::Encoded(encoder)) => encoder.write_all(data)?,
            None => return Err(closed(&self.path)),
        }
        self.bytes_written += data.len() as u64;
        Ok(())
    }
}

impl Closeable for OutputStream {
    fn close(&mut self) -> io::Result<()> {
        match self.sink.take() {
            Some(Sink::Plain(mut writer)) => writer.flush(),
            Some(Sink::Encoded(encoder)) => encoder.finish()?.flush(),
            None => Ok(()),
        }
    }
}

fn closed(path: &str) -> io::Error {
    io::Error::other(format!("stream for {path} is closed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    /// Sink whose contents stay observable after the stream takes ownership
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn plain(content: &[u8]) -> InputStream {
        InputStream::new("/plain", Box::new(Cursor::new(content.to_vec())), None)
    }

    fn gzipped(content: &[u8]) -> InputStream {
        let mut encoder = Codec::Gzip.encoder(Vec::new());
        encoder.write_all(content).unwrap();
        let compressed = encoder.finish().unwrap();
        InputStream::new("/data.gz", Box::new(Cursor::new(compressed)), Some(Codec::Gzip))
    }

    #[test]
    fn test_sequential_reads_advance() {
        let mut stream = plain(b"hello world");
        assert_eq!(stream.read_at(0, 5).unwrap(), b"hello");
        assert_eq!(stream.read_at(5, 6).unwrap(), b" world");
        assert_eq!(stream.position(), 11);
        assert!(stream.read_at(11, 10).unwrap().is_empty());
    }

    #[test]
    fn test_short_read_at_end() {
        let mut stream = plain(b"abc");
        assert_eq!(stream.read_at(1, 100).unwrap(), b"bc");
    }

    #[test]
    fn test_plain_stream_seeks_backwards() {
        let mut stream = plain(b"0123456789");
        assert_eq!(stream.read_at(6, 2).unwrap(), b"67");
        assert_eq!(stream.read_at(2, 3).unwrap(), b"234");
        assert_eq!(stream.position(), 5);
    }

    #[test]
    fn test_decoded_stream_skips_forward() {
        let mut stream = gzipped(b"0123456789");
        assert!(stream.is_decoded());
        assert_eq!(stream.read_at(4, 3).unwrap(), b"456");
        assert_eq!(stream.read_at(8, 5).unwrap(), b"89");
    }

    #[test]
    fn test_decoded_stream_rejects_backward_seek() {
        let mut stream = gzipped(b"0123456789");
        stream.read_at(0, 6).unwrap();
        let err = stream.read_at(1, 2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        // The failed request leaves the cursor untouched
        assert_eq!(stream.read_at(6, 4).unwrap(), b"6789");
    }

    #[test]
    fn test_decoded_stream_offset_past_end() {
        let mut stream = gzipped(b"abc");
        assert!(stream.read_at(10, 4).unwrap().is_empty());
        assert_eq!(stream.position(), 3);
    }

    /// Hands out one byte per call and fails once when reaching `fail_at`
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        fail_at: Option<usize>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail_at == Some(self.pos) {
                self.fail_at = None;
                return Err(io::Error::other("transient"));
            }
            if buf.is_empty() || self.pos >= self.data.len() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    impl Seek for Trickle {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(io::Error::other("not seekable"))
        }
    }

    #[test]
    fn test_failed_skip_keeps_decoded_position_aligned() {
        let mut encoder = Codec::Gzip.encoder(Vec::new());
        encoder.write_all(b"0123456789abcdefghij").unwrap();
        let compressed = encoder.finish().unwrap();

        // Past the 10-byte gzip header, before the tenth decoded byte
        let source = Trickle {
            data: compressed,
            pos: 0,
            fail_at: Some(12),
        };
        let mut stream = InputStream::new("/flaky.gz", Box::new(source), Some(Codec::Gzip));

        assert!(stream.read_at(10, 2).is_err());
        assert!(stream.position() <= 10);
        assert_eq!(stream.read_at(10, 2).unwrap(), b"ab");
        assert_eq!(stream.position(), 12);
    }

    #[test]
    fn test_failed_read_advances_past_consumed_bytes() {
        let source = Trickle {
            data: b"hello world".to_vec(),
            pos: 0,
            fail_at: Some(3),
        };
        let mut stream = InputStream::new("/flaky", Box::new(source), None);

        assert!(stream.read_at(0, 5).is_err());
        assert_eq!(stream.position(), 3);
        // The cursor matches what the source handed out
        assert_eq!(stream.read_at(3, 2).unwrap(), b"lo");
    }

    #[test]
    fn test_can_read_at() {
        let mut stream = gzipped(b"0123456789");
        stream.read_at(0, 4).unwrap();
        assert!(stream.can_read_at(4));
        assert!(stream.can_read_at(9));
        assert!(!stream.can_read_at(3));

        let mut stream = plain(b"0123456789");
        stream.read_at(0, 4).unwrap();
        assert!(stream.can_read_at(0));
    }

    #[test]
    fn test_read_after_close_fails() {
        let mut stream = plain(b"abc");
        stream.close().unwrap();
        assert!(stream.read_at(0, 1).is_err());
        // Closing twice is harmless
        stream.close().unwrap();
    }

    #[test]
    fn test_output_close_finishes_encoder() {
        let sink = SharedSink::default();
        let mut stream =
            OutputStream::new("/out.gz", Box::new(sink.clone()), Some(Codec::Gzip));
        stream.append(b"hello ").unwrap();
        stream.append(b"gzip").unwrap();
        assert_eq!(stream.bytes_written(), 10);
        stream.close().unwrap();

        let compressed = sink.0.lock().unwrap().clone();
        let mut decoded = String::new();
        Codec::Gzip
            .decoder(Cursor::new(compressed))
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "hello gzip");
    }

    #[test]
    fn test_append_after_close_fails() {
        let sink = SharedSink::default();
        let mut stream = OutputStream::new("/out", Box::new(sink.clone()), None);
        stream.append(b"data").unwrap();
        stream.close().unwrap();
        assert!(stream.append(b"more").is_err());
        assert_eq!(sink.0.lock().unwrap().as_slice(), b"data");
    }
}
