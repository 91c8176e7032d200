//! Compression codecs selected by file suffix
//!
//! Files whose name ends in a known suffix are transparently decompressed when
//! opened for reading and compressed when created for writing. Any other name
//! gets the identity transform.

use crate::namespace::FsPath;
use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use std::io::{Read, Write};

/// A known compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// gzip container (`.gz`)
    Gzip,
    /// zlib-wrapped deflate stream (`.deflate`)
    Deflate,
    /// bzip2 stream (`.bz2`)
    Bzip2,
}

impl Codec {
    /// All known codecs
    pub const ALL: [Self; 3] = [Self::Gzip, Self::Deflate, Self::Bzip2];

    /// File suffix that selects this codec
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Gzip => ".gz",
            Self::Deflate => ".deflate",
            Self::Bzip2 => ".bz2",
        }
    }

    /// Codec for a file name, if its suffix is known
    #[must_use]
    pub fn for_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|codec| name.len() > codec.suffix().len() && name.ends_with(codec.suffix()))
    }

    /// Codec for the last component of `path`
    #[must_use]
    pub fn for_path(path: &FsPath) -> Option<Self> {
        path.name().and_then(Self::for_name)
    }

    /// Wrap a compressed source in a decoder
    #[must_use]
    pub fn decoder<R: Read + Send + 'static>(self, source: R) -> Box<dyn Read + Send> {
        match self {
            Self::Gzip => Box::new(MultiGzDecoder::new(source)),
            Self::Deflate => Box::new(ZlibDecoder::new(source)),
            Self::Bzip2 => Box::new(MultiBzDecoder::new(source)),
        }
    }

    /// Wrap a sink in an encoder
    #[must_use]
    pub fn encoder<W: Write + Send + 'static>(self, sink: W) -> Encoder<W> {
        match self {
            Self::Gzip => Encoder::Gzip(GzEncoder::new(sink, Compression::default())),
            Self::Deflate => Encoder::Deflate(ZlibEncoder::new(sink, Compression::default())),
            Self::Bzip2 => Encoder::Bzip2(BzEncoder::new(sink, bzip2::Compression::default())),
        }
    }
}

/// Compressing writer that must be finished to emit its trailer
pub enum Encoder<W: Write> {
    /// gzip encoder
    Gzip(GzEncoder<W>),
    /// zlib encoder
    Deflate(ZlibEncoder<W>),
    /// bzip2 encoder
    Bzip2(BzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    /// Flush remaining compressed data and the trailer, returning the sink
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails.
    pub fn finish(self) -> std::io::Result<W> {
        match self {
            Self::Gzip(encoder) => encoder.finish(),
            Self::Deflate(encoder) => encoder.finish(),
            Self::Bzip2(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Gzip(encoder) => encoder.write(buf),
            Self::Deflate(encoder) => encoder.write(buf),
            Self::Bzip2(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Gzip(encoder) => encoder.flush(),
            Self::Deflate(encoder) => encoder.flush(),
            Self::Bzip2(encoder) => encoder.flush(),
        }
    }
}
