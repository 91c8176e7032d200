//! Filesystem bridge service
//!
//! `BridgeService` implements every RPC operation against a [`FileSystem`]
//! backend. Opened streams live in two independent handle stores, one for read
//! streams and one for write streams, so callers only ever hold integer
//! handles.
//!
//! All methods block on filesystem I/O; the server calls them from the
//! runtime's blocking pool.
//!
//! # Unknown handles
//!
//! `read` reports an unknown handle as an error, while `write`, `close_read`
//! and `close_write` answer `false`. Callers rely on this difference.

use crate::codec::Codec;
use crate::error::{HandleKind, ServiceError, ServiceResult};
use crate::handle_store::{lock_resource, Closeable, HandleStore};
use crate::namespace::FsPath;
use crate::protocol::messages::{BlockLocation, FileStatus};
use crate::stats::BridgeStats;
use crate::stream::{InputStream, OutputStream};
use crate::traits::{BlockMetadata, FileMetadata, FileSystem};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Largest read offset accepted by `read`
pub const MAX_READ_OFFSET: i64 = i32::MAX as i64;

/// Most bytes a single `read` returns (8 MiB); larger requests are shortened
pub const MAX_READ_SIZE: usize = 8 * 1024 * 1024;

/// Bridge between RPC calls and a filesystem backend
pub struct BridgeService<F: FileSystem> {
    fs: F,
    read_handles: HandleStore<InputStream>,
    write_handles: HandleStore<OutputStream>,
    stats: BridgeStats,
}

impl<F: FileSystem> std::fmt::Debug for BridgeService<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeService")
            .field("backend", &self.fs.name())
            .field("endpoint", self.fs.endpoint())
            .field("read_handles", &self.read_handles)
            .field("write_handles", &self.write_handles)
            .finish_non_exhaustive()
    }
}

impl<F: FileSystem> BridgeService<F> {
    /// Create a service with empty handle stores
    #[must_use]
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            read_handles: HandleStore::new("read"),
            write_handles: HandleStore::new("write"),
            stats: BridgeStats::new(),
        }
    }

    /// The backing filesystem
    #[must_use]
    pub const fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Counters for the calls served so far
    #[must_use]
    pub const fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Number of live read handles
    #[must_use]
    pub fn open_read_handles(&self) -> usize {
        self.read_handles.len()
    }

    /// Number of live write handles
    #[must_use]
    pub fn open_write_handles(&self) -> usize {
        self.write_handles.len()
    }

    /// Open `path` for reading and return a read handle
    ///
    /// Files with a known compression suffix are decompressed transparently.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidArgument`] for malformed paths and
    /// [`ServiceError::Io`] when the file cannot be opened.
    pub fn open(&self, path: &str) -> ServiceResult<i64> {
        self.track(self.open_inner(path))
    }

    fn open_inner(&self, path: &str) -> ServiceResult<i64> {
        let qualified = self.resolve("open", path)?;
        info!(
            "creating new read handle on {} for: {}",
            self.fs.endpoint(),
            path
        );
        let raw = self
            .fs
            .open_read(&qualified)
            .map_err(|e| ServiceError::from_fs("open", &e))?;
        let stream = InputStream::new(qualified.to_string(), raw, Codec::for_path(&qualified));

        let handle = self.read_handles.allocate(stream);
        self.stats.increment_streams_opened();
        Ok(handle)
    }

    /// Create (or truncate) `path` for writing and return a write handle
    ///
    /// Missing parent directories are created. Files with a known compression
    /// suffix are compressed transparently.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidArgument`] for malformed paths and
    /// [`ServiceError::Io`] when the file cannot be created.
    pub fn create(&self, path: &str) -> ServiceResult<i64> {
        self.track(self.create_inner(path))
    }

    fn create_inner(&self, path: &str) -> ServiceResult<i64> {
        let qualified = self.resolve("create", path)?;
        info!(
            "creating new write handle on {} for: {}",
            self.fs.endpoint(),
            path
        );
        let raw = self
            .fs
            .open_write(&qualified)
            .map_err(|e| ServiceError::from_fs("create", &e))?;
        let stream = OutputStream::new(qualified.to_string(), raw, Codec::for_path(&qualified));

        let handle = self.write_handles.allocate(stream);
        self.stats.increment_streams_created();
        Ok(handle)
    }

    /// Read up to `size` bytes at `offset` of the decoded content
    ///
    /// At most [`MAX_READ_SIZE`] bytes are returned per call. Below that,
    /// fewer bytes than requested are returned only at end of stream.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::UnknownHandle`] if `handle` is not a live read handle
    /// - [`ServiceError::InvalidArgument`] if `offset` exceeds [`MAX_READ_OFFSET`],
    ///   `offset` or `size` is negative, or the read would seek backwards in a
    ///   compressed stream; the stream is left untouched
    /// - [`ServiceError::Io`] on stream failures
    pub fn read(&self, handle: i64, offset: i64, size: i32) -> ServiceResult<Vec<u8>> {
        self.track(self.read_inner(handle, offset, size))
    }

    fn read_inner(&self, handle: i64, offset: i64, size: i32) -> ServiceResult<Vec<u8>> {
        let stream = self
            .read_handles
            .get(handle)
            .ok_or(ServiceError::UnknownHandle {
                kind: HandleKind::Read,
                handle,
            })?;

        if offset > MAX_READ_OFFSET {
            return Err(ServiceError::InvalidArgument(format!(
                "offset {offset} exceeds the supported maximum of {MAX_READ_OFFSET}"
            )));
        }
        let (Ok(offset), Ok(size)) = (u64::try_from(offset), usize::try_from(size)) else {
            return Err(ServiceError::InvalidArgument(format!(
                "negative offset or size: offset={offset}, size={size}"
            )));
        };

        let mut input = lock_resource(&stream);
        if !input.can_read_at(offset) {
            return Err(ServiceError::InvalidArgument(format!(
                "cannot seek backwards in compressed stream {}: at {}, requested {}",
                input.path(),
                input.position(),
                offset
            )));
        }
        let data = input
            .read_at(offset, size.min(MAX_READ_SIZE))
            .map_err(|e| ServiceError::from_io("read", &e))?;
        drop(input);
        self.stats.add_bytes_read(data.len() as u64);
        debug!("read {} bytes from handle {} at {}", data.len(), handle, offset);
        Ok(data)
    }

    /// Append `data` to a write handle
    ///
    /// Returns `false` (and writes nothing) if `handle` is not a live write
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Io`] if the underlying write fails.
    pub fn write(&self, handle: i64, data: &[u8]) -> ServiceResult<bool> {
        self.track(self.write_inner(handle, data))
    }

    fn write_inner(&self, handle: i64, data: &[u8]) -> ServiceResult<bool> {
        let Some(stream) = self.write_handles.get(handle) else {
            debug!("write to unknown handle {}", handle);
            return Ok(false);
        };

        lock_resource(&stream)
            .append(data)
            .map_err(|e| ServiceError::from_io("write", &e))?;
        self.stats.add_bytes_written(data.len() as u64);
        Ok(true)
    }

    /// Close and release a read handle
    ///
    /// Returns whether the handle was live.
    pub fn close_read(&self, handle: i64) -> bool {
        info!("releasing read handle: {}", handle);
        self.release(&self.read_handles, handle)
    }

    /// Close and release a write handle, flushing buffered data
    ///
    /// Returns whether the handle was live. Flush failures are logged and
    /// suppressed.
    pub fn close_write(&self, handle: i64) -> bool {
        info!("releasing write handle: {}", handle);
        self.release(&self.write_handles, handle)
    }

    fn release<R: Closeable>(&self, store: &HandleStore<R>, handle: i64) -> bool {
        let released = store.release(handle);
        if released {
            self.stats.add_handles_released(1);
        }
        released
    }

    /// List a directory, or describe a single file
    ///
    /// Returns `Ok(None)` when the path does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidArgument`] for malformed paths and
    /// [`ServiceError::Io`] for any other failure.
    pub fn list_status(&self, path: &str) -> ServiceResult<Option<Vec<FileStatus>>> {
        self.track(self.list_status_inner(path))
    }

    fn list_status_inner(&self, path: &str) -> ServiceResult<Option<Vec<FileStatus>>> {
        let qualified = self.resolve("listStatus", path)?;
        match self.fs.list(&qualified) {
            Ok(entries) => Ok(Some(entries.iter().map(file_status).collect())),
            Err(e) if e.is_not_found() => {
                warn!("listStatus: {}", e);
                Ok(None)
            }
            Err(e) => Err(ServiceError::from_fs("listStatus", &e)),
        }
    }

    /// Block placement for the byte range `[start, start + length)` of a file
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidArgument`] for malformed paths or negative
    /// arguments and [`ServiceError::Io`] for any other failure, including a
    /// missing file.
    pub fn get_file_block_locations(
        &self,
        path: &str,
        start: i64,
        length: i64,
    ) -> ServiceResult<Vec<BlockLocation>> {
        self.track(self.get_file_block_locations_inner(path, start, length))
    }

    fn get_file_block_locations_inner(
        &self,
        path: &str,
        start: i64,
        length: i64,
    ) -> ServiceResult<Vec<BlockLocation>> {
        let qualified = self.resolve("getFileBlockLocations", path)?;
        let blocks = self
            .fs
            .block_locations(&qualified, start, length)
            .map_err(|e| ServiceError::from_fs("getFileBlockLocations", &e))?;
        Ok(blocks.iter().map(block_location).collect())
    }

    /// Answer an operation this service does not implement
    ///
    /// # Errors
    ///
    /// Always returns [`ServiceError::Unsupported`] naming `operation`.
    pub fn unsupported<T>(&self, operation: &str) -> ServiceResult<T> {
        debug!("rejecting unsupported operation {}", operation);
        self.track(Err(ServiceError::Unsupported(operation.to_string())))
    }

    /// Release every live handle in both stores
    ///
    /// Returns how many handles were released. Close errors are logged and
    /// suppressed.
    pub fn release_all_handles(&self) -> usize {
        let read = self.read_handles.release_all();
        let write = self.write_handles.release_all();
        if read + write > 0 {
            info!(
                "released {} read and {} write handles left open",
                read, write
            );
        }
        self.stats.add_handles_released((read + write) as u64);
        read + write
    }

    fn resolve(&self, operation: &str, path: &str) -> ServiceResult<FsPath> {
        let parsed = FsPath::parse(path).map_err(|e| ServiceError::from_fs(operation, &e))?;
        self.fs
            .resolve(&parsed)
            .map_err(|e| ServiceError::from_fs(operation, &e))
    }

    fn track<T>(&self, result: ServiceResult<T>) -> ServiceResult<T> {
        if result.is_err() {
            self.stats.increment_errors();
        }
        result
    }
}

/// Convert backend metadata into a wire record
fn file_status<M: FileMetadata>(metadata: &M) -> FileStatus {
    FileStatus {
        path: metadata.path().to_string(),
        length: clamp_i64(metadata.len()),
        is_dir: metadata.is_dir(),
        block_replication: i16::try_from(metadata.replication()).unwrap_or(i16::MAX),
        block_size: clamp_i64(metadata.block_size()),
        modification_time: epoch_millis(metadata.modified()),
        permission: permission_string(metadata.permissions()),
        owner: metadata.owner().to_string(),
        group: metadata.group().to_string(),
    }
}

fn block_location(block: &BlockMetadata) -> BlockLocation {
    BlockLocation {
        hosts: block.hosts.clone(),
        names: block.names.clone(),
        offset: clamp_i64(block.offset),
        length: clamp_i64(block.length),
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Milliseconds since the Unix epoch; times before the epoch map to 0
fn epoch_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Render permission bits as `rwxr-xr-x`
///
/// The sticky bit replaces the last character with `t` (others may execute)
/// or `T` (they may not).
#[must_use]
pub fn permission_string(mode: u32) -> String {
    const SYMBOLS: [char; 3] = ['r', 'w', 'x'];

    let mut rendered: Vec<char> = (0..9)
        .map(|bit| {
            if mode & (0o400 >> bit) != 0 {
                SYMBOLS[bit % 3]
            } else {
                '-'
            }
        })
        .collect();
    if mode & 0o1000 != 0 {
        rendered[8] = if mode & 0o001 != 0 { 't' } else { 'T' };
    }
    rendered.into_iter().collect()
}
