//! FileSystem trait for the served namespace
//!
//! The bridge service talks to its backing store exclusively through this
//! trait. Calls are blocking; the server runs them on the runtime's blocking
//! pool.

use crate::error::FsResult;
use crate::namespace::{FsEndpoint, FsPath};
use crate::stream::SeekableRead;
use std::io::Write;

use super::{BlockMetadata, FileMetadata};

/// Filesystem capability consumed by the bridge service
///
/// # Type Parameters
///
/// * `Metadata` - The entry status type returned by listings
///
/// # Examples
///
/// ```rust,ignore
/// let fs = LocalFileSystem::new(FsEndpoint::new("localhost", 8020), "/srv/data");
/// let path = fs.resolve(&FsPath::parse("/logs/today.gz")?)?;
/// let reader = fs.open_read(&path)?;
/// ```
pub trait FileSystem: Send + Sync + 'static {
    /// The entry status type for this filesystem
    type Metadata: FileMetadata;

    /// Endpoint this filesystem was configured for
    fn endpoint(&self) -> &FsEndpoint;

    /// Qualify `path` against this filesystem
    ///
    /// # Errors
    ///
    /// Returns `Err(FsError)` if:
    /// - The path names a different filesystem
    /// - The path cannot be represented by this backend
    fn resolve(&self, path: &FsPath) -> FsResult<FsPath>;

    /// Open an existing file for reading
    ///
    /// # Errors
    ///
    /// Returns `Err(FsError)` if:
    /// - The file doesn't exist
    /// - The path is a directory
    /// - Permission is denied
    fn open_read(&self, path: &FsPath) -> FsResult<Box<dyn SeekableRead>>;

    /// Create or truncate a file for writing, creating missing parents
    ///
    /// # Errors
    ///
    /// Returns `Err(FsError)` if the file cannot be created.
    fn open_write(&self, path: &FsPath) -> FsResult<Box<dyn Write + Send>>;

    /// List a directory, or return the entry itself for a file
    ///
    /// Entries are ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `Err(FsError::NotFound)` if the path doesn't exist, and other
    /// variants for I/O failures.
    fn list(&self, path: &FsPath) -> FsResult<Vec<Self::Metadata>>;

    /// Blocks covering the byte range `[start, start + length)` of a file
    ///
    /// # Errors
    ///
    /// Returns `Err(FsError)` if the file doesn't exist or `start`/`length`
    /// are negative.
    fn block_locations(&self, path: &FsPath, start: i64, length: i64)
        -> FsResult<Vec<BlockMetadata>>;

    /// Get the name of this filesystem backend
    fn name(&self) -> &'static str {
        "unknown"
    }
}
