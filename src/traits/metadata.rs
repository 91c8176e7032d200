//! FileMetadata trait and block placement records
//!
//! Backends describe namespace entries through [`FileMetadata`] and block
//! placement through [`BlockMetadata`]. The service converts both into wire
//! records, so nothing here is serialized directly.

use crate::namespace::FsPath;
use std::time::SystemTime;

/// Status of a single namespace entry
///
/// This trait provides the attributes reported by `listStatus` regardless of
/// how the backend stores them.
///
/// # Examples
///
/// ```rust,ignore
/// for entry in filesystem.list(&path)? {
///     println!("{} {} bytes", entry.path(), entry.len());
/// }
/// ```
pub trait FileMetadata: Send + Sync + 'static {
    /// Fully qualified path of the entry
    fn path(&self) -> &FsPath;

    /// Length in bytes; 0 for directories
    fn len(&self) -> u64;

    /// Whether the entry has no content
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is a directory
    fn is_dir(&self) -> bool;

    /// Number of replicas kept of each block
    fn replication(&self) -> u16;

    /// Block size used for the entry, in bytes
    fn block_size(&self) -> u64;

    /// Last modification time
    fn modified(&self) -> SystemTime;

    /// Permission bits as a mode value (e.g., 0o755, sticky bit included)
    fn permissions(&self) -> u32;

    /// Owner name
    fn owner(&self) -> &str;

    /// Group name
    fn group(&self) -> &str;
}

/// Placement of one block of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMetadata {
    /// Hosts holding a replica of the block
    pub hosts: Vec<String>,
    /// `host:port` names of the storage nodes, parallel to `hosts`
    pub names: Vec<String>,
    /// Offset of the block within the file
    pub offset: u64,
    /// Length of the block in bytes
    pub length: u64,
}

impl BlockMetadata {
    /// Offset one past the last byte of the block
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.length
    }
}
