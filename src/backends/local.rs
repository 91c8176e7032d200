//! Local filesystem backend implementation
//!
//! This module serves an HDFS-style namespace (`hdfs://host:port/...`) out of a
//! local root directory. Namespace paths are normalized before they are joined
//! onto the root, so `..` can never reach outside it.

use crate::error::{FsError, FsResult};
use crate::namespace::{FsEndpoint, FsPath};
use crate::stream::SeekableRead;
use crate::traits::{BlockMetadata, FileMetadata, FileSystem};
use std::ffi::CStr;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Default block size reported for files (32 MiB)
pub const DEFAULT_BLOCK_SIZE: u64 = 32 * 1024 * 1024;

/// Port reported for the storage node serving every block
pub const DATANODE_PORT: u16 = 50010;

/// Replication factor reported for every entry
const REPLICATION: u16 = 1;

/// Local filesystem backend rooted at a directory
///
/// The namespace root `/` maps to `root`. Every block is reported as living on
/// the endpoint host.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    endpoint: FsEndpoint,
    root: PathBuf,
    block_size: u64,
}

impl LocalFileSystem {
    /// Create a backend serving `root` under `endpoint`
    #[must_use]
    pub fn new(endpoint: FsEndpoint, root: impl Into<PathBuf>) -> Self {
        Self {
            endpoint,
            root: root.into(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Use `block_size` (at least 1 byte) for block reporting
    #[must_use]
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Local directory backing the namespace root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Block size used for reporting
    #[must_use]
    pub const fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Local path backing a namespace path
    #[must_use]
    pub fn local_path(&self, path: &FsPath) -> PathBuf {
        path.components()
            .iter()
            .fold(self.root.clone(), |acc, component| acc.join(component))
    }

    fn stat(&self, qualified: &FsPath) -> FsResult<(PathBuf, fs::Metadata)> {
        let local = self.local_path(qualified);
        let metadata = fs::metadata(&local).map_err(|e| {
            FsError::from_io(
                &qualified.to_string(),
                format!("Failed to get status of {qualified}"),
                e,
            )
        })?;
        Ok((local, metadata))
    }

    fn entry(&self, path: FsPath, metadata: &fs::Metadata) -> LocalMetadata {
        LocalMetadata {
            path,
            len: if metadata.is_dir() { 0 } else { metadata.len() },
            is_dir: metadata.is_dir(),
            block_size: self.block_size,
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            mode: metadata.permissions().mode() & 0o7777,
            owner: user_name(metadata.uid()),
            group: group_name(metadata.gid()),
        }
    }
}

impl FileSystem for LocalFileSystem {
    type Metadata = LocalMetadata;

    fn endpoint(&self) -> &FsEndpoint {
        &self.endpoint
    }

    fn resolve(&self, path: &FsPath) -> FsResult<FsPath> {
        self.endpoint.qualify(path)
    }

    fn open_read(&self, path: &FsPath) -> FsResult<Box<dyn SeekableRead>> {
        let qualified = self.resolve(path)?;
        let (local, metadata) = self.stat(&qualified)?;
        if metadata.is_dir() {
            return Err(FsError::Io {
                context: format!("Failed to open {qualified} for reading"),
                source: io::Error::new(io::ErrorKind::IsADirectory, "is a directory"),
            });
        }

        let file = File::open(&local).map_err(|e| {
            FsError::from_io(
                &qualified.to_string(),
                format!("Failed to open {qualified} for reading"),
                e,
            )
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&self, path: &FsPath) -> FsResult<Box<dyn Write + Send>> {
        let qualified = self.resolve(path)?;
        let local = self.local_path(&qualified);

        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::Io {
                context: format!("Failed to create parent directories of {qualified}"),
                source: e,
            })?;
        }
        let file = File::create(&local).map_err(|e| FsError::Io {
            context: format!("Failed to create {qualified}"),
            source: e,
        })?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn list(&self, path: &FsPath) -> FsResult<Vec<Self::Metadata>> {
        let qualified = self.resolve(path)?;
        let (local, metadata) = self.stat(&qualified)?;
        if !metadata.is_dir() {
            return Ok(vec![self.entry(qualified, &metadata)]);
        }

        let read_dir = fs::read_dir(&local).map_err(|e| {
            FsError::from_io(
                &qualified.to_string(),
                format!("Failed to list {qualified}"),
                e,
            )
        })?;

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| FsError::Io {
                context: format!("Failed to read entry of {qualified}"),
                source: e,
            })?;
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            let child = qualified.join(&name);
            match fs::metadata(dir_entry.path()) {
                Ok(child_metadata) => entries.push(self.entry(child, &child_metadata)),
                // Removed (or a dangling link) between readdir and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Skipping vanished entry {}", child);
                }
                Err(e) => {
                    return Err(FsError::Io {
                        context: format!("Failed to get status of {child}"),
                        source: e,
                    })
                }
            }
        }
        entries.sort_by(|a, b| a.path.name().cmp(&b.path.name()));
        Ok(entries)
    }

    fn block_locations(
        &self,
        path: &FsPath,
        start: i64,
        length: i64,
    ) -> FsResult<Vec<BlockMetadata>> {
        let (Ok(start), Ok(length)) = (u64::try_from(start), u64::try_from(length)) else {
            return Err(FsError::InvalidArgument(format!(
                "Invalid start or len parameter: start={start}, len={length}"
            )));
        };

        let qualified = self.resolve(path)?;
        let (_, metadata) = self.stat(&qualified)?;
        let file_len = if metadata.is_dir() { 0 } else { metadata.len() };
        if start >= file_len {
            return Ok(Vec::new());
        }

        // A zero-length request still reports the block holding `start`
        let end = start.saturating_add(length.max(1)).min(file_len);
        let host = self.endpoint.host().to_string();
        let name = format!("{host}:{DATANODE_PORT}");

        let mut blocks = Vec::new();
        let mut offset = start - start % self.block_size;
        while offset < end {
            let block_len = self.block_size.min(file_len - offset);
            blocks.push(BlockMetadata {
                hosts: vec![host.clone()],
                names: vec![name.clone()],
                offset,
                length: block_len,
            });
            offset += block_len;
        }
        Ok(blocks)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Status of an entry in a [`LocalFileSystem`]
#[derive(Debug, Clone)]
pub struct LocalMetadata {
    path: FsPath,
    len: u64,
    is_dir: bool,
    block_size: u64,
    modified: SystemTime,
    mode: u32,
    owner: String,
    group: String,
}

impl FileMetadata for LocalMetadata {
    fn path(&self) -> &FsPath {
        &self.path
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn replication(&self) -> u16 {
        REPLICATION
    }

    fn block_size(&self) -> u64 {
        self.block_size
    }

    fn modified(&self) -> SystemTime {
        self.modified
    }

    fn permissions(&self) -> u32 {
        self.mode
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn group(&self) -> &str {
        &self.group
    }
}

/// Size of the scratch buffer handed to the reentrant passwd/group lookups
const LOOKUP_BUFFER_SIZE: usize = 4096;

/// Resolve a uid to a user name, falling back to the numeric id
fn user_name(uid: u32) -> String {
    let mut entry: libc::passwd = unsafe { std::mem::zeroed() };
    let mut buf = vec![0 as libc::c_char; LOOKUP_BUFFER_SIZE];
    let mut found: *mut libc::passwd = std::ptr::null_mut();

    let rc = unsafe {
        libc::getpwuid_r(
            uid,
            &raw mut entry,
            buf.as_mut_ptr(),
            buf.len(),
            &raw mut found,
        )
    };
    if rc != 0 || found.is_null() || entry.pw_name.is_null() {
        return uid.to_string();
    }
    // SAFETY: pw_name points into `buf`, which outlives this borrow
    unsafe { CStr::from_ptr(entry.pw_name) }
        .to_string_lossy()
        .into_owned()
}

/// Resolve a gid to a group name, falling back to the numeric id
fn group_name(gid: u32) -> String {
    let mut entry: libc::group = unsafe { std::mem::zeroed() };
    let mut buf = vec![0 as libc::c_char; LOOKUP_BUFFER_SIZE];
    let mut found: *mut libc::group = std::ptr::null_mut();

    let rc = unsafe {
        libc::getgrgid_r(
            gid,
            &raw mut entry,
            buf.as_mut_ptr(),
            buf.len(),
            &raw mut found,
        )
    };
    if rc != 0 || found.is_null() || entry.gr_name.is_null() {
        return gid.to_string();
    }
    // SAFETY: gr_name points into `buf`, which outlives this borrow
    unsafe { CStr::from_ptr(entry.gr_name) }
        .to_string_lossy()
        .into_owned()
}
