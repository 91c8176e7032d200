//! Wire records exchanged between client and server
//!
//! Every frame carries one bincode-encoded value: a [`Request`] from the client
//! or a [`Response`] from the server. Field types mirror the original service
//! interface (signed 64-bit lengths, 16-bit replication), so values pass through
//! unchanged.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};

/// Status of one namespace entry as returned by `listStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    /// Fully qualified path
    pub path: String,
    /// Length in bytes
    pub length: i64,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Replication factor
    pub block_replication: i16,
    /// Block size in bytes
    pub block_size: i64,
    /// Modification time in milliseconds since the Unix epoch
    pub modification_time: i64,
    /// Symbolic permissions, e.g. `rwxr-xr-x`
    pub permission: String,
    /// Owner name
    pub owner: String,
    /// Group name
    pub group: String,
}

/// Placement of one block as returned by `getFileBlockLocations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocation {
    /// Hosts holding a replica
    pub hosts: Vec<String>,
    /// `host:port` names of the storage nodes
    pub names: Vec<String>,
    /// Offset of the block within the file
    pub offset: i64,
    /// Length of the block
    pub length: i64,
}

/// A call from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Open a file for reading
    Open { path: String },
    /// Create (or truncate) a file for writing
    Create { path: String },
    /// Read up to `size` bytes at `offset` from a read handle
    Read { handle: i64, offset: i64, size: i32 },
    /// Append `data` to a write handle
    Write { handle: i64, data: Vec<u8> },
    /// Release a read handle
    CloseReadHandle { handle: i64 },
    /// Release a write handle
    CloseWriteHandle { handle: i64 },
    /// List a directory (or stat a file)
    ListStatus { path: String },
    /// Query block placement for a byte range
    GetFileBlockLocations { path: String, start: i64, length: i64 },

    /// Legacy single close; superseded by the per-store close calls
    Close { handle: i64 },
    Append { path: String },
    Chmod { path: String, mode: i16 },
    Chown { path: String, owner: String, group: String },
    CreateFile {
        path: String,
        mode: i16,
        overwrite: bool,
        buffer_size: i32,
        block_replication: i16,
        block_size: i64,
    },
    Exists { path: String },
    Mkdirs { path: String },
    Rename { path: String, dest: String },
    Rm { path: String, recursive: bool },
    SetInactivityTimeoutPeriod { period_in_seconds: i64 },
    SetReplication { path: String, replication: i16 },
    Shutdown { status: i32 },
    Stat { path: String },
}

impl Request {
    /// Operation name as used in logs and errors
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Create { .. } => "create",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::CloseReadHandle { .. } => "closeReadHandle",
            Self::CloseWriteHandle { .. } => "closeWriteHandle",
            Self::ListStatus { .. } => "listStatus",
            Self::GetFileBlockLocations { .. } => "getFileBlockLocations",
            Self::Close { .. } => "close",
            Self::Append { .. } => "append",
            Self::Chmod { .. } => "chmod",
            Self::Chown { .. } => "chown",
            Self::CreateFile { .. } => "createFile",
            Self::Exists { .. } => "exists",
            Self::Mkdirs { .. } => "mkdirs",
            Self::Rename { .. } => "rename",
            Self::Rm { .. } => "rm",
            Self::SetInactivityTimeoutPeriod { .. } => "setInactivityTimeoutPeriod",
            Self::SetReplication { .. } => "setReplication",
            Self::Shutdown { .. } => "shutdown",
            Self::Stat { .. } => "stat",
        }
    }
}

/// Successful result of a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// New handle from `open` or `create`
    Handle(i64),
    /// Bytes from `read`
    Data(Vec<u8>),
    /// Outcome of `write` or a close call
    Bool(bool),
    /// Entries from `listStatus`; `None` when the path does not exist
    Statuses(Option<Vec<FileStatus>>),
    /// Blocks from `getFileBlockLocations`
    Blocks(Vec<BlockLocation>),
}

/// What the server sends back for every request
pub type Response = Result<Reply, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_survives_bincode() {
        let request = Request::Write {
            handle: 7,
            data: b"payload".to_vec(),
        };
        let bytes = bincode::serialize(&request).unwrap();
        let decoded: Request = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_error_response_survives_bincode() {
        let response: Response = Err(ServiceError::Unsupported("rename".to_string()));
        let bytes = bincode::serialize(&response).unwrap();
        let decoded: Response = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Request::Close { handle: 1 }.operation(), "close");
        assert_eq!(
            Request::SetInactivityTimeoutPeriod {
                period_in_seconds: 5
            }
            .operation(),
            "setInactivityTimeoutPeriod"
        );
    }
}
