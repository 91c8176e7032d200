//! Error types for the bridge
//!
//! Each layer owns its error enum:
//! - [`FsError`] is produced by filesystem backends (the `FileSystem` capability)
//! - [`ServiceError`] is the RPC error channel; it is serializable and is what
//!   remote callers observe
//! - [`RpcError`] covers transport and framing failures between client and server

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io;
use thiserror::Error;

/// Which handle space a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleKind {
    /// Handles returned by `open`
    Read,
    /// Handles returned by `create`
    Write,
}

impl std::fmt::Display for HandleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Failures reported by a filesystem backend
#[derive(Debug, Error)]
pub enum FsError {
    /// The path does not exist
    #[error("File {0} does not exist")]
    NotFound(String),

    /// The path is syntactically invalid
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// Raw path as supplied by the caller
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// A qualified path names a different filesystem than the configured one
    #[error("Wrong FS: {path}, expected: {expected}")]
    WrongFilesystem {
        /// Offending path
        path: String,
        /// URI of the configured filesystem
        expected: String,
    },

    /// Arguments outside the accepted range (negative offsets, lengths, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Underlying I/O failure
    #[error("{context}")]
    Io {
        /// What was being attempted
        context: String,
        /// The original error
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Wrap an `io::Error`, mapping `NotFound` to [`FsError::NotFound`]
    #[must_use]
    pub fn from_io(path: &str, context: impl Into<String>, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_string())
        } else {
            Self::Io {
                context: context.into(),
                source,
            }
        }
    }

    /// Whether this error means "nothing there"
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for filesystem backends
pub type FsResult<T> = std::result::Result<T, FsError>;

/// Errors returned to RPC callers
///
/// Every filesystem failure is converted into one of these variants at the
/// service boundary; nothing else crosses into the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ServiceError {
    /// Filesystem or stream failure, with the full cause chain as text
    #[error("I/O error: {0}")]
    Io(String),

    /// The handle is not registered in its store
    #[error("unknown {kind} handle: {handle}")]
    UnknownHandle {
        /// Handle space that was searched
        kind: HandleKind,
        /// Raw handle value supplied by the caller
        handle: i64,
    },

    /// Rejected argument; the referenced resource was not touched
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation that this service never implements
    #[error("operation '{0}' is not supported by this service")]
    Unsupported(String),
}

impl ServiceError {
    /// Wrap a filesystem failure for the RPC error channel
    ///
    /// Argument errors keep their own variant; everything else becomes
    /// [`ServiceError::Io`] with a message naming the operation and the whole
    /// source chain.
    #[must_use]
    pub fn from_fs(operation: &str, err: &FsError) -> Self {
        match err {
            FsError::InvalidPath { .. } | FsError::InvalidArgument(_) => {
                Self::InvalidArgument(err.to_string())
            }
            _ => Self::Io(describe(operation, err)),
        }
    }

    /// Wrap a stream I/O failure for the RPC error channel
    ///
    /// Always [`ServiceError::Io`]: decoders report corrupt data as
    /// `InvalidInput`, which is still a failed read and not a bad argument.
    #[must_use]
    pub fn from_io(operation: &str, err: &io::Error) -> Self {
        Self::Io(describe(operation, err))
    }
}

/// Render an error and its sources as `operation: outer: inner: ...`
fn describe(operation: &str, err: &dyn std::error::Error) -> String {
    let mut message = format!("{operation}: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {cause}");
        source = cause.source();
    }
    message
}

/// Result type for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Transport-level failures between client and server
#[derive(Debug, Error)]
pub enum RpcError {
    /// Socket failure
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// A frame could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The peer closed the connection before answering
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The peer answered with a reply that does not match the request
    #[error("unexpected reply to {operation}: {reply}")]
    UnexpectedReply {
        /// Request that was sent
        operation: &'static str,
        /// Debug rendering of what came back
        reply: String,
    },

    /// The server reported a failure
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_io_error_maps_to_not_found() {
        let err = FsError::from_io(
            "/missing",
            "open",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "File /missing does not exist");
    }

    #[test]
    fn test_io_wrapping_includes_cause_chain() {
        let err = FsError::Io {
            context: "Failed to open /a".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        let wrapped = ServiceError::from_fs("open", &err);
        assert_eq!(
            wrapped,
            ServiceError::Io("open: Failed to open /a: permission denied".to_string())
        );
    }

    #[test]
    fn test_argument_errors_stay_invalid_argument() {
        let err = FsError::InvalidArgument("negative start".to_string());
        assert!(matches!(
            ServiceError::from_fs("getFileBlockLocations", &err),
            ServiceError::InvalidArgument(_)
        ));

    }

    #[test]
    fn test_stream_errors_are_io_even_when_invalid_input() {
        let io_err = io::Error::new(io::ErrorKind::InvalidInput, "invalid gzip header");
        assert_eq!(
            ServiceError::from_io("read", &io_err),
            ServiceError::Io("read: invalid gzip header".to_string())
        );
    }

    #[test]
    fn test_unknown_handle_message() {
        let err = ServiceError::UnknownHandle {
            kind: HandleKind::Read,
            handle: 42,
        };
        assert_eq!(err.to_string(), "unknown read handle: 42");
    }
}
