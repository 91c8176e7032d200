//! hdfs-bridge: handle-based RPC access to an HDFS-style namespace
//!
//! The bridge turns stateful streams into integer handles that a stateless RPC
//! layer can pass between independent calls:
//!
//! - [`HandleStore`] registers closeable resources under positive `i64` handles
//! - [`BridgeService`] implements `open`, `create`, `read`, `write`, the two
//!   close calls, `listStatus` and `getFileBlockLocations` on top of two stores
//!   and a [`FileSystem`] backend
//! - [`protocol`] carries the service over length-delimited TCP frames
//!
//! # Usage
//!
//! ```rust,ignore
//! use hdfs_bridge::{BridgeService, FsEndpoint, LocalFileSystem};
//!
//! let fs = LocalFileSystem::new(FsEndpoint::new("localhost", 8020), "/srv/namespace");
//! let service = BridgeService::new(fs);
//! let handle = service.create("/tmp/x")?;
//! service.write(handle, b"hello")?;
//! service.close_write(handle);
//! ```

pub mod backends;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod error;
pub mod handle_store;
pub mod namespace;
pub mod protocol;
pub mod service;
pub mod stats;
pub mod stream;
pub mod traits;

pub use backends::LocalFileSystem;
pub use error::{FsError, FsResult, HandleKind, RpcError, ServiceError, ServiceResult};
pub use handle_store::{Closeable, HandleStore};
pub use namespace::{FsEndpoint, FsPath};
pub use service::BridgeService;
pub use stats::{BridgeStats, StatsSnapshot};
pub use stream::{InputStream, OutputStream};
pub use traits::{BlockMetadata, FileMetadata, FileSystem};
