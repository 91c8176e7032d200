//! Filesystem backend implementations
//!
//! This module provides concrete implementations of the FileSystem trait.
//! The bridge ships with a single backend that serves the namespace from a
//! local directory.

pub mod local;

// Re-export main types for convenience
pub use local::{LocalFileSystem, LocalMetadata, DEFAULT_BLOCK_SIZE};
