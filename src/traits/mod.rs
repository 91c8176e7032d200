//! Core traits for filesystem abstraction
//!
//! This module provides the capability a filesystem backend must offer to be
//! served by the bridge: path resolution, stream opening, directory listing and
//! block-location queries. Backends live in [`crate::backends`].

pub mod filesystem;
pub mod metadata;

// Re-export main traits for convenience
pub use filesystem::FileSystem;
pub use metadata::{BlockMetadata, FileMetadata};
