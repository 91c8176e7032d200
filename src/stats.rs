//! Statistics tracking for bridge operations
//!
//! This module provides lock-free atomic statistics tracking using `BridgeStats`.
//! Statistics can be safely shared across connection tasks without requiring
//! mutexes.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the bridge counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Read handles handed out by `open`
    pub streams_opened: u64,
    /// Write handles handed out by `create`
    pub streams_created: u64,
    /// Handles released by close calls or shutdown
    pub handles_released: u64,
    /// Bytes returned by `read`
    pub bytes_read: u64,
    /// Bytes accepted by `write`
    pub bytes_written: u64,
    /// Calls that returned an error
    pub errors: u64,
}

/// Statistics tracking with interior mutability via atomics
///
/// # Thread Safety
///
/// All methods are thread-safe and lock-free. Atomic operations use `Ordering::Relaxed`
/// since statistics counters don't require synchronization (eventual consistency is fine).
///
/// # Usage
///
/// ```rust,ignore
/// let stats = BridgeStats::new();
/// stats.increment_streams_opened();
/// stats.add_bytes_read(1024);
/// let snapshot = stats.snapshot();
/// ```
#[derive(Debug, Default)]
pub struct BridgeStats {
    streams_opened: AtomicU64,
    streams_created: AtomicU64,
    handles_released: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    errors: AtomicU64,
}

impl BridgeStats {
    /// Create a new `BridgeStats` with every counter at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of read handles opened (lock-free atomic read)
    #[must_use]
    pub fn streams_opened(&self) -> u64 {
        self.streams_opened.load(Ordering::Relaxed)
    }

    /// Get the number of write handles created (lock-free atomic read)
    #[must_use]
    pub fn streams_created(&self) -> u64 {
        self.streams_created.load(Ordering::Relaxed)
    }

    /// Get the number of handles released (lock-free atomic read)
    #[must_use]
    pub fn handles_released(&self) -> u64 {
        self.handles_released.load(Ordering::Relaxed)
    }

    /// Get the number of bytes read (lock-free atomic read)
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Get the number of bytes written (lock-free atomic read)
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Get the number of failed calls (lock-free atomic read)
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Increment the number of read handles opened
    pub fn increment_streams_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the number of write handles created
    pub fn increment_streams_created(&self) {
        self.streams_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `count` released handles
    pub fn add_handles_released(&self, count: u64) {
        self.handles_released.fetch_add(count, Ordering::Relaxed);
    }

    /// Add `bytes` to the bytes-read counter
    pub fn add_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add `bytes` to the bytes-written counter
    pub fn add_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Increment the error counter
    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter
    ///
    /// Counters are loaded one by one, so a snapshot taken while calls are in
    /// flight may mix values from slightly different moments.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            streams_opened: self.streams_opened(),
            streams_created: self.streams_created(),
            handles_released: self.handles_released(),
            bytes_read: self.bytes_read(),
            bytes_written: self.bytes_written(),
            errors: self.errors(),
        }
    }
}
