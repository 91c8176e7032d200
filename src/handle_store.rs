//! Registry mapping integer handles to live closeable resources
//!
//! A `HandleStore` turns stateful resources (open streams) into stable `i64`
//! tokens that a stateless RPC layer can pass around between independent calls:
//! - `allocate` registers a resource under the next free handle
//! - `get` looks a handle up without side effects
//! - `release` closes the resource (best-effort) and forgets the handle
//!
//! Handles are positive (`1..=i64::MAX`). Allocation continues from the last
//! assigned value, probing forward past live entries and wrapping to 1 once on
//! overflow. Exhausting the whole space is treated as a catastrophic leak and
//! terminates the process.
//!
//! The map is a `DashMap`, and the allocation path is serialized by a mutex over
//! the last assigned handle, so concurrent `allocate`/`get`/`release` calls from
//! several threads observe each other atomically. Each resource sits behind its
//! own mutex so I/O on one handle never blocks lookups of another.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, warn};

/// Smallest valid handle value
pub const FIRST_HANDLE: i64 = 1;

/// A resource with an explicit, possibly failing, close operation
pub trait Closeable: Send + 'static {
    /// Release the underlying resource
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or closing the resource fails. The store
    /// suppresses these errors during release.
    fn close(&mut self) -> io::Result<()>;
}

/// Shared, lockable reference to a registered resource
pub type SharedResource<R> = Arc<Mutex<R>>;

/// Lock a registered resource, recovering from a poisoned lock
///
/// A panic while a resource was locked leaves the resource itself usable for
/// closing, so poisoning is not propagated.
pub fn lock_resource<R>(resource: &Mutex<R>) -> MutexGuard<'_, R> {
    resource.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-type registry of live resources keyed by handle
pub struct HandleStore<R: Closeable> {
    /// Name used in log messages ("read", "write", ...)
    name: &'static str,
    /// Live entries
    entries: DashMap<i64, SharedResource<R>>,
    /// Last handle handed out; its lock serializes allocation
    last_assigned: Mutex<i64>,
}

impl<R: Closeable> std::fmt::Debug for HandleStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleStore")
            .field("name", &self.name)
            .field("live", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<R: Closeable> HandleStore<R> {
    /// Create an empty store
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::starting_after(name, FIRST_HANDLE - 1)
    }

    /// Create an empty store whose next allocation probes from `last_assigned + 1`
    fn starting_after(name: &'static str, last_assigned: i64) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            last_assigned: Mutex::new(last_assigned),
        }
    }

    /// Store name as used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Register `resource` under a fresh handle and return the handle
    ///
    /// The handle is not in use by any other live entry of this store.
    ///
    /// # Panics
    ///
    /// Panics if the computed handle is already occupied, which would mean the
    /// allocator itself is broken. Terminates the process (rather than
    /// returning) if every positive `i64` is in use.
    pub fn allocate(&self, resource: R) -> i64 {
        let mut last_assigned = self
            .last_assigned
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = self.next_free_handle(*last_assigned);

        match self.entries.entry(handle) {
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(resource)));
            }
            Entry::Occupied(_) => {
                // Allocation is serialized and next_free_handle skips live
                // entries, so reaching this is an allocator bug.
                error!("{} store: handle {} allocated while still live", self.name, handle);
                unreachable!("handle {handle} allocated while still live");
            }
        }
        *last_assigned = handle;

        debug!(
            "{} store: allocated handle {}, {} live",
            self.name,
            handle,
            self.entries.len()
        );
        handle
    }

    /// Look up a live resource
    ///
    /// Returns `None` for unknown or already released handles.
    #[must_use]
    pub fn get(&self, handle: i64) -> Option<SharedResource<R>> {
        self.entries.get(&handle).map(|entry| Arc::clone(entry.value()))
    }

    /// Close and forget the resource registered under `handle`
    ///
    /// Close errors are logged and suppressed. Returns `false` (and does
    /// nothing) if the handle is not registered.
    pub fn release(&self, handle: i64) -> bool {
        let Some((_, resource)) = self.entries.remove(&handle) else {
            debug!("{} store: cannot release unknown handle {}", self.name, handle);
            return false;
        };

        if let Err(e) = lock_resource(&resource).close() {
            warn!(
                "{} store: error while closing handle {} (ignored): {}",
                self.name, handle, e
            );
        }
        debug!(
            "{} store: released handle {}, {} remaining",
            self.name,
            handle,
            self.entries.len()
        );
        true
    }

    /// Release every live entry, returning how many were released
    pub fn release_all(&self) -> usize {
        let handles: Vec<i64> = self.entries.iter().map(|entry| *entry.key()).collect();
        handles
            .into_iter()
            .filter(|&handle| self.release(handle))
            .count()
    }

    /// Number of live entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `handle` is currently registered
    #[must_use]
    pub fn contains(&self, handle: i64) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Compute the next free handle after `last_assigned`
    ///
    /// Probes forward past live entries, wraps to [`FIRST_HANDLE`] once on
    /// overflow, and exits the process on a second wrap.
    fn next_free_handle(&self, last_assigned: i64) -> i64 {
        let mut wrapped = false;
        let mut candidate = match last_assigned.checked_add(1) {
            Some(next) if next >= FIRST_HANDLE => next,
            _ => {
                wrapped = true;
                FIRST_HANDLE
            }
        };

        while self.entries.contains_key(&candidate) {
            if candidate < i64::MAX {
                candidate += 1;
            } else if !wrapped {
                wrapped = true;
                candidate = FIRST_HANDLE;
            } else {
                error!("FATAL: no free handles remaining in {} store", self.name);
                std::process::exit(1);
            }
        }
        candidate
    }
}

impl<R: Closeable> Drop for HandleStore<R> {
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            debug!("{} store: released {} handles on drop", self.name, released);
        }
    }
}
