//! Resource cache: decoded content memoized per address.
//!
//! The cache is injected into the [`Harvester`](crate::Harvester) rather than
//! living in process-global state, and the bundled [`MemoryCache`] is bounded
//! with least-recently-used eviction.
//!
//! When several Documents are harvested concurrently against one cache, the
//! engine serializes the read-check / fetch / write sequence per address with
//! [`AddressLocks`], so two tasks never race to fetch the same address.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, trace};

/// Default capacity of [`MemoryCache`].
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Memoizes decoded content keyed by address.
pub trait ResourceCache: Send + Sync + Debug {
    /// Returns the cached content for `address`.
    fn get(&self, address: &str) -> Option<String>;

    /// Stores content for `address`.
    fn put(&self, address: &str, content: String);
}

/// Bounded in-memory cache with least-recently-used eviction.
#[derive(Debug)]
pub struct MemoryCache {
    capacity: usize,
    entries: Mutex<IndexMap<String, String>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl MemoryCache {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl ResourceCache for MemoryCache {
    fn get(&self, address: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Re-insert to mark as most recently used.
        let (key, value) = entries.shift_remove_entry(address)?;
        entries.insert(key, value.clone());
        trace!(address, "cache hit");
        Some(value)
    }

    fn put(&self, address: &str, content: String) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.shift_remove(address);
        entries.insert(address.to_string(), content);
        while entries.len() > self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                debug!(address = %evicted, "evicted from cache");
            }
        }
    }
}

/// Per-address async locks.
///
/// Uses `Arc` per entry so the `DashMap` shard lock is released before the
/// inner mutex is awaited. An entry lives only while someone holds or waits
/// for it.
#[derive(Debug, Default)]
pub struct AddressLocks {
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl AddressLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `address`.
    pub async fn acquire(&self, address: &str) -> AddressGuard<'_> {
        let lock = self
            .locks
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        AddressGuard {
            locks: self,
            address: address.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of addresses currently held or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns `true` if no address is held or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one address; the table entry is dropped with the
/// last holder.
#[derive(Debug)]
pub struct AddressGuard<'a> {
    locks: &'a AddressLocks,
    address: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AddressGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Count 1 means only the table holds it; acquirers clone under the shard lock.
        let removed = self
            .locks
            .locks
            .remove_if(&self.address, |_, lock| Arc::strong_count(lock) == 1);
        if removed.is_some() {
            trace!(address = %self.address, "address lock released");
        }
    }
}
