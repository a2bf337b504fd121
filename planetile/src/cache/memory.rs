//! In-process L1 tile tier using moka.
//!
//! This module provides an async-safe memory tier backed by `moka::future::Cache`.
//! Moka guards its internal state with fine-grained, short critical sections,
//! so a read never observes a torn entry and no lock is ever held across an
//! await point in our code.
//!
//! # Bounds
//!
//! - **Capacity**: at most `capacity` entries. The tier is configured with
//!   moka's LRU policy (not the default TinyLFU), so every insert is admitted
//!   and the entry with the oldest *access* is evicted first.
//! - **Time-to-live**: one TTL for every entry, measured from insertion.
//!   Expired entries are invisible to `get` even before maintenance runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;

use super::key::{CacheKey, KeyFilter};

/// Default number of tiles kept in memory.
pub const DEFAULT_MEMORY_CAPACITY: u64 = 500;

/// Default lifetime of a tile in memory.
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(300);

/// Longest lifetime of a tile in memory (30 days), in seconds.
pub const MAX_MEMORY_TTL_SECS: u64 = 30 * 24 * 3600;

/// Configuration for [`MemoryTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTierConfig {
    /// Maximum number of entries.
    pub capacity: u64,
    /// Time-to-live applied uniformly to every entry.
    pub ttl: Duration,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MEMORY_CAPACITY,
            ttl: DEFAULT_MEMORY_TTL,
        }
    }
}

/// Bounded, time-expiring in-process tile tier.
pub struct MemoryTier {
    /// The underlying moka cache
    cache: Cache<CacheKey, Bytes>,
    /// Configured entry bound
    capacity: u64,
    /// Entries evicted to honour the capacity bound
    evictions: Arc<AtomicU64>,
}

impl MemoryTier {
    /// Create a memory tier.
    ///
    /// TTLs above [`MAX_MEMORY_TTL_SECS`] are clamped to it.
    pub fn new(config: MemoryTierConfig) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let listener_evictions = Arc::clone(&evictions);

        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl.min(Duration::from_secs(MAX_MEMORY_TTL_SECS)))
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Size {
                    listener_evictions.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        Self {
            cache,
            capacity: config.capacity,
            evictions,
        }
    }

    /// Get a tile if present and not expired.
    ///
    /// A hit refreshes the entry's position in the LRU order.
    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        self.cache.get(key).await
    }

    /// Insert or replace a tile.
    ///
    /// Pending maintenance runs immediately so the capacity bound holds as
    /// soon as this returns.
    pub async fn set(&self, key: CacheKey, payload: Bytes) {
        self.cache.insert(key, payload).await;
        self.cache.run_pending_tasks().await;
    }

    /// Remove every entry selected by `filter`, returning how many were removed.
    pub async fn remove_matching(&self, filter: &KeyFilter) -> usize {
        if *filter == KeyFilter::All {
            let before = self.len().await;
            self.clear().await;
            return before as usize;
        }

        let doomed: Vec<Arc<CacheKey>> = self
            .cache
            .iter()
            .filter(|(key, _)| key.matches(filter))
            .map(|(key, _)| key)
            .collect();

        for key in &doomed {
            self.cache.invalidate(key.as_ref()).await;
        }
        self.cache.run_pending_tasks().await;

        doomed.len()
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Number of live entries, after flushing pending maintenance.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// Whether the tier holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Configured maximum number of entries.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Entries evicted so far because the tier was full.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}
