//! Two-tier tile cache orchestrator.
//!
//! `TileCache` puts the in-process [`MemoryTier`] in front of a shared
//! [`DistributedCache`] and exposes a single coordinate-based contract:
//!
//! ```text
//! fetch_cached ──► L1 hit? ──yes──► return
//!                    │ no
//!                    ▼
//!                  L2 hit? ──yes──► promote into L1 ──► return
//!                    │ no
//!                    ▼
//!                  absent (the caller fetches from origin and calls store)
//! ```
//!
//! The distributed tier is an optimisation, never a dependency: any error it
//! reports is logged, counted in [`CacheStatistics::distributed_errors`], and
//! turned into a miss or a "not stored" result.
//!
//! Batch operations go straight to the distributed tier and neither consult
//! nor populate L1. They serve the prefetcher's bulk existence checks and
//! bulk writes.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::key::{CacheKey, KeyFilter};
use super::memory::MemoryTier;
use super::stats::{CacheCounters, CacheStatistics};
use super::traits::{DistributedCache, DistributedCacheError};
use crate::coord::{DatasetId, TileCoord, TileIndex};

/// Default lifetime of a tile in the distributed tier (one day).
pub const DEFAULT_TILE_TTL_SECS: u64 = 86_400;

/// Longest lifetime of a tile in the distributed tier (one year).
pub const MAX_TILE_TTL_SECS: u64 = 365 * 86_400;

/// Entries removed by [`TileCache::clear`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearReport {
    /// Entries removed from the memory tier.
    pub memory_removed: usize,
    /// Entries removed from the distributed tier, `None` if it failed.
    pub distributed_removed: Option<usize>,
}

/// Two-tier tile cache.
pub struct TileCache {
    memory: MemoryTier,
    distributed: Arc<dyn DistributedCache>,
    counters: CacheCounters,
    default_ttl_secs: u64,
}

impl TileCache {
    /// Create a cache over the given tiers.
    pub fn new(memory: MemoryTier, distributed: Arc<dyn DistributedCache>) -> Self {
        Self {
            memory,
            distributed,
            counters: CacheCounters::default(),
            default_ttl_secs: DEFAULT_TILE_TTL_SECS,
        }
    }

    /// Set the TTL used by callers that do not pick one.
    pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
        self.default_ttl_secs = ttl_secs;
        self
    }

    /// TTL used by callers that do not pick one.
    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    /// Look a tile up in L1, then L2.
    ///
    /// An L2 hit is copied into L1 before it is returned. Never contacts
    /// the origin.
    pub async fn fetch_cached(&self, coord: &TileCoord) -> Option<Bytes> {
        let key = CacheKey::for_tile(coord);
        self.counters.record_request();

        if let Some(payload) = self.memory.get(&key).await {
            self.counters.record_memory_hit();
            return Some(payload);
        }
        self.counters.record_memory_miss();

        match self.distributed.get(&key).await {
            Ok(Some(payload)) => {
                self.counters.record_distributed_hit();
                self.memory.set(key, payload.clone()).await;
                Some(payload)
            }
            Ok(None) => {
                self.counters.record_distributed_miss();
                None
            }
            Err(e) => {
                self.counters.record_distributed_miss();
                self.distributed_failed("get", &e);
                None
            }
        }
    }

    /// Write a tile to both tiers.
    ///
    /// L1 is always written. Returns whether the L2 write succeeded.
    pub async fn store(&self, coord: &TileCoord, payload: Bytes, ttl_secs: u64) -> bool {
        let key = CacheKey::for_tile(coord);
        self.memory.set(key.clone(), payload.clone()).await;

        match self.distributed.set(&key, payload, ttl_secs).await {
            Ok(()) => {
                debug!(key = %key, ttl_secs, "Tile stored");
                true
            }
            Err(e) => {
                self.distributed_failed("set", &e);
                false
            }
        }
    }

    /// Look up many tiles of one dataset in L2 in a single round trip.
    ///
    /// Returns hits only. L1 is not consulted.
    pub async fn batch_fetch(
        &self,
        dataset: &DatasetId,
        tiles: &[TileIndex],
    ) -> HashMap<TileIndex, Bytes> {
        if tiles.is_empty() {
            return HashMap::new();
        }

        let keys: Vec<CacheKey> = tiles
            .iter()
            .map(|tile| CacheKey::for_index(dataset, *tile))
            .collect();

        let mut found = match self.distributed.batch_get(&keys).await {
            Ok(found) => found,
            Err(e) => {
                self.distributed_failed("batch get", &e);
                return HashMap::new();
            }
        };

        tiles
            .iter()
            .zip(&keys)
            .filter_map(|(tile, key)| found.remove(key).map(|payload| (*tile, payload)))
            .collect()
    }

    /// Store many tiles of one dataset in L2 in a single round trip.
    ///
    /// Returns the number stored, 0 if the distributed tier failed.
    pub async fn batch_store(
        &self,
        dataset: &DatasetId,
        tiles: HashMap<TileIndex, Bytes>,
        ttl_secs: u64,
    ) -> usize {
        if tiles.is_empty() {
            return 0;
        }

        let entries: Vec<(CacheKey, Bytes)> = tiles
            .into_iter()
            .map(|(tile, payload)| (CacheKey::for_index(dataset, tile), payload))
            .collect();

        match self.distributed.batch_set(entries, ttl_secs).await {
            Ok(count) => count,
            Err(e) => {
                self.distributed_failed("batch set", &e);
                0
            }
        }
    }

    /// Current counters, occupancy, and distributed tier diagnostics.
    ///
    /// A failure to gather diagnostics is reported in
    /// [`CacheStatistics::distributed_error`].
    pub async fn stats(&self) -> CacheStatistics {
        let mut stats = self.counters.snapshot();
        stats.memory_entries = self.memory.len().await;
        stats.memory_capacity = self.memory.capacity();
        stats.memory_evictions = self.memory.evictions();

        match self.distributed.diagnostics().await {
            Ok(diagnostics) => stats.distributed = Some(diagnostics),
            Err(e) => stats.distributed_error = Some(e.to_string()),
        }

        stats
    }

    /// Remove matching entries from both tiers.
    ///
    /// With no filter both tiers are emptied entirely. Not atomic with
    /// respect to concurrent writers.
    pub async fn clear(&self, dataset: Option<DatasetId>, zoom: Option<u8>) -> ClearReport {
        let filter = KeyFilter::from_parts(dataset, zoom);
        let memory_removed = self.memory.remove_matching(&filter).await;

        let distributed_removed = match self.distributed.delete_matching(&filter).await {
            Ok(count) => Some(count),
            Err(e) => {
                self.distributed_failed("clear", &e);
                None
            }
        };

        info!(
            pattern = %filter.pattern(),
            memory_removed,
            distributed_removed = ?distributed_removed,
            "Cache cleared"
        );

        ClearReport {
            memory_removed,
            distributed_removed,
        }
    }

    /// Probe the distributed tier.
    pub async fn ping_distributed(&self) -> Result<(), DistributedCacheError> {
        self.distributed.ping().await
    }

    /// Drop the distributed tier connection.
    pub fn disconnect(&self) {
        self.distributed.disconnect();
    }

    /// Name of the distributed backend.
    pub fn distributed_name(&self) -> &str {
        self.distributed.name()
    }

    fn distributed_failed(&self, operation: &str, error: &DistributedCacheError) {
        self.counters.record_distributed_error();
        warn!(
            backend = self.distributed.name(),
            operation,
            error = %error,
            "Distributed cache unavailable, degrading to memory tier"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryTierConfig;
    use crate::cache::testing::{DistributedOp, MockDistributedCache};
    use std::time::Duration;

    fn setup() -> (TileCache, MockDistributedCache) {
        let mock = MockDistributedCache::new();
        let memory = MemoryTier::new(MemoryTierConfig {
            capacity: 100,
            ttl: Duration::from_secs(60),
        });
        (TileCache::new(memory, Arc::new(mock.clone())), mock)
    }

    fn coord(dataset: &str, z: u8, x: u32, y: u32) -> TileCoord {
        TileCoord::parse(dataset, z, x, y).unwrap()
    }

    fn dataset(name: &str) -> DatasetId {
        DatasetId::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_store_then_fetch_roundtrip() {
        let (cache, mock) = setup();
        let tile = coord("global", 3, 1, 2);
        let payload = Bytes::from(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]);

        assert!(cache.store(&tile, payload.clone(), 3600).await);
        assert_eq!(cache.fetch_cached(&tile).await, Some(payload));

        let entry = mock.entry(&CacheKey::for_tile(&tile)).unwrap();
        assert_eq!(entry.ttl_secs, 3600);

        let stats = cache.stats().await;
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.total_requests, 1);
    }

    #[tokio::test]
    async fn test_total_miss_counts_both_tiers() {
        let (cache, _mock) = setup();

        assert!(cache.fetch_cached(&coord("global", 1, 0, 0)).await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.memory_misses, 1);
        assert_eq!(stats.distributed_misses, 1);
        assert_eq!(stats.distributed_hits, 0);
        assert_eq!(stats.overall_hit_rate(), Some(0.0));
    }

    #[tokio::test]
    async fn test_distributed_hit_is_promoted() {
        let (cache, mock) = setup();
        let tile = coord("moon", 4, 7, 3);
        mock.seed(CacheKey::for_tile(&tile), Bytes::from_static(b"from-l2"));

        assert_eq!(
            cache.fetch_cached(&tile).await,
            Some(Bytes::from_static(b"from-l2"))
        );
        mock.clear_operations();

        // Second read is served by L1 without touching L2
        assert_eq!(
            cache.fetch_cached(&tile).await,
            Some(Bytes::from_static(b"from-l2"))
        );
        assert!(mock.operations().is_empty());

        let stats = cache.stats().await;
        assert_eq!(stats.distributed_hits, 1);
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.memory_misses, 1);
        assert_eq!(stats.memory_entries, 1);
    }

    #[tokio::test]
    async fn test_distributed_failure_degrades_to_miss() {
        let (cache, mock) = setup();
        let tile = coord("global", 2, 0, 0);
        mock.seed(CacheKey::for_tile(&tile), Bytes::from_static(b"unreachable"));
        mock.fail_all();

        assert!(cache.fetch_cached(&tile).await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.distributed_misses, 1);
        assert_eq!(stats.distributed_errors, 1);
        assert!(stats.distributed.is_none());
        assert!(stats.distributed_error.is_some());
    }

    #[tokio::test]
    async fn test_store_survives_distributed_failure() {
        let (cache, mock) = setup();
        let tile = coord("global", 2, 1, 1);
        mock.fail_when(|op| matches!(op, DistributedOp::Set { .. }));

        assert!(!cache.store(&tile, Bytes::from_static(b"tile"), 60).await);
        assert!(!mock.contains(&CacheKey::for_tile(&tile)));

        // L1 still has it
        assert_eq!(
            cache.fetch_cached(&tile).await,
            Some(Bytes::from_static(b"tile"))
        );
    }

    #[tokio::test]
    async fn test_batch_fetch_returns_present_only() {
        let (cache, mock) = setup();
        let ds = dataset("global");
        let tiles: Vec<TileIndex> = (0..5).map(|x| TileIndex::new(3, x, 1)).collect();
        for tile in &tiles[..3] {
            mock.seed(CacheKey::for_index(&ds, *tile), Bytes::from(vec![tile.x as u8]));
        }

        let found = cache.batch_fetch(&ds, &tiles).await;

        assert_eq!(found.len(), 3);
        for tile in &tiles[..3] {
            assert_eq!(found[tile], Bytes::from(vec![tile.x as u8]));
        }
        assert_eq!(
            mock.count_operations(|op| matches!(op, DistributedOp::BatchGet(_))),
            1
        );
    }

    #[tokio::test]
    async fn test_batch_paths_bypass_memory_tier() {
        let (cache, _mock) = setup();
        let ds = dataset("global");
        let tiles: HashMap<TileIndex, Bytes> = (0..3)
            .map(|x| (TileIndex::new(2, x, 0), Bytes::from_static(b"t")))
            .collect();

        assert_eq!(cache.batch_store(&ds, tiles, 120).await, 3);

        let stats = cache.stats().await;
        assert_eq!(stats.memory_entries, 0);
        assert_eq!(stats.total_requests, 0);
    }

    #[tokio::test]
    async fn test_batch_fetch_failure_is_empty() {
        let (cache, mock) = setup();
        mock.fail_all();

        let found = cache
            .batch_fetch(&dataset("global"), &[TileIndex::new(1, 0, 0)])
            .await;

        assert!(found.is_empty());
        assert_eq!(
            cache
                .batch_store(
                    &dataset("global"),
                    HashMap::from([(TileIndex::new(1, 0, 0), Bytes::from_static(b"t"))]),
                    60
                )
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_clear_by_dataset_keeps_other_datasets() {
        let (cache, mock) = setup();
        let mars = coord("global", 3, 1, 1);
        let moon = coord("moon", 3, 1, 1);
        cache.store(&mars, Bytes::from_static(b"mars"), 60).await;
        cache.store(&moon, Bytes::from_static(b"moon"), 60).await;

        let report = cache.clear(Some(dataset("global")), None).await;

        assert_eq!(report.memory_removed, 1);
        assert_eq!(report.distributed_removed, Some(1));
        assert!(!mock.contains(&CacheKey::for_tile(&mars)));
        assert!(mock.contains(&CacheKey::for_tile(&moon)));
        assert!(cache.fetch_cached(&mars).await.is_none());
        assert_eq!(
            cache.fetch_cached(&moon).await,
            Some(Bytes::from_static(b"moon"))
        );
    }

    #[tokio::test]
    async fn test_clear_by_zoom_spans_datasets() {
        let (cache, mock) = setup();
        cache.store(&coord("global", 3, 0, 0), Bytes::from_static(b"a"), 60).await;
        cache.store(&coord("moon", 3, 0, 0), Bytes::from_static(b"b"), 60).await;
        cache.store(&coord("moon", 4, 0, 0), Bytes::from_static(b"c"), 60).await;

        let report = cache.clear(None, Some(3)).await;

        assert_eq!(report.memory_removed, 2);
        assert_eq!(mock.len(), 1);
        assert!(mock.contains(&CacheKey::for_tile(&coord("moon", 4, 0, 0))));
    }

    #[tokio::test]
    async fn test_clear_everything() {
        let (cache, mock) = setup();
        cache.store(&coord("global", 1, 0, 0), Bytes::from_static(b"a"), 60).await;
        cache.store(&coord("mercury", 2, 0, 0), Bytes::from_static(b"b"), 60).await;

        let report = cache.clear(None, None).await;

        assert_eq!(report.memory_removed, 2);
        assert!(mock.is_empty());
        assert_eq!(cache.stats().await.memory_entries, 0);
    }

    #[tokio::test]
    async fn test_clear_reports_distributed_failure() {
        let (cache, mock) = setup();
        cache.store(&coord("global", 1, 0, 0), Bytes::from_static(b"a"), 60).await;
        mock.fail_all();

        let report = cache.clear(None, None).await;

        assert_eq!(report.memory_removed, 1);
        assert_eq!(report.distributed_removed, None);
    }
}
