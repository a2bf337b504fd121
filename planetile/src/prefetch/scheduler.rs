//! Neighbor prefetch scheduler.
//!
//! After a tile is served, [`PrefetchScheduler::trigger_prefetch`] starts a
//! detached *round* that warms the tiles around it:
//!
//! ```text
//! trigger ─► marker for center exists? ──yes──► skip
//!              │ no: record marker
//!              ▼
//!            detached round
//!              ├─ wait for a concurrency slot
//!              ├─ neighbors (same zoom, ≤ max zoom, not marked)
//!              ├─ one batch existence check against the cache
//!              ├─ fetch missing tiles from origin, `batch_size` at a time
//!              ├─ store each fetched tile through the cache
//!              └─ cooldown, then release the center marker
//! ```
//!
//! Rounds are best-effort. Fetch failures and panics inside a round are
//! logged at debug level and discarded; the concurrency slot and the marker
//! are released regardless.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::config::PrefetchConfig;
use super::dedup::{DedupMarkers, Generation};
use super::spawner::TaskSpawner;
use crate::cache::{CacheKey, TileCache};
use crate::coord::{TileCoord, TileIndex};
use crate::provider::TileFetcher;

/// Counters describing prefetch activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchStats {
    /// Rounds started.
    pub rounds_started: u64,
    /// Triggers skipped because the vicinity was already marked.
    pub rounds_deduplicated: u64,
    /// Rounds whose fetch phase ran to the end.
    pub rounds_completed: u64,
    /// Rounds whose fetch phase panicked or was cancelled.
    pub rounds_aborted: u64,
    /// Neighbors found in the cache by the existence check.
    pub tiles_already_cached: u64,
    /// Neighbors fetched from origin and stored.
    pub tiles_fetched: u64,
    /// Neighbors the origin could not deliver.
    pub fetch_failures: u64,
}

#[derive(Debug, Default)]
struct PrefetchCounters {
    rounds_started: AtomicU64,
    rounds_deduplicated: AtomicU64,
    rounds_completed: AtomicU64,
    rounds_aborted: AtomicU64,
    tiles_already_cached: AtomicU64,
    tiles_fetched: AtomicU64,
    fetch_failures: AtomicU64,
}

impl PrefetchCounters {
    fn snapshot(&self) -> PrefetchStats {
        PrefetchStats {
            rounds_started: self.rounds_started.load(Ordering::Relaxed),
            rounds_deduplicated: self.rounds_deduplicated.load(Ordering::Relaxed),
            rounds_completed: self.rounds_completed.load(Ordering::Relaxed),
            rounds_aborted: self.rounds_aborted.load(Ordering::Relaxed),
            tiles_already_cached: self.tiles_already_cached.load(Ordering::Relaxed),
            tiles_fetched: self.tiles_fetched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

/// State shared by the scheduler and its detached rounds.
struct Shared {
    config: PrefetchConfig,
    cache: Arc<TileCache>,
    gate: Semaphore,
    markers: DedupMarkers,
    counters: PrefetchCounters,
}

/// Starts bounded, deduplicated neighbor prefetch rounds.
pub struct PrefetchScheduler {
    shared: Arc<Shared>,
    spawner: Arc<dyn TaskSpawner>,
}

impl PrefetchScheduler {
    /// Create a scheduler that stores prefetched tiles in `cache`.
    pub fn new(
        config: PrefetchConfig,
        cache: Arc<TileCache>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Self {
        let shared = Shared {
            gate: Semaphore::new(config.max_concurrent_rounds.max(1)),
            markers: DedupMarkers::new(config.dedup_capacity),
            counters: PrefetchCounters::default(),
            cache,
            config,
        };

        Self {
            shared: Arc::new(shared),
            spawner,
        }
    }

    /// Warm the neighbors of a just-served tile in the background.
    ///
    /// Returns immediately. Nothing about the round's outcome is reported
    /// to the caller.
    pub fn trigger_prefetch(&self, coord: &TileCoord, fetcher: Arc<dyn TileFetcher>) {
        let config = &self.shared.config;
        if !config.enabled || config.radius == 0 {
            return;
        }
        // Neighbors share the center's zoom level
        if coord.z > config.max_zoom {
            trace!(tile = %coord, max_zoom = config.max_zoom, "Zoom too deep for prefetch");
            return;
        }

        let center = coord.canonical();
        let key = CacheKey::for_tile(&center);
        let Some(generation) = self.shared.markers.try_mark(key.clone()) else {
            self.shared
                .counters
                .rounds_deduplicated
                .fetch_add(1, Ordering::Relaxed);
            trace!(tile = %center, "Prefetch already underway nearby");
            return;
        };

        self.shared
            .counters
            .rounds_started
            .fetch_add(1, Ordering::Relaxed);

        let shared = Arc::clone(&self.shared);
        let cancel = self.spawner.cancellation();
        let round = run_round(shared, center, key.clone(), generation, fetcher, cancel);

        if !self.spawner.spawn("prefetch-round", Box::pin(round)) {
            self.shared.markers.release(&key, generation);
        }
    }

    /// Activity counters.
    pub fn stats(&self) -> PrefetchStats {
        self.shared.counters.snapshot()
    }

    /// Number of live dedup markers.
    pub fn active_markers(&self) -> usize {
        self.shared.markers.len()
    }

    /// Number of concurrency slots currently free.
    pub fn available_slots(&self) -> usize {
        self.shared.gate.available_permits()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &PrefetchConfig {
        &self.shared.config
    }
}

async fn run_round(
    shared: Arc<Shared>,
    center: TileCoord,
    key: CacheKey,
    generation: Generation,
    fetcher: Arc<dyn TileFetcher>,
    cancel: CancellationToken,
) {
    let outcome = AssertUnwindSafe(fetch_neighbors(&shared, &center, fetcher.as_ref(), &cancel))
        .catch_unwind()
        .await;

    match outcome {
        Ok(true) => {
            shared
                .counters
                .rounds_completed
                .fetch_add(1, Ordering::Relaxed);
        }
        Ok(false) => {
            shared.counters.rounds_aborted.fetch_add(1, Ordering::Relaxed);
            debug!(tile = %center, "Prefetch round cancelled");
        }
        Err(_) => {
            shared.counters.rounds_aborted.fetch_add(1, Ordering::Relaxed);
            debug!(tile = %center, "Prefetch round panicked");
        }
    }

    tokio::select! {
        _ = tokio::time::sleep(shared.config.cooldown) => {}
        _ = cancel.cancelled() => {}
    }

    shared.markers.release(&key, generation);
}

/// Fetch phase of a round. Returns `false` if the round was cancelled.
async fn fetch_neighbors(
    shared: &Shared,
    center: &TileCoord,
    fetcher: &dyn TileFetcher,
    cancel: &CancellationToken,
) -> bool {
    let config = &shared.config;

    let _permit = tokio::select! {
        permit = shared.gate.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return false,
        },
        _ = cancel.cancelled() => return false,
    };

    let candidates: Vec<TileIndex> = center
        .neighbors(config.radius)
        .into_iter()
        .filter(|tile| tile.z <= config.max_zoom)
        .filter(|tile| !shared.markers.contains(&CacheKey::for_tile(tile)))
        .map(|tile| tile.index())
        .collect();

    if candidates.is_empty() {
        return true;
    }

    let cached = shared
        .cache
        .batch_fetch(&center.dataset, &candidates)
        .await;
    shared
        .counters
        .tiles_already_cached
        .fetch_add(cached.len() as u64, Ordering::Relaxed);

    let missing: Vec<TileCoord> = candidates
        .into_iter()
        .filter(|tile| !cached.contains_key(tile))
        .map(|tile| tile.with_dataset(center.dataset.clone()))
        .collect();

    trace!(
        tile = %center,
        cached = cached.len(),
        missing = missing.len(),
        "Prefetch existence check"
    );

    let ttl_secs = shared.cache.default_ttl_secs();
    let mut batches = missing.chunks(config.batch_size.max(1)).peekable();

    while let Some(batch) = batches.next() {
        if cancel.is_cancelled() {
            return false;
        }

        let fetches = batch.iter().map(|tile| async move {
            match fetcher.fetch_tile(tile).await {
                Ok(data) => {
                    shared.cache.store(tile, data, ttl_secs).await;
                    shared.counters.tiles_fetched.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    shared.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                    trace!(tile = %tile, error = %e, "Prefetch fetch failed");
                }
            }
        });
        join_all(fetches).await;

        if batches.peek().is_some() && !config.batch_pause.is_zero() {
            tokio::time::sleep(config.batch_pause).await;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::MockDistributedCache;
    use crate::cache::{BoxFuture, MemoryTier, MemoryTierConfig};
    use crate::prefetch::spawner::{ManualSpawner, TokioSpawner};
    use crate::provider::ProviderError;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Fetcher that answers every tile and records what was asked.
    #[derive(Default)]
    struct RecordingFetcher {
        fetched: Mutex<Vec<TileCoord>>,
        fail_x: Option<u32>,
        panic: bool,
    }

    impl RecordingFetcher {
        fn fetched(&self) -> Vec<TileCoord> {
            self.fetched.lock().clone()
        }
    }

    impl TileFetcher for RecordingFetcher {
        fn fetch_tile<'a>(
            &'a self,
            coord: &'a TileCoord,
        ) -> BoxFuture<'a, Result<Bytes, ProviderError>> {
            Box::pin(async move {
                if self.panic {
                    panic!("fetcher exploded");
                }
                self.fetched.lock().push(coord.clone());
                if Some(coord.x) == self.fail_x {
                    return Err(ProviderError::HttpStatus {
                        status: 404,
                        url: coord.to_string(),
                    });
                }
                Ok(Bytes::from(coord.to_string()))
            })
        }
    }

    fn cache() -> (Arc<TileCache>, MockDistributedCache) {
        let mock = MockDistributedCache::new();
        let memory = MemoryTier::new(MemoryTierConfig {
            capacity: 100,
            ttl: Duration::from_secs(60),
        });
        (Arc::new(TileCache::new(memory, Arc::new(mock.clone()))), mock)
    }

    fn coord(z: u8, x: u32, y: u32) -> TileCoord {
        TileCoord::parse("global", z, x, y).unwrap()
    }

    fn manual_scheduler(
        config: PrefetchConfig,
    ) -> (PrefetchScheduler, Arc<ManualSpawner>, MockDistributedCache) {
        let (cache, mock) = cache();
        let spawner = Arc::new(ManualSpawner::new());
        let scheduler = PrefetchScheduler::new(config, cache, spawner.clone());
        (scheduler, spawner, mock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_fetches_and_stores_missing_neighbors() {
        let (scheduler, spawner, mock) = manual_scheduler(PrefetchConfig::default());
        let fetcher = Arc::new(RecordingFetcher::default());

        scheduler.trigger_prefetch(&coord(3, 5, 3), fetcher.clone());
        assert_eq!(spawner.pending(), 1);
        spawner.run_all().await;

        assert_eq!(fetcher.fetched().len(), 8);
        for tile in coord(3, 5, 3).neighbors(1) {
            assert!(mock.contains(&CacheKey::for_tile(&tile)), "{} not stored", tile);
        }

        let stats = scheduler.stats();
        assert_eq!(stats.rounds_started, 1);
        assert_eq!(stats.rounds_completed, 1);
        assert_eq!(stats.tiles_fetched, 8);
        assert_eq!(scheduler.active_markers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_neighbors_are_not_fetched() {
        let (scheduler, spawner, mock) = manual_scheduler(PrefetchConfig::default());
        let fetcher = Arc::new(RecordingFetcher::default());
        let center = coord(3, 5, 3);
        let neighbors = center.neighbors(1);
        for tile in &neighbors[..3] {
            mock.seed(CacheKey::for_tile(tile), Bytes::from_static(b"cached"));
        }

        scheduler.trigger_prefetch(&center, fetcher.clone());
        spawner.run_all().await;

        assert_eq!(fetcher.fetched().len(), 5);
        assert!(neighbors[..3].iter().all(|t| !fetcher.fetched().contains(t)));
        assert_eq!(scheduler.stats().tiles_already_cached, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_triggers_run_one_round() {
        let (scheduler, spawner, _mock) = manual_scheduler(PrefetchConfig::default());
        let fetcher = Arc::new(RecordingFetcher::default());

        scheduler.trigger_prefetch(&coord(4, 2, 2), fetcher.clone());
        scheduler.trigger_prefetch(&coord(4, 2, 2), fetcher.clone());
        spawner.run_all().await;

        assert_eq!(fetcher.fetched().len(), 8);
        let stats = scheduler.stats();
        assert_eq!(stats.rounds_started, 1);
        assert_eq!(stats.rounds_deduplicated, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_released_after_cooldown_allows_new_round() {
        let (scheduler, spawner, _mock) = manual_scheduler(PrefetchConfig::default());
        let fetcher = Arc::new(RecordingFetcher::default());

        scheduler.trigger_prefetch(&coord(2, 1, 1), fetcher.clone());
        spawner.run_all().await;
        scheduler.trigger_prefetch(&coord(2, 1, 1), fetcher.clone());

        assert_eq!(scheduler.stats().rounds_started, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marked_neighbors_are_skipped() {
        let (scheduler, spawner, _mock) = manual_scheduler(PrefetchConfig::default());
        let fetcher = Arc::new(RecordingFetcher::default());

        // Two adjacent centers; the second center is marked while the first round runs
        scheduler.trigger_prefetch(&coord(3, 5, 3), fetcher.clone());
        scheduler.trigger_prefetch(&coord(3, 6, 3), fetcher.clone());
        spawner.run_all().await;

        let fetched = fetcher.fetched();
        assert!(!fetched[..7].contains(&coord(3, 6, 3)));
        // Second round: 4 neighbors were stored by the first, (5,3) is free again
        assert_eq!(fetched.len(), 11);
        assert!(fetched[7..].contains(&coord(3, 5, 3)));
    }

    #[tokio::test]
    async fn test_deep_zoom_is_not_prefetched() {
        let (scheduler, spawner, _mock) = manual_scheduler(PrefetchConfig::default());
        let fetcher = Arc::new(RecordingFetcher::default());

        scheduler.trigger_prefetch(&coord(8, 10, 10), fetcher.clone());

        assert_eq!(spawner.pending(), 0);
        assert_eq!(scheduler.active_markers(), 0);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_does_nothing() {
        let (scheduler, spawner, _mock) = manual_scheduler(PrefetchConfig::disabled());

        scheduler.trigger_prefetch(&coord(2, 0, 0), Arc::new(RecordingFetcher::default()));

        assert_eq!(spawner.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failures_are_swallowed() {
        let (scheduler, spawner, mock) = manual_scheduler(PrefetchConfig::default());
        let fetcher = Arc::new(RecordingFetcher {
            fail_x: Some(4),
            ..RecordingFetcher::default()
        });

        scheduler.trigger_prefetch(&coord(3, 5, 3), fetcher.clone());
        spawner.run_all().await;

        let stats = scheduler.stats();
        assert_eq!(stats.fetch_failures, 3);
        assert_eq!(stats.tiles_fetched, 5);
        assert_eq!(stats.rounds_completed, 1);
        assert!(!mock.contains(&CacheKey::for_tile(&coord(3, 4, 3))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_round_releases_slot_and_marker() {
        let (scheduler, spawner, _mock) = manual_scheduler(PrefetchConfig::default());
        let fetcher = Arc::new(RecordingFetcher {
            panic: true,
            ..RecordingFetcher::default()
        });

        scheduler.trigger_prefetch(&coord(3, 5, 3), fetcher);
        spawner.run_all().await;

        assert_eq!(scheduler.stats().rounds_aborted, 1);
        assert_eq!(scheduler.available_slots(), 5);
        assert_eq!(scheduler.active_markers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distributed_failure_still_fetches() {
        let (scheduler, spawner, mock) = manual_scheduler(PrefetchConfig::default());
        mock.fail_all();
        let fetcher = Arc::new(RecordingFetcher::default());

        scheduler.trigger_prefetch(&coord(3, 5, 3), fetcher.clone());
        spawner.run_all().await;

        // Existence check degraded to "nothing cached"
        assert_eq!(fetcher.fetched().len(), 8);
        assert_eq!(scheduler.stats().rounds_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_spawner_rounds_respect_concurrency_gate() {
        let (cache, _mock) = cache();
        let spawner = Arc::new(TokioSpawner::new());
        let config = PrefetchConfig {
            max_concurrent_rounds: 2,
            ..PrefetchConfig::default()
        };
        let scheduler = PrefetchScheduler::new(config, cache, spawner.clone());
        let fetcher = Arc::new(RecordingFetcher::default());

        for x in (0..20).step_by(4) {
            scheduler.trigger_prefetch(&coord(4, x, 5), fetcher.clone());
        }
        spawner.drain().await;

        assert_eq!(scheduler.stats().rounds_completed, 5);
        assert_eq!(fetcher.fetched().len(), 40);
        assert_eq!(scheduler.available_slots(), 2);
        assert_eq!(scheduler.active_markers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ends_cooldown_early() {
        let (cache, _mock) = cache();
        let spawner = Arc::new(TokioSpawner::new());
        let config = PrefetchConfig {
            cooldown: Duration::from_secs(3600),
            ..PrefetchConfig::default()
        };
        let scheduler = PrefetchScheduler::new(config, cache, spawner.clone());

        scheduler.trigger_prefetch(&coord(2, 1, 1), Arc::new(RecordingFetcher::default()));
        tokio::task::yield_now().await;
        spawner.shutdown().await;

        assert_eq!(scheduler.active_markers(), 0);
    }
}
