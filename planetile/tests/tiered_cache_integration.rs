//! Integration tests for the tiered cache and the tile service.
//!
//! Two service instances share one in-process distributed tier, the way two
//! API workers share one Redis server.
//!
//! Run with: `cargo test --test tiered_cache_integration`

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use planetile::app::{AppConfig, CacheStatus, ServeError, TileService};
use planetile::cache::testing::MockDistributedCache;
use planetile::cache::{CacheKey, MemoryTier, MemoryTierConfig, TileCache};
use planetile::coord::{DatasetId, TileCoord, TileIndex};
use planetile::prefetch::PrefetchConfig;
use planetile::provider::MockOriginClient;

// ============================================================================
// Helper Functions
// ============================================================================

fn coord(dataset: &str, z: u8, x: u32, y: u32) -> TileCoord {
    TileCoord::parse(dataset, z, x, y).unwrap()
}

fn stored(shared: &MockDistributedCache, tile: &TileCoord) -> bool {
    shared.contains(&CacheKey::for_tile(tile))
}

fn tile_cache(shared: &MockDistributedCache) -> TileCache {
    let memory = MemoryTier::new(MemoryTierConfig::default());
    TileCache::new(memory, Arc::new(shared.clone()))
}

fn service(shared: &MockDistributedCache, origin: &Arc<MockOriginClient>) -> TileService {
    let config = AppConfig {
        prefetch: PrefetchConfig::disabled(),
        ..AppConfig::default()
    };
    TileService::with_backends(&config, Arc::new(shared.clone()), origin.clone())
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A tile stored by one instance is found by another and promoted.
#[tokio::test]
async fn test_instances_share_distributed_tier() {
    let shared = MockDistributedCache::new();
    let writer = tile_cache(&shared);
    let reader = tile_cache(&shared);
    let tile = coord("global", 4, 9, 3);

    assert!(writer.store(&tile, Bytes::from_static(b"tile"), 60).await);
    assert_eq!(
        reader.fetch_cached(&tile).await,
        Some(Bytes::from_static(b"tile"))
    );
    assert_eq!(
        reader.fetch_cached(&tile).await,
        Some(Bytes::from_static(b"tile"))
    );

    let stats = reader.stats().await;
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.distributed_hits, 1);
    assert_eq!(stats.memory_hits, 1);
}

/// Batch operations return only present tiles.
#[tokio::test]
async fn test_batch_round_trip() {
    let shared = MockDistributedCache::new();
    let cache = tile_cache(&shared);
    let moon = DatasetId::new("moon").unwrap();

    let tiles: HashMap<TileIndex, Bytes> = (0..3)
        .map(|x| (TileIndex::new(2, x, 1), Bytes::from(vec![x as u8; 4])))
        .collect();
    assert_eq!(cache.batch_store(&moon, tiles.clone(), 60).await, 3);

    let requested = [
        TileIndex::new(2, 0, 1),
        TileIndex::new(2, 1, 1),
        TileIndex::new(2, 2, 1),
        TileIndex::new(2, 3, 1),
        TileIndex::new(2, 0, 2),
    ];
    let found = cache.batch_fetch(&moon, &requested).await;

    assert_eq!(found, tiles);
}

/// Clearing one dataset leaves the others in both tiers.
#[tokio::test]
async fn test_clear_one_dataset() {
    let shared = MockDistributedCache::new();
    let cache = tile_cache(&shared);
    for dataset in ["global", "moon", "mercury"] {
        cache
            .store(&coord(dataset, 3, 1, 1), Bytes::from_static(b"t"), 60)
            .await;
    }

    let report = cache.clear(Some(DatasetId::new("moon").unwrap()), None).await;

    assert_eq!(report.memory_removed, 1);
    assert_eq!(report.distributed_removed, Some(1));
    assert!(!stored(&shared, &coord("moon", 3, 1, 1)));
    assert!(stored(&shared, &coord("global", 3, 1, 1)));
    assert!(cache.fetch_cached(&coord("mercury", 3, 1, 1)).await.is_some());
}

/// The service keeps answering while the distributed tier is down.
#[tokio::test]
async fn test_service_degrades_to_origin() {
    let shared = MockDistributedCache::new();
    let origin = Arc::new(MockOriginClient::serving(b"jpeg"));
    let degraded = service(&shared, &origin);
    shared.fail_all();

    let response = degraded.serve("global", 2, 1, 1).await.unwrap();
    assert_eq!(response.cache_status, CacheStatus::Miss);
    degraded.drain().await;
    assert_eq!(shared.len(), 0);

    let stats = degraded.stats().await;
    assert!(stats.cache.distributed_errors >= 1);
    assert!(!degraded.health().await.distributed_reachable);

    // Back up: the next instance finds nothing stale and repopulates L2
    shared.recover();
    let other = service(&shared, &origin);
    assert_eq!(
        other.serve("global", 2, 1, 1).await.unwrap().cache_status,
        CacheStatus::Miss
    );
    other.drain().await;
    assert_eq!(shared.len(), 1);
}

/// A tile fetched by one instance is a hit on another.
#[tokio::test]
async fn test_service_write_back_visible_to_peer() {
    let shared = MockDistributedCache::new();
    let origin = Arc::new(MockOriginClient::serving(b"jpeg"));
    let first = service(&shared, &origin);
    let second = service(&shared, &origin);

    let miss = first.serve("mercury", 3, 2, 2).await.unwrap();
    first.drain().await;
    let hit = second.serve("mercury", 3, 2, 2).await.unwrap();

    assert_eq!(miss.cache_status, CacheStatus::Miss);
    assert_eq!(hit.cache_status, CacheStatus::Hit);
    assert_eq!(hit.data, miss.data);
    assert_eq!(origin.requested().len(), 1);
}

/// Unknown datasets are rejected before the origin is contacted.
#[tokio::test]
async fn test_service_rejects_unknown_dataset() {
    let shared = MockDistributedCache::new();
    let origin = Arc::new(MockOriginClient::serving(b"jpeg"));
    let tiles = service(&shared, &origin);

    let err = tiles.serve("phobos", 1, 0, 0).await.unwrap_err();

    assert!(matches!(err, ServeError::UnsupportedDataset { .. }));
    assert!(origin.requested().is_empty());
}
