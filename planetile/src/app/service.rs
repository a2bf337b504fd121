//! Tile service: lifecycle and foreground serve path.
//!
//! `TileService` owns the tiered cache, the origin and the prefetcher, and is
//! what a front-end (HTTP router, CLI) holds on to. It is constructed
//! explicitly and torn down with [`TileService::shutdown`]; there is no
//! process-global cache state.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::AppConfig;
use super::error::{AppError, ServeError};
use super::metadata::{HealthReport, PlanetMetadata, ServiceStats};
use crate::cache::{ClearReport, DistributedCache, MemoryTier, RedisTier, TileCache};
use crate::coord::{DatasetId, TileCoord};
use crate::prefetch::{PrefetchScheduler, TaskSpawner, TokioSpawner};
use crate::provider::{Origin, OriginClient, ProviderError, ReqwestOriginClient, TileFetcher};

/// Content type of every served tile.
pub const TILE_CONTENT_TYPE: &str = "image/jpeg";

/// Browser caching policy for served tiles.
pub const TILE_CACHE_CONTROL: &str = "public, max-age=86400";

/// Where a served tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    /// Found in the memory or distributed tier.
    Hit,
    /// Fetched from the origin.
    Miss,
}

impl CacheStatus {
    /// Value for an `X-Cache` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A served tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub data: Bytes,
    pub cache_status: CacheStatus,
}

/// Tiered tile cache with origin fallback and neighbor prefetch.
pub struct TileService {
    cache: Arc<TileCache>,
    origin: Arc<Origin>,
    prefetch: PrefetchScheduler,
    spawner: TokioSpawner,
    tile_ttl_secs: u64,
}

impl TileService {
    /// Start the service against Redis and the HTTP origin.
    ///
    /// The distributed tier is probed once; an unreachable server is logged
    /// and tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis URL is malformed or the HTTP client
    /// cannot be built.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let distributed = RedisTier::new(config.redis.clone())?;
        let client = ReqwestOriginClient::new(&config.origin).map_err(AppError::OriginClient)?;

        let service = Self::with_backends(&config, Arc::new(distributed), Arc::new(client));

        match service.cache.ping_distributed().await {
            Ok(()) => info!(url = %config.redis.url, "Distributed cache reachable"),
            Err(e) => warn!(
                url = %config.redis.url,
                error = %e,
                "Distributed cache unreachable, serving from memory and origin"
            ),
        }

        info!(
            datasets = service.origin.registry().names().len(),
            memory_capacity = config.memory.capacity,
            prefetch = config.prefetch.enabled,
            "Tile service started"
        );
        Ok(service)
    }

    /// Assemble the service from explicit backends.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_backends(
        config: &AppConfig,
        distributed: Arc<dyn DistributedCache>,
        client: Arc<dyn OriginClient>,
    ) -> Self {
        let cache = Arc::new(
            TileCache::new(MemoryTier::new(config.memory), distributed)
                .with_default_ttl(config.tile_ttl_secs),
        );
        let origin = Arc::new(Origin::new(config.datasets.clone(), client));
        let spawner = TokioSpawner::new();
        let prefetch = PrefetchScheduler::new(
            config.prefetch.clone(),
            Arc::clone(&cache),
            Arc::new(spawner.clone()),
        );

        Self {
            cache,
            origin,
            prefetch,
            spawner,
            tile_ttl_secs: config.tile_ttl_secs,
        }
    }

    /// Serve a tile given as raw request parameters.
    pub async fn serve(
        &self,
        dataset: &str,
        z: u8,
        x: u32,
        y: u32,
    ) -> Result<TileResponse, ServeError> {
        let coord = TileCoord::parse(dataset, z, x, y)?;
        self.serve_tile(&coord).await
    }

    /// Serve a tile from the cache, falling back to the origin.
    ///
    /// A fetched tile is written back to both tiers in the background, and
    /// every served tile triggers a neighbor prefetch.
    pub async fn serve_tile(&self, coord: &TileCoord) -> Result<TileResponse, ServeError> {
        if let Some(data) = self.cache.fetch_cached(coord).await {
            debug!(tile = %coord, bytes = data.len(), "Served from cache");
            self.trigger_prefetch(coord);
            return Ok(TileResponse {
                data,
                cache_status: CacheStatus::Hit,
            });
        }

        let data = self
            .origin
            .fetch_tile(coord)
            .await
            .map_err(|e| serve_error(coord, e))?;

        self.write_back(coord.clone(), data.clone());
        self.trigger_prefetch(coord);

        Ok(TileResponse {
            data,
            cache_status: CacheStatus::Miss,
        })
    }

    fn write_back(&self, coord: TileCoord, data: Bytes) {
        let cache = Arc::clone(&self.cache);
        let ttl_secs = self.tile_ttl_secs;
        let task = async move {
            if !cache.store(&coord, data, ttl_secs).await {
                debug!(tile = %coord, "Tile kept in memory only");
            }
        };

        if !self.spawner.spawn("tile-write-back", Box::pin(task)) {
            debug!("Write-back skipped, service shutting down");
        }
    }

    fn trigger_prefetch(&self, coord: &TileCoord) {
        let fetcher: Arc<dyn TileFetcher> = self.origin.clone();
        self.prefetch.trigger_prefetch(coord, fetcher);
    }

    /// Health of the service and its distributed tier.
    pub async fn health(&self) -> HealthReport {
        HealthReport::from_ping(self.cache.ping_distributed().await)
    }

    /// Map client bootstrap document.
    pub fn metadata(&self) -> PlanetMetadata {
        PlanetMetadata::new(self.origin.registry(), self.prefetch.config().max_zoom)
    }

    /// Cache and prefetch statistics.
    pub async fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.cache.stats().await,
            prefetch: self.prefetch.stats(),
        }
    }

    /// Remove cached tiles, optionally restricted to a dataset and/or zoom.
    pub async fn clear(&self, dataset: Option<DatasetId>, zoom: Option<u8>) -> ClearReport {
        self.cache.clear(dataset, zoom).await
    }

    /// Wait for pending write-backs and prefetch rounds to finish.
    pub async fn drain(&self) {
        self.spawner.drain().await;
    }

    /// Stop background work and close the distributed tier connection.
    ///
    /// Running prefetch rounds are cancelled. Tiles can still be served
    /// afterwards, but nothing is written back or prefetched.
    pub async fn shutdown(&self) {
        self.spawner.shutdown().await;
        self.cache.disconnect();
        info!("Tile service stopped");
    }

    /// The tiered cache behind this service.
    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// The neighbor prefetcher.
    pub fn prefetcher(&self) -> &PrefetchScheduler {
        &self.prefetch
    }

    /// The origin tiles are fetched from on a miss.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

fn serve_error(coord: &TileCoord, error: ProviderError) -> ServeError {
    if error.is_configuration() {
        warn!(tile = %coord, error = %error, "Tile requested for unsupported dataset");
        ServeError::UnsupportedDataset {
            dataset: coord.dataset.to_string(),
            reason: error.to_string(),
        }
    } else {
        debug!(tile = %coord, error = %error, "Tile unavailable");
        ServeError::TileUnavailable {
            tile: coord.to_string(),
            reason: error.to_string(),
        }
    }
}
