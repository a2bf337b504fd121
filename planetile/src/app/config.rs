//! Application configuration for `TileService`.
//!
//! This module defines `AppConfig` which combines the configuration of every
//! component the service wires together: both cache tiers, the prefetcher,
//! the origin HTTP client and the dataset registry.

use std::time::Duration;

use super::error::AppError;
use crate::cache::{MemoryTierConfig, RedisConfig, DEFAULT_TILE_TTL_SECS};
use crate::config::ConfigFile;
use crate::coord::DatasetId;
use crate::prefetch::PrefetchConfig;
use crate::provider::{DatasetRegistry, OriginConfig};

/// Application configuration combining all component configs.
///
/// This is the top-level configuration passed to `TileService::start()`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// In-process tier bounds.
    pub memory: MemoryTierConfig,

    /// Distributed tier connection.
    pub redis: RedisConfig,

    /// Neighbor prefetch behavior.
    pub prefetch: PrefetchConfig,

    /// Origin HTTP client settings.
    pub origin: OriginConfig,

    /// Datasets that can be served.
    pub datasets: DatasetRegistry,

    /// Distributed tier TTL for tiles written by the service.
    pub tile_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            memory: MemoryTierConfig::default(),
            redis: RedisConfig::default(),
            prefetch: PrefetchConfig::default(),
            origin: OriginConfig::default(),
            datasets: DatasetRegistry::builtin(),
            tile_ttl_secs: DEFAULT_TILE_TTL_SECS,
        }
    }
}

impl AppConfig {
    /// Create application config from the configuration file.
    ///
    /// `[datasets]` entries are layered over the built-in registry, replacing
    /// built-in templates of the same name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a dataset entry is not a valid dataset
    /// name or URL template. Values that passed `ConfigFile` validation never
    /// fail here.
    pub fn from_config_file(config: &ConfigFile) -> Result<Self, AppError> {
        let mut datasets = DatasetRegistry::builtin();
        for (name, template) in &config.datasets {
            let dataset = DatasetId::new(name.as_str())
                .map_err(|e| AppError::Config(format!("datasets.{}: {}", name, e)))?;
            datasets
                .insert(dataset, template)
                .map_err(|e| AppError::Config(format!("datasets.{}: {}", name, e)))?;
        }

        Ok(Self {
            memory: MemoryTierConfig {
                capacity: config.cache.memory_capacity,
                ttl: Duration::from_secs(config.cache.memory_ttl_secs),
            },
            redis: RedisConfig {
                url: config.redis.url.clone(),
                connect_timeout: Duration::from_millis(config.redis.connect_timeout_ms),
                response_timeout: Duration::from_millis(config.redis.response_timeout_ms),
            },
            prefetch: PrefetchConfig {
                enabled: config.prefetch.enabled,
                radius: config.prefetch.radius,
                max_zoom: config.prefetch.max_zoom,
                max_concurrent_rounds: config.prefetch.max_concurrent_rounds,
                batch_size: config.prefetch.batch_size,
                batch_pause: Duration::from_millis(config.prefetch.batch_pause_ms),
                cooldown: Duration::from_secs(config.prefetch.cooldown_secs),
                dedup_capacity: config.prefetch.dedup_capacity,
            },
            origin: OriginConfig {
                timeout: Duration::from_secs(config.origin.timeout_secs),
                max_idle_per_host: config.origin.max_idle_per_host,
            },
            datasets,
            tile_ttl_secs: config.cache.tile_ttl_secs,
        })
    }
}
