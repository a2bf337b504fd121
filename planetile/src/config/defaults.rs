//! Default values and constants for all configuration settings.
//!
//! Component defaults are owned by the components themselves and only
//! re-exported here; this module adds the config-only ones and the
//! `ConfigFile::default()` implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::settings::*;

pub use crate::cache::{
    DEFAULT_MEMORY_CAPACITY, DEFAULT_REDIS_URL, DEFAULT_TILE_TTL_SECS, MAX_MEMORY_TTL_SECS,
    MAX_TILE_TTL_SECS,
};
pub use crate::prefetch::{
    DEFAULT_BATCH_PAUSE_MS, DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN_SECS, DEFAULT_DEDUP_CAPACITY,
    DEFAULT_MAX_CONCURRENT_ROUNDS, DEFAULT_MAX_ZOOM, DEFAULT_RADIUS, MAX_RADIUS,
};
pub use crate::provider::{DEFAULT_MAX_IDLE_PER_HOST, DEFAULT_ORIGIN_TIMEOUT_SECS};

/// Default memory tier TTL in seconds.
pub const DEFAULT_MEMORY_TTL_SECS: u64 = 300;

/// Default distributed tier connect timeout in milliseconds.
pub const DEFAULT_REDIS_CONNECT_TIMEOUT_MS: u64 = 1000;

/// Default distributed tier response timeout in milliseconds.
pub const DEFAULT_REDIS_RESPONSE_TIMEOUT_MS: u64 = 1000;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "planetile.log";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted log levels.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Default log directory (~/.planetile/logs).
pub fn default_log_directory() -> PathBuf {
    super::file::config_directory().join("logs")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                memory_capacity: DEFAULT_MEMORY_CAPACITY,
                memory_ttl_secs: DEFAULT_MEMORY_TTL_SECS,
                tile_ttl_secs: DEFAULT_TILE_TTL_SECS,
            },
            redis: RedisSettings {
                url: DEFAULT_REDIS_URL.to_string(),
                connect_timeout_ms: DEFAULT_REDIS_CONNECT_TIMEOUT_MS,
                response_timeout_ms: DEFAULT_REDIS_RESPONSE_TIMEOUT_MS,
            },
            prefetch: PrefetchSettings {
                enabled: true,
                radius: DEFAULT_RADIUS,
                max_zoom: DEFAULT_MAX_ZOOM,
                max_concurrent_rounds: DEFAULT_MAX_CONCURRENT_ROUNDS,
                batch_size: DEFAULT_BATCH_SIZE,
                batch_pause_ms: DEFAULT_BATCH_PAUSE_MS,
                cooldown_secs: DEFAULT_COOLDOWN_SECS,
                dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            },
            origin: OriginSettings {
                timeout_secs: DEFAULT_ORIGIN_TIMEOUT_SECS,
                max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
            },
            datasets: BTreeMap::new(),
            logging: LoggingSettings {
                directory: default_log_directory(),
                file: DEFAULT_LOG_FILE.to_string(),
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}
