//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Memory tier and TTL settings
    pub cache: CacheSettings,
    /// Distributed tier connection
    pub redis: RedisSettings,
    /// Neighbor prefetch
    pub prefetch: PrefetchSettings,
    /// Origin HTTP client
    pub origin: OriginSettings,
    /// Extra or overriding datasets, name → URL template
    pub datasets: BTreeMap<String, String>,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum number of tiles held in memory
    pub memory_capacity: u64,
    /// Lifetime of a tile in memory, in seconds
    pub memory_ttl_secs: u64,
    /// Lifetime of a tile in the distributed tier, in seconds
    pub tile_ttl_secs: u64,
}

/// Distributed tier connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    /// Server URL (redis://, rediss:// or redis+unix://)
    pub url: String,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
}

/// Prefetch configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchSettings {
    pub enabled: bool,
    /// Neighborhood radius in tiles
    pub radius: u32,
    /// Deepest zoom level that is prefetched
    pub max_zoom: u8,
    pub max_concurrent_rounds: usize,
    /// Origin fetches issued together
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    pub cooldown_secs: u64,
    /// Maximum number of dedup markers
    pub dedup_capacity: usize,
}

/// Origin HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginSettings {
    pub timeout_secs: u64,
    pub max_idle_per_host: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory holding the log file
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
    /// Default level when RUST_LOG is not set
    pub level: String,
}
