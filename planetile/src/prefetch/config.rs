//! Configuration for neighbor prefetching.

use std::time::Duration;

// ==================== Prefetch Defaults ====================

/// Default neighborhood radius in tiles.
pub const DEFAULT_RADIUS: u32 = 1;

/// Widest neighborhood radius accepted from configuration and the CLI.
pub const MAX_RADIUS: u32 = 4;

/// Default deepest zoom level that is prefetched.
///
/// Deeper levels have too many tiles for speculative fetching to pay off.
pub const DEFAULT_MAX_ZOOM: u8 = 7;

/// Default number of prefetch rounds allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_ROUNDS: usize = 5;

/// Default number of origin fetches issued together.
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// Default pause between origin fetch batches in milliseconds.
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 10;

/// Default time a finished round keeps its vicinity reserved, in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = 2;

/// Default maximum number of dedup markers retained.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1000;

/// Configuration for [`PrefetchScheduler`](super::PrefetchScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Whether prefetch rounds are started at all.
    pub enabled: bool,

    /// Neighborhood radius around the served tile.
    ///
    /// Default: 1 (the 8 surrounding tiles).
    pub radius: u32,

    /// Neighbors deeper than this zoom level are never prefetched.
    pub max_zoom: u8,

    /// Maximum number of rounds in their fetch phase at once.
    ///
    /// Further rounds wait for a slot.
    pub max_concurrent_rounds: usize,

    /// Origin fetches issued together within a round.
    pub batch_size: usize,

    /// Pause between fetch batches, bounding burst load on the origin.
    pub batch_pause: Duration,

    /// How long a finished round keeps its marker before releasing the vicinity.
    pub cooldown: Duration,

    /// Maximum number of dedup markers. Over the bound, the oldest are dropped.
    pub dedup_capacity: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: DEFAULT_RADIUS,
            max_zoom: DEFAULT_MAX_ZOOM,
            max_concurrent_rounds: DEFAULT_MAX_CONCURRENT_ROUNDS,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: Duration::from_millis(DEFAULT_BATCH_PAUSE_MS),
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

impl PrefetchConfig {
    /// Configuration with prefetching switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}
