//! Neighbor-aware background prefetching.
//!
//! After every served tile, the [`PrefetchScheduler`] warms the surrounding
//! tiles so that a client panning the map finds them cached. Rounds are
//! bounded by a concurrency gate, deduplicated by [`DedupMarkers`], and run as
//! detached tasks through a [`TaskSpawner`].

mod config;
mod dedup;
mod scheduler;
mod spawner;

pub use config::{
    PrefetchConfig, DEFAULT_BATCH_PAUSE_MS, DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN_SECS,
    DEFAULT_DEDUP_CAPACITY, DEFAULT_MAX_CONCURRENT_ROUNDS, DEFAULT_MAX_ZOOM, DEFAULT_RADIUS,
    MAX_RADIUS,
};
pub use dedup::{DedupMarkers, Generation};
pub use scheduler::{PrefetchScheduler, PrefetchStats};
pub use spawner::{error_boundary, DetachedTask, ManualSpawner, TaskSpawner, TokioSpawner};
