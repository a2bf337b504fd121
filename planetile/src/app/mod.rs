//! Application wiring and lifecycle.
//!
//! [`TileService`] is the explicitly constructed service object a front-end
//! holds: it owns both cache tiers, the origin client and the prefetcher,
//! and has a `start`/`shutdown` lifecycle instead of module-level globals.
//!
//! ```text
//!   serve_tile ─► TileCache ── hit ──────────────────────► TileResponse (HIT)
//!                     │
//!                    miss ─► Origin ─► write-back (detached)
//!                                  └─► TileResponse (MISS)
//!   every served tile ─► PrefetchScheduler ─► neighbors (detached)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use planetile::app::{AppConfig, TileService};
//!
//! let service = TileService::start(AppConfig::default()).await?;
//! let tile = service.serve("global", 3, 5, 2).await?;
//! println!("{} bytes, X-Cache: {}", tile.data.len(), tile.cache_status);
//! service.shutdown().await;
//! ```

mod config;
mod error;
mod metadata;
mod service;

pub use config::AppConfig;
pub use error::{AppError, ServeError};
pub use metadata::{
    HealthReport, HealthStatus, InitialView, PlanetMetadata, ServiceStats, ZoomRange,
    INITIAL_ZOOM, TILE_URL_TEMPLATE,
};
pub use service::{
    CacheStatus, TileResponse, TileService, TILE_CACHE_CONTROL, TILE_CONTENT_TYPE,
};
