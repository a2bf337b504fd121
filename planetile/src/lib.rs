//! Planetile - tiered tile cache for planetary map tiles
//!
//! This library serves equirectangular map tiles (Mars, Moon, Mercury) through
//! a two-tier cache: a bounded in-process tier and a shared Redis tier, backed
//! by the NASA Trek tile servers as origin. Every served tile warms its
//! neighbors in the background so that panning clients hit the cache.
//!
//! - [`coord`]: tile coordinates, grid extent and neighbor computation
//! - [`cache`]: memory tier, distributed tier and the orchestrating `TileCache`
//! - [`prefetch`]: deduplicated, bounded neighbor prefetch
//! - [`provider`]: dataset URL templates and the origin HTTP client
//! - [`config`]: `~/.planetile/config.ini`
//! - [`app`]: the `TileService` tying everything together

pub mod app;
pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod prefetch;
pub mod provider;
