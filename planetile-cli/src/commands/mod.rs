//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`cache`] - Cache statistics and clearing
//! - [`info`] - Health report and planet metadata
//! - [`init`] - Configuration initialization
//! - [`neighbors`] - Prefetch neighborhood of a tile
//! - [`tile`] - Serve a single tile through the cache

pub mod cache;
pub mod common;
pub mod info;
pub mod init;
pub mod neighbors;
pub mod tile;
