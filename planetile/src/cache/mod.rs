//! Tiered tile cache.
//!
//! - [`MemoryTier`]: bounded, time-expiring in-process tier (L1, moka)
//! - [`DistributedCache`]: shared network tier (L2), implemented by [`RedisTier`]
//! - [`TileCache`]: orchestrates both behind a coordinate-based API and
//!   collects [`CacheStatistics`]
//!
//! Cache keys ([`CacheKey`]) are an internal encoding; callers of
//! [`TileCache`] only exchange coordinates.

mod key;
mod memory;
mod redis_tier;
mod stats;
mod tiered;
mod traits;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use key::{CacheKey, KeyFilter, KEY_NAMESPACE};
pub use memory::{
    MemoryTier, MemoryTierConfig, DEFAULT_MEMORY_CAPACITY, DEFAULT_MEMORY_TTL, MAX_MEMORY_TTL_SECS,
};
pub use redis_tier::{
    RedisConfig, RedisTier, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REDIS_URL, DEFAULT_RESPONSE_TIMEOUT,
};
pub use stats::{CacheCounters, CacheStatistics};
pub use tiered::{ClearReport, TileCache, DEFAULT_TILE_TTL_SECS, MAX_TILE_TTL_SECS};
pub use traits::{BoxFuture, DistributedCache, DistributedCacheError, DistributedDiagnostics};
