//! Interface of the shared distributed tier (L2).
//!
//! The `DistributedCache` trait is the seam between [`TileCache`] and the
//! network-accessed store. Implementations report failures faithfully through
//! [`DistributedCacheError`]; it is the orchestrator, not the backend, that
//! degrades an error into a miss or a "not stored" result.
//!
//! # Dyn Compatibility
//!
//! Async methods return `Pin<Box<dyn Future>>` so the tier can be held as
//! `Arc<dyn DistributedCache>` and swapped for an in-memory mock in tests.
//!
//! [`TileCache`]: super::TileCache

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use super::key::{CacheKey, KeyFilter};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised by a distributed tier backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributedCacheError {
    /// The connection URL could not be parsed.
    #[error("Invalid distributed cache URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connecting to the server failed.
    #[error("Distributed cache connection failed: {0}")]
    Connection(String),

    /// The operation did not complete within its deadline.
    #[error("Distributed cache {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// The server answered with an error or an unexpected reply.
    #[error("Distributed cache protocol error: {0}")]
    Protocol(String),
}

/// Server-side figures reported by the distributed tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributedDiagnostics {
    /// Successful key lookups seen by the server (all clients).
    pub keyspace_hits: u64,
    /// Failed key lookups seen by the server (all clients).
    pub keyspace_misses: u64,
    /// Memory used by the server, human readable (e.g. `1.5M`).
    pub used_memory_human: String,
    /// Number of connected clients.
    pub connected_clients: u64,
}

/// Shared, network-accessed key/value tier with per-entry expiry.
///
/// All implementations must be `Send + Sync`; no implementation may hold a
/// lock across a network round trip.
pub trait DistributedCache: Send + Sync {
    /// Look up one payload. `Ok(None)` means the key is absent.
    fn get<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> BoxFuture<'a, Result<Option<Bytes>, DistributedCacheError>>;

    /// Store one payload expiring after `ttl_secs`.
    fn set<'a>(
        &'a self,
        key: &'a CacheKey,
        payload: Bytes,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<(), DistributedCacheError>>;

    /// Look up many keys in a single round trip.
    ///
    /// The result contains present keys only.
    fn batch_get<'a>(
        &'a self,
        keys: &'a [CacheKey],
    ) -> BoxFuture<'a, Result<HashMap<CacheKey, Bytes>, DistributedCacheError>>;

    /// Store many payloads in a single round trip, returning how many were stored.
    fn batch_set<'a>(
        &'a self,
        entries: Vec<(CacheKey, Bytes)>,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<usize, DistributedCacheError>>;

    /// Delete every key selected by `filter`, returning how many were deleted.
    ///
    /// [`KeyFilter::All`] empties the whole database.
    fn delete_matching<'a>(
        &'a self,
        filter: &'a KeyFilter,
    ) -> BoxFuture<'a, Result<usize, DistributedCacheError>>;

    /// Server-side statistics.
    fn diagnostics(&self) -> BoxFuture<'_, Result<DistributedDiagnostics, DistributedCacheError>>;

    /// Round-trip liveness probe.
    fn ping(&self) -> BoxFuture<'_, Result<(), DistributedCacheError>>;

    /// Drop any open connection. The next operation reconnects.
    fn disconnect(&self) {}

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_display() {
        let err = DistributedCacheError::Timeout {
            operation: "GET",
            timeout_ms: 1000,
        };
        assert_eq!(err.to_string(), "Distributed cache GET timed out after 1000ms");
    }

    #[test]
    fn test_trait_is_dyn_compatible() {
        fn assert_dyn(_: Option<&dyn DistributedCache>) {}
        assert_dyn(None);
    }
}
