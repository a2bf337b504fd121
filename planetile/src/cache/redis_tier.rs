//! Redis-backed distributed tier (L2).
//!
//! The connection is opened lazily on the first operation and reused
//! afterwards through a [`ConnectionManager`], which reconnects on its own
//! after a dropped connection. Every command runs under a response deadline,
//! and batch operations are pipelined into a single round trip.
//!
//! # Lock Discipline
//!
//! The connection slot is a `parking_lot::RwLock` that is only ever held to
//! clone or install the manager. Connecting and every command happen with
//! no lock held.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError, RedisResult};
use tracing::{debug, info};

use super::key::{CacheKey, KeyFilter};
use super::traits::{BoxFuture, DistributedCache, DistributedCacheError, DistributedDiagnostics};

/// Default server URL.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Default deadline for establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default deadline for a single command or pipeline.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Keys requested per `SCAN` iteration during a filtered clear.
const SCAN_COUNT: usize = 500;

/// Configuration for [`RedisTier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://localhost:6379/0`.
    pub url: String,
    /// Deadline for establishing the connection.
    pub connect_timeout: Duration,
    /// Deadline for each command or pipeline.
    pub response_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Distributed tile tier backed by a Redis server.
pub struct RedisTier {
    client: Client,
    config: RedisConfig,
    connection: RwLock<Option<ConnectionManager>>,
}

impl RedisTier {
    /// Create a tier for the configured server.
    ///
    /// Only the URL is validated here; no connection is made until the first
    /// operation.
    pub fn new(config: RedisConfig) -> Result<Self, DistributedCacheError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            DistributedCacheError::InvalidUrl {
                url: config.url.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            client,
            config,
            connection: RwLock::new(None),
        })
    }

    /// The configuration this tier was created with.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Whether a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    /// Get the shared connection, establishing it on first use.
    async fn connection(&self) -> Result<ConnectionManager, DistributedCacheError> {
        if let Some(conn) = self.connection.read().clone() {
            return Ok(conn);
        }

        let timeout = self.config.connect_timeout;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(self.client.clone()))
            .await
            .map_err(|_| DistributedCacheError::Timeout {
                operation: "CONNECT",
                timeout_ms: timeout.as_millis() as u64,
            })?
            .map_err(|e| DistributedCacheError::Connection(e.to_string()))?;

        // Another task may have connected while we were waiting
        let mut slot = self.connection.write();
        if slot.is_none() {
            info!(url = %self.config.url, "Distributed cache connected");
        }
        Ok(slot.get_or_insert(conn).clone())
    }

    /// Run one command future under the response deadline.
    async fn run<T, F>(&self, operation: &'static str, command: F) -> Result<T, DistributedCacheError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        let timeout = self.config.response_timeout;
        match tokio::time::timeout(timeout, command).await {
            Ok(result) => result.map_err(|e| map_redis_error(operation, timeout, e)),
            Err(_) => Err(DistributedCacheError::Timeout {
                operation,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn get_inner(&self, key: &CacheKey) -> Result<Option<Bytes>, DistributedCacheError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = self
            .run("GET", redis::cmd("GET").arg(key.as_str()).query_async(&mut conn))
            .await?;
        Ok(value.map(Bytes::from))
    }

    async fn set_inner(
        &self,
        key: &CacheKey,
        payload: Bytes,
        ttl_secs: u64,
    ) -> Result<(), DistributedCacheError> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key.as_str())
            .arg(payload.as_ref())
            .arg("EX")
            .arg(ttl_secs.max(1));
        let () = self.run("SET", cmd.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn batch_get_inner(
        &self,
        keys: &[CacheKey],
    ) -> Result<HashMap<CacheKey, Bytes>, DistributedCacheError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("GET").arg(key.as_str());
        }

        let values: Vec<Option<Vec<u8>>> =
            self.run("pipelined GET", pipe.query_async(&mut conn)).await?;

        Ok(keys
            .iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|v| (key.clone(), Bytes::from(v))))
            .collect())
    }

    async fn batch_set_inner(
        &self,
        entries: Vec<(CacheKey, Bytes)>,
        ttl_secs: u64,
    ) -> Result<usize, DistributedCacheError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for (key, payload) in &entries {
            pipe.cmd("SET")
                .arg(key.as_str())
                .arg(payload.as_ref())
                .arg("EX")
                .arg(ttl_secs.max(1))
                .ignore();
        }

        let () = self.run("pipelined SET", pipe.query_async(&mut conn)).await?;
        Ok(entries.len())
    }

    async fn delete_matching_inner(&self, filter: &KeyFilter) -> Result<usize, DistributedCacheError> {
        let mut conn = self.connection().await?;

        if *filter == KeyFilter::All {
            let before: usize = self
                .run("DBSIZE", redis::cmd("DBSIZE").query_async(&mut conn))
                .await?;
            let () = self
                .run("FLUSHDB", redis::cmd("FLUSHDB").query_async(&mut conn))
                .await?;
            return Ok(before);
        }

        let pattern = filter.pattern();
        let mut cursor: u64 = 0;
        let mut deleted = 0usize;

        loop {
            let mut scan = redis::cmd("SCAN");
            scan.arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT);
            let (next, keys): (u64, Vec<String>) =
                self.run("SCAN", scan.query_async(&mut conn)).await?;

            if !keys.is_empty() {
                let removed: usize = self
                    .run("UNLINK", redis::cmd("UNLINK").arg(&keys).query_async(&mut conn))
                    .await?;
                deleted += removed;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = %pattern, deleted, "Distributed cache keys removed");
        Ok(deleted)
    }

    async fn diagnostics_inner(&self) -> Result<DistributedDiagnostics, DistributedCacheError> {
        let mut conn = self.connection().await?;
        let info: String = self
            .run("INFO", redis::cmd("INFO").query_async(&mut conn))
            .await?;
        Ok(parse_info(&info))
    }

    async fn ping_inner(&self) -> Result<(), DistributedCacheError> {
        let mut conn = self.connection().await?;
        let reply: String = self
            .run("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        if reply.eq_ignore_ascii_case("PONG") {
            Ok(())
        } else {
            Err(DistributedCacheError::Protocol(format!(
                "unexpected PING reply '{}'",
                reply
            )))
        }
    }
}

impl DistributedCache for RedisTier {
    fn get<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> BoxFuture<'a, Result<Option<Bytes>, DistributedCacheError>> {
        Box::pin(self.get_inner(key))
    }

    fn set<'a>(
        &'a self,
        key: &'a CacheKey,
        payload: Bytes,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<(), DistributedCacheError>> {
        Box::pin(self.set_inner(key, payload, ttl_secs))
    }

    fn batch_get<'a>(
        &'a self,
        keys: &'a [CacheKey],
    ) -> BoxFuture<'a, Result<HashMap<CacheKey, Bytes>, DistributedCacheError>> {
        Box::pin(self.batch_get_inner(keys))
    }

    fn batch_set<'a>(
        &'a self,
        entries: Vec<(CacheKey, Bytes)>,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<usize, DistributedCacheError>> {
        Box::pin(self.batch_set_inner(entries, ttl_secs))
    }

    fn delete_matching<'a>(
        &'a self,
        filter: &'a KeyFilter,
    ) -> BoxFuture<'a, Result<usize, DistributedCacheError>> {
        Box::pin(self.delete_matching_inner(filter))
    }

    fn diagnostics(&self) -> BoxFuture<'_, Result<DistributedDiagnostics, DistributedCacheError>> {
        Box::pin(self.diagnostics_inner())
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), DistributedCacheError>> {
        Box::pin(self.ping_inner())
    }

    fn disconnect(&self) {
        if self.connection.write().take().is_some() {
            info!(url = %self.config.url, "Distributed cache disconnected");
        }
    }

    fn name(&self) -> &str {
        "redis"
    }
}

fn map_redis_error(operation: &'static str, timeout: Duration, err: RedisError) -> DistributedCacheError {
    if err.is_timeout() {
        DistributedCacheError::Timeout {
            operation,
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        DistributedCacheError::Connection(err.to_string())
    } else {
        DistributedCacheError::Protocol(format!("{}: {}", operation, err))
    }
}

/// Extract the diagnostics fields from an `INFO` reply.
///
/// Missing or malformed fields keep their default value.
fn parse_info(info: &str) -> DistributedDiagnostics {
    let fields: HashMap<&str, &str> = info
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .collect();

    let number = |name: &str| {
        fields
            .get(name)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
    };

    DistributedDiagnostics {
        keyspace_hits: number("keyspace_hits"),
        keyspace_misses: number("keyspace_misses"),
        used_memory_human: fields
            .get("used_memory_human")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        connected_clients: number("connected_clients"),
    }
}
