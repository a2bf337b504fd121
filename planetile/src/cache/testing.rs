//! In-memory distributed tier for tests.
//!
//! `MockDistributedCache` keeps entries in a `HashMap`, records every
//! operation it receives, and can be told to fail selected operations so the
//! degradation paths of [`TileCache`](super::TileCache) can be exercised
//! without a Redis server.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::key::{CacheKey, KeyFilter};
use super::traits::{BoxFuture, DistributedCache, DistributedCacheError, DistributedDiagnostics};

/// Recorded distributed tier operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributedOp {
    Get(CacheKey),
    Set { key: CacheKey, ttl_secs: u64 },
    BatchGet(Vec<CacheKey>),
    BatchSet { keys: Vec<CacheKey>, ttl_secs: u64 },
    DeleteMatching(KeyFilter),
    Diagnostics,
    Ping,
}

type FailPredicate = Box<dyn Fn(&DistributedOp) -> bool + Send + Sync>;

/// A stored entry and the TTL it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub payload: Bytes,
    pub ttl_secs: u64,
}

/// Configurable mock distributed tier.
///
/// Clones share state, so a test can keep one handle while the cache under
/// test owns another.
#[derive(Clone, Default)]
pub struct MockDistributedCache {
    data: Arc<Mutex<HashMap<CacheKey, StoredEntry>>>,
    operations: Arc<Mutex<Vec<DistributedOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockDistributedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDistributedCache")
            .field("entries", &self.data.lock().len())
            .field("operations", &self.operations.lock().len())
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl MockDistributedCache {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation for which `predicate` returns true.
    pub fn fail_when(&self, predicate: impl Fn(&DistributedOp) -> bool + Send + Sync + 'static) {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Fail every operation.
    pub fn fail_all(&self) {
        self.fail_when(|_| true);
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        *self.fail_when.lock() = None;
    }

    /// Put an entry directly into the store without recording an operation.
    pub fn seed(&self, key: CacheKey, payload: impl Into<Bytes>) {
        self.data.lock().insert(
            key,
            StoredEntry {
                payload: payload.into(),
                ttl_secs: 0,
            },
        );
    }

    /// Stored entry for a key.
    pub fn entry(&self, key: &CacheKey) -> Option<StoredEntry> {
        self.data.lock().get(key).cloned()
    }

    /// Whether a key is stored.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// Every operation received so far, in order.
    pub fn operations(&self) -> Vec<DistributedOp> {
        self.operations.lock().clone()
    }

    /// Number of recorded operations satisfying `predicate`.
    pub fn count_operations(&self, predicate: impl Fn(&DistributedOp) -> bool) -> usize {
        self.operations.lock().iter().filter(|op| predicate(op)).count()
    }

    /// Forget recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Record `op` and report whether it should fail.
    fn record(&self, op: DistributedOp) -> Result<(), DistributedCacheError> {
        let fail = self
            .fail_when
            .lock()
            .as_ref()
            .is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);

        if fail {
            Err(DistributedCacheError::Connection(
                "injected failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl DistributedCache for MockDistributedCache {
    fn get<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> BoxFuture<'a, Result<Option<Bytes>, DistributedCacheError>> {
        Box::pin(async move {
            self.record(DistributedOp::Get(key.clone()))?;
            Ok(self.data.lock().get(key).map(|e| e.payload.clone()))
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a CacheKey,
        payload: Bytes,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<(), DistributedCacheError>> {
        Box::pin(async move {
            self.record(DistributedOp::Set {
                key: key.clone(),
                ttl_secs,
            })?;
            self.data
                .lock()
                .insert(key.clone(), StoredEntry { payload, ttl_secs });
            Ok(())
        })
    }

    fn batch_get<'a>(
        &'a self,
        keys: &'a [CacheKey],
    ) -> BoxFuture<'a, Result<HashMap<CacheKey, Bytes>, DistributedCacheError>> {
        Box::pin(async move {
            self.record(DistributedOp::BatchGet(keys.to_vec()))?;
            let data = self.data.lock();
            Ok(keys
                .iter()
                .filter_map(|key| data.get(key).map(|e| (key.clone(), e.payload.clone())))
                .collect())
        })
    }

    fn batch_set<'a>(
        &'a self,
        entries: Vec<(CacheKey, Bytes)>,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<usize, DistributedCacheError>> {
        Box::pin(async move {
            self.record(DistributedOp::BatchSet {
                keys: entries.iter().map(|(key, _)| key.clone()).collect(),
                ttl_secs,
            })?;
            let count = entries.len();
            let mut data = self.data.lock();
            for (key, payload) in entries {
                data.insert(key, StoredEntry { payload, ttl_secs });
            }
            Ok(count)
        })
    }

    fn delete_matching<'a>(
        &'a self,
        filter: &'a KeyFilter,
    ) -> BoxFuture<'a, Result<usize, DistributedCacheError>> {
        Box::pin(async move {
            self.record(DistributedOp::DeleteMatching(filter.clone()))?;
            let mut data = self.data.lock();
            let before = data.len();
            data.retain(|key, _| !key.matches(filter));
            Ok(before - data.len())
        })
    }

    fn diagnostics(&self) -> BoxFuture<'_, Result<DistributedDiagnostics, DistributedCacheError>> {
        Box::pin(async move {
            self.record(DistributedOp::Diagnostics)?;
            let used: usize = self.data.lock().values().map(|e| e.payload.len()).sum();
            Ok(DistributedDiagnostics {
                used_memory_human: format!("{}B", used),
                connected_clients: 1,
                ..DistributedDiagnostics::default()
            })
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), DistributedCacheError>> {
        Box::pin(async move { self.record(DistributedOp::Ping) })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
