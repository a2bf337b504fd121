//! Bounded marker set for prefetch deduplication.
//!
//! A marker records that a prefetch round for a vicinity is in flight or
//! recently finished. Markers are kept in insertion order; when the set grows
//! past its capacity the oldest markers are dropped, so a burst of distinct
//! requests never erases the markers of the rounds that started last.
//!
//! Every marker carries a generation number. A round releases its marker by
//! generation, so a late release can never remove a newer marker that was
//! recorded for the same key after the old one was evicted.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::cache::CacheKey;

/// Identifies one recorded marker.
pub type Generation = u64;

#[derive(Debug, Clone, Copy)]
struct Marker {
    generation: Generation,
    created_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    markers: HashMap<CacheKey, Marker>,
    /// Insertion order; may hold stale entries for released markers.
    order: VecDeque<(CacheKey, Generation)>,
    next_generation: Generation,
}

impl Inner {
    fn is_current(&self, key: &CacheKey, generation: Generation) -> bool {
        self.markers
            .get(key)
            .is_some_and(|marker| marker.generation == generation)
    }

    fn compact(&mut self) {
        let markers = &self.markers;
        self.order.retain(|(key, generation)| {
            markers
                .get(key)
                .is_some_and(|marker| marker.generation == *generation)
        });
    }
}

/// Bounded, insertion-ordered set of prefetch markers.
#[derive(Debug)]
pub struct DedupMarkers {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl DedupMarkers {
    /// Create a marker set holding at most `capacity` markers.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Record a marker for `key` unless one already exists.
    ///
    /// Returns the new marker's generation, or `None` if the key was already
    /// marked. Checking and recording happen under one lock, so of two
    /// concurrent callers exactly one succeeds.
    pub fn try_mark(&self, key: CacheKey) -> Option<Generation> {
        let mut inner = self.inner.lock();
        if inner.markers.contains_key(&key) {
            return None;
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.markers.insert(
            key.clone(),
            Marker {
                generation,
                created_at: Instant::now(),
            },
        );
        inner.order.push_back((key, generation));

        while inner.markers.len() > self.capacity {
            let Some((oldest, oldest_generation)) = inner.order.pop_front() else {
                break;
            };
            if inner.is_current(&oldest, oldest_generation) {
                if let Some(marker) = inner.markers.remove(&oldest) {
                    trace!(
                        key = %oldest,
                        age_ms = marker.created_at.elapsed().as_millis() as u64,
                        "Dedup marker evicted"
                    );
                }
            }
        }

        if inner.order.len() > self.capacity * 2 {
            inner.compact();
        }

        Some(generation)
    }

    /// Whether `key` is currently marked.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().markers.contains_key(key)
    }

    /// Remove the marker for `key` if it is still the one with `generation`.
    ///
    /// Returns whether a marker was removed.
    pub fn release(&self, key: &CacheKey, generation: Generation) -> bool {
        let mut inner = self.inner.lock();
        if inner.is_current(key, generation) {
            inner.markers.remove(key);
            true
        } else {
            false
        }
    }

    /// Number of live markers.
    pub fn len(&self) -> usize {
        self.inner.lock().markers.len()
    }

    /// Whether no markers are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of markers retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
