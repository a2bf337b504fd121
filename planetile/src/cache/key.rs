//! Cache key encoding shared by both tiers.
//!
//! # Key Format
//!
//! Keys follow the format `tile:{dataset}:{z}:{x}:{y}` for debuggability,
//! e.g. `tile:global:5:31:12`. Dataset identifiers never contain `:` or glob
//! metacharacters (see [`DatasetId`]), so the same prefixes work for the
//! in-process prefix scan and for Redis `SCAN ... MATCH` patterns.

use std::fmt;

use crate::coord::{DatasetId, TileCoord, TileIndex};

/// Namespace prefix of every tile key.
pub const KEY_NAMESPACE: &str = "tile:";

/// Deterministic, injective cache key for a tile coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a full coordinate.
    pub fn for_tile(coord: &TileCoord) -> Self {
        Self::for_index(&coord.dataset, coord.index())
    }

    /// Key for a grid position within `dataset`.
    pub fn for_index(dataset: &DatasetId, index: TileIndex) -> Self {
        Self(format!(
            "{}{}:{}:{}:{}",
            KEY_NAMESPACE, dataset, index.z, index.x, index.y
        ))
    }

    /// The encoded key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the zoom level back out of the key.
    ///
    /// Returns `None` for strings that are not tile keys.
    pub fn zoom(&self) -> Option<u8> {
        let mut fields = self.0.rsplitn(4, ':');
        let _y = fields.next()?;
        let _x = fields.next()?;
        fields.next()?.parse().ok()
    }

    /// Whether this key belongs to the entries selected by a clear filter.
    pub fn matches(&self, filter: &KeyFilter) -> bool {
        match filter {
            KeyFilter::All => self.0.starts_with(KEY_NAMESPACE),
            KeyFilter::Dataset(dataset) => self.0.starts_with(&dataset_prefix(dataset)),
            KeyFilter::DatasetZoom(dataset, z) => self.0.starts_with(&zoom_prefix(dataset, *z)),
            KeyFilter::Zoom(z) => self.0.starts_with(KEY_NAMESPACE) && self.zoom() == Some(*z),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Selection of cache entries for an administrative clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    /// Every tile in every dataset.
    All,
    /// Every tile of one dataset.
    Dataset(DatasetId),
    /// One zoom level of one dataset.
    DatasetZoom(DatasetId, u8),
    /// One zoom level across all datasets.
    Zoom(u8),
}

impl KeyFilter {
    /// Build a filter from the optional `clear` arguments.
    pub fn from_parts(dataset: Option<DatasetId>, zoom: Option<u8>) -> Self {
        match (dataset, zoom) {
            (Some(dataset), Some(z)) => KeyFilter::DatasetZoom(dataset, z),
            (Some(dataset), None) => KeyFilter::Dataset(dataset),
            (None, Some(z)) => KeyFilter::Zoom(z),
            (None, None) => KeyFilter::All,
        }
    }

    /// Redis `MATCH` pattern selecting the same keys.
    ///
    /// Tile keys always carry exactly four `:` separators and datasets never
    /// contain one, so `*` cannot swallow a separator without the pattern
    /// failing to match.
    pub fn pattern(&self) -> String {
        match self {
            KeyFilter::All => format!("{}*", KEY_NAMESPACE),
            KeyFilter::Dataset(dataset) => format!("{}*", dataset_prefix(dataset)),
            KeyFilter::DatasetZoom(dataset, z) => format!("{}*", zoom_prefix(dataset, *z)),
            KeyFilter::Zoom(z) => format!("{}*:{}:*:*", KEY_NAMESPACE, z),
        }
    }
}

fn dataset_prefix(dataset: &DatasetId) -> String {
    format!("{}{}:", KEY_NAMESPACE, dataset)
}

fn zoom_prefix(dataset: &DatasetId, z: u8) -> String {
    format!("{}{}:{}:", KEY_NAMESPACE, dataset, z)
}
