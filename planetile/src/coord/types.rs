//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Deepest zoom level a coordinate may address.
///
/// At zoom 30 the grid is 2^31 columns wide, which is the largest extent
/// whose column indices still fit in a `u32`.
pub const MAX_ZOOM: u8 = 30;

/// Maximum length of a dataset identifier.
pub const MAX_DATASET_LEN: usize = 64;

/// Errors that can occur when building coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// Dataset identifier is empty, too long, or contains characters outside
    /// `[A-Za-z0-9_-]`.
    #[error("Invalid dataset identifier '{0}' (expected 1-64 characters of [A-Za-z0-9_-])")]
    InvalidDataset(String),

    /// Zoom level is deeper than [`MAX_ZOOM`].
    #[error("Invalid zoom level: {0} (must be between 0 and {max})", max = MAX_ZOOM)]
    InvalidZoom(u8),
}

/// Validated name of an imagery dataset (e.g. `global`, `moon`).
///
/// The character set is restricted so that the dataset can be embedded in a
/// cache key without escaping: it never contains the `:` separator nor any
/// Redis glob metacharacter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    /// Validate and wrap a dataset name.
    pub fn new(name: impl Into<String>) -> Result<Self, CoordError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= MAX_DATASET_LEN
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        if valid {
            Ok(Self(name))
        } else {
            Err(CoordError::InvalidDataset(name))
        }
    }

    /// The dataset name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DatasetId {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DatasetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Position of a tile within the grid of a single dataset.
///
/// This is the dataset-less half of a [`TileCoord`]; batch operations that
/// work on one dataset at a time key their maps by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileIndex {
    /// Zoom level
    pub z: u8,
    /// Column, 0 at the western edge
    pub x: u32,
    /// Row, 0 at the northern edge
    pub y: u32,
}

impl TileIndex {
    /// Create a tile index.
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Attach a dataset, producing a full coordinate.
    pub fn with_dataset(self, dataset: DatasetId) -> TileCoord {
        TileCoord {
            dataset,
            z: self.z,
            x: self.x,
            y: self.y,
        }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Full tile address: dataset, zoom level, column and row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileCoord {
    /// Imagery source; selects the origin URL template
    pub dataset: DatasetId,
    /// Zoom level (0 to [`MAX_ZOOM`])
    pub z: u8,
    /// Column, 0 at the western edge
    pub x: u32,
    /// Row, 0 at the northern edge
    pub y: u32,
}

impl TileCoord {
    /// Create a coordinate, rejecting zoom levels deeper than [`MAX_ZOOM`].
    ///
    /// `x` and `y` are accepted as given; use [`TileCoord::canonical`] to wrap
    /// and clamp them onto the grid.
    pub fn new(dataset: DatasetId, z: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        if z > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(z));
        }
        Ok(Self { dataset, z, x, y })
    }

    /// Parse the dataset name and build the coordinate in one step.
    pub fn parse(dataset: &str, z: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        Self::new(DatasetId::new(dataset)?, z, x, y)
    }

    /// The dataset-less grid position.
    pub fn index(&self) -> TileIndex {
        TileIndex::new(self.z, self.x, self.y)
    }

    /// Grid extent at this coordinate's zoom level.
    pub fn extent(&self) -> GridExtent {
        GridExtent::for_zoom(self.z)
    }

    /// The same tile with `x` wrapped and `y` clamped onto the grid.
    pub fn canonical(&self) -> Self {
        let index = self.extent().canonicalize(self.index());
        index.with_dataset(self.dataset.clone())
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.dataset, self.z, self.x, self.y)
    }
}

/// Size of the equirectangular tile grid at one zoom level.
///
/// The world is twice as wide as it is tall: `2 × 2^z` columns by `2^z` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridExtent {
    /// Number of columns (horizontal extent)
    pub num_cols: u64,
    /// Number of rows (vertical extent)
    pub num_rows: u64,
}

impl GridExtent {
    /// Grid extent at zoom level `z`.
    pub fn for_zoom(z: u8) -> Self {
        let num_rows = 1u64 << z.min(MAX_ZOOM);
        Self {
            num_cols: 2 * num_rows,
            num_rows,
        }
    }

    /// Wrap a signed column onto the cylinder.
    #[inline]
    pub fn wrap_col(&self, col: i64) -> u32 {
        col.rem_euclid(self.num_cols as i64) as u32
    }

    /// Whether a signed row lies on the grid (rows never wrap).
    #[inline]
    pub fn contains_row(&self, row: i64) -> bool {
        row >= 0 && (row as u64) < self.num_rows
    }

    /// Wrap `x` modulo the column count and clamp `y` into the row range.
    pub fn canonicalize(&self, index: TileIndex) -> TileIndex {
        let x = self.wrap_col(index.x as i64);
        let y = (index.y as u64).min(self.num_rows - 1) as u32;
        TileIndex::new(index.z, x, y)
    }
}
