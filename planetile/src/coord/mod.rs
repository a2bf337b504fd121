//! Tile addressing primitives.
//!
//! Tiles are addressed by dataset, zoom level, column and row on an
//! equirectangular grid that is `2 × 2^z` columns wide and `2^z` rows tall.
//! The grid wraps horizontally and is bounded vertically.

mod neighbors;
mod types;

pub use neighbors::neighbors;
pub use types::{
    CoordError, DatasetId, GridExtent, TileCoord, TileIndex, MAX_DATASET_LEN, MAX_ZOOM,
};
