//! Neighbor calculation on the cylindrical tile grid.
//!
//! The equirectangular world wraps horizontally (the antimeridian is not a
//! seam) but not vertically (the poles are edges). Neighbors of a tile are
//! therefore taken modulo the column count, while candidate rows outside the
//! grid are dropped.
//!
//! ```text
//!   z = 2 (8 columns × 4 rows), center (0, 0), radius 1
//!
//!        x=7   x=0   x=1
//!   y=-1  -     -     -      ← off the grid, dropped
//!   y=0  (7,0)  [C]  (1,0)
//!   y=1  (7,1) (0,1) (1,1)
//! ```

use std::collections::HashSet;

use super::types::{GridExtent, TileCoord, TileIndex};

/// Upper bound on up-front allocation; larger neighborhoods grow as they fill.
const MAX_PREALLOCATED: u64 = 1 << 16;

/// Compute the tiles adjacent to `center` within a square of `radius`.
///
/// The center is canonicalized first (column wrapped, row clamped). The result
/// excludes the center itself and every candidate whose row is off the grid.
/// Columns wrap, so on very coarse grids several offsets can land on the same
/// tile; each tile is reported once, in offset order (`dx` outer, `dy` inner).
///
/// Offsets are limited to the grid's own extent, so a radius wider than the
/// planet yields every other tile of the zoom level rather than looping over
/// offsets that can only repeat.
pub fn neighbors(center: TileIndex, radius: u32) -> Vec<TileIndex> {
    let extent = GridExtent::for_zoom(center.z);
    let center = extent.canonicalize(center);

    // Past these reaches every further offset repeats a column or leaves the grid.
    let col_reach = (radius as u64).min(extent.num_cols) as i64;
    let row_reach = (radius as u64).min(extent.num_rows) as i64;

    let cols = ((2 * col_reach + 1) as u64).min(extent.num_cols);
    let rows = ((2 * row_reach + 1) as u64).min(extent.num_rows);
    let capacity = cols.saturating_mul(rows).saturating_sub(1).min(MAX_PREALLOCATED);
    let mut tiles = Vec::with_capacity(capacity as usize);
    let mut seen = HashSet::with_capacity(capacity as usize);

    for dx in -col_reach..=col_reach {
        for dy in -row_reach..=row_reach {
            if dx == 0 && dy == 0 {
                continue;
            }

            let row = center.y as i64 + dy;
            if !extent.contains_row(row) {
                continue;
            }

            let tile = TileIndex::new(center.z, extent.wrap_col(center.x as i64 + dx), row as u32);
            if tile != center && seen.insert(tile) {
                tiles.push(tile);
            }
        }
    }

    tiles
}

impl TileCoord {
    /// Neighbors of this tile within `radius`, in the same dataset.
    ///
    /// See [`neighbors`] for the wrapping rules.
    pub fn neighbors(&self, radius: u32) -> Vec<TileCoord> {
        neighbors(self.index(), radius)
            .into_iter()
            .map(|index| index.with_dataset(self.dataset.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn as_set(tiles: &[TileIndex]) -> HashSet<(u32, u32)> {
        tiles.iter().map(|t| (t.x, t.y)).collect()
    }

    #[test]
    fn test_neighbors_interior_tile_has_eight() {
        let tiles = neighbors(TileIndex::new(3, 5, 3), 1);
        assert_eq!(tiles.len(), 8);
        assert!(!tiles.contains(&TileIndex::new(3, 5, 3)));
    }

    #[test]
    fn test_neighbors_wrap_west_at_top_edge() {
        // z = 2: 8 columns, 4 rows
        let tiles = neighbors(TileIndex::new(2, 0, 0), 1);

        let expected: HashSet<(u32, u32)> =
            [(7, 0), (7, 1), (0, 1), (1, 0), (1, 1)].into_iter().collect();
        assert_eq!(as_set(&tiles), expected);
        assert_eq!(tiles.len(), 5);
        assert!(tiles.iter().all(|t| t.z == 2));
    }

    #[test]
    fn test_neighbors_wrap_to_column_fifteen_on_sixteen_column_grid() {
        // z = 3: 16 columns, 8 rows
        let tiles = neighbors(TileIndex::new(3, 0, 0), 1);

        let expected: HashSet<(u32, u32)> =
            [(15, 0), (0, 1), (1, 0), (1, 1), (15, 1)].into_iter().collect();
        assert_eq!(as_set(&tiles), expected);
    }

    #[test]
    fn test_neighbors_wrap_east_at_bottom_edge() {
        // z = 1: 4 columns, 2 rows
        let tiles = neighbors(TileIndex::new(1, 3, 1), 1);

        let expected: HashSet<(u32, u32)> =
            [(2, 0), (2, 1), (3, 0), (0, 0), (0, 1)].into_iter().collect();
        assert_eq!(as_set(&tiles), expected);
    }

    #[test]
    fn test_neighbors_canonicalizes_center() {
        // x = 9 wraps to 1, y = 20 clamps to 3 at zoom 2
        let wrapped = neighbors(TileIndex::new(2, 9, 20), 1);
        let direct = neighbors(TileIndex::new(2, 1, 3), 1);
        assert_eq!(wrapped, direct);
    }

    #[test]
    fn test_neighbors_zoom_zero_collapses_duplicates() {
        // z = 0: 2 columns, 1 row. Both horizontal offsets hit column 1.
        let tiles = neighbors(TileIndex::new(0, 0, 0), 1);
        assert_eq!(tiles, vec![TileIndex::new(0, 1, 0)]);
    }

    #[test]
    fn test_neighbors_never_contains_center_on_tiny_grid() {
        // radius 2 at z = 0 wraps dx = ±2 back onto the center column
        let tiles = neighbors(TileIndex::new(0, 0, 0), 2);
        assert_eq!(tiles, vec![TileIndex::new(0, 1, 0)]);
    }

    #[test]
    fn test_neighbors_radius_zero_is_empty() {
        assert!(neighbors(TileIndex::new(4, 10, 10), 0).is_empty());
    }

    #[test]
    fn test_tile_coord_neighbors_keep_dataset() {
        let coord = TileCoord::parse("mercury", 2, 0, 0).unwrap();
        let tiles = coord.neighbors(1);
        assert_eq!(tiles.len(), 5);
        assert!(tiles.iter().all(|t| t.dataset.as_str() == "mercury"));
    }

    #[test]
    fn test_neighbors_huge_radius_at_zoom_zero() {
        assert_eq!(
            neighbors(TileIndex::new(0, 0, 0), u32::MAX),
            vec![TileIndex::new(0, 1, 0)]
        );
    }

    #[test]
    fn test_neighbors_huge_radius_covers_whole_grid() {
        // z = 4: 32 columns x 16 rows, everything but the center
        let tiles = neighbors(TileIndex::new(4, 10, 5), u32::MAX);
        assert_eq!(tiles.len(), 32 * 16 - 1);
        assert!(!tiles.contains(&TileIndex::new(4, 10, 5)));

        let unique: HashSet<_> = tiles.iter().collect();
        assert_eq!(unique.len(), tiles.len());
    }

    #[test]
    fn test_neighbors_radius_wider_than_grid_matches_exact_fit() {
        // At z = 1 (4 x 2) radius 2 already reaches every tile.
        let exact = as_set(&neighbors(TileIndex::new(1, 1, 0), 2));
        let wide = as_set(&neighbors(TileIndex::new(1, 1, 0), 1_000));
        assert_eq!(exact.len(), 7);
        assert_eq!(exact, wide);
    }

    proptest! {
        #[test]
        fn prop_neighbors_stay_on_grid(z in 0u8..12, x in 0u32..10_000, y in 0u32..10_000, radius in 0u32..4) {
            let extent = GridExtent::for_zoom(z);
            let center = extent.canonicalize(TileIndex::new(z, x, y));
            let tiles = neighbors(TileIndex::new(z, x, y), radius);

            let side = (2 * radius + 1) as usize;
            prop_assert!(tiles.len() <= side * side - 1);

            for tile in &tiles {
                prop_assert_eq!(tile.z, z);
                prop_assert!((tile.x as u64) < extent.num_cols);
                prop_assert!((tile.y as u64) < extent.num_rows);
                prop_assert!(*tile != center);
                prop_assert!((tile.y as i64 - center.y as i64).abs() <= radius as i64);
            }

            let unique: HashSet<_> = tiles.iter().collect();
            prop_assert_eq!(unique.len(), tiles.len());
        }
    }
}
