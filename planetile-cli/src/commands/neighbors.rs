//! Neighbors command - show the prefetch neighborhood of a tile.

use clap::Args;
use planetile::coord::{neighbors, GridExtent, TileIndex, MAX_ZOOM};
use planetile::prefetch::MAX_RADIUS;

use crate::error::CliError;

/// Arguments of `planetile neighbors`.
#[derive(Debug, Args)]
pub struct NeighborsArgs {
    /// Zoom level
    pub z: u8,
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Neighborhood radius in tiles
    #[arg(long, default_value_t = 1)]
    pub radius: u32,
}

/// Run the neighbors command.
pub fn run(args: NeighborsArgs) -> Result<(), CliError> {
    let tiles = compute(&args)?;
    let extent = GridExtent::for_zoom(args.z);

    println!(
        "Zoom {}: {} columns x {} rows",
        args.z, extent.num_cols, extent.num_rows
    );
    println!(
        "{} neighbor(s) of {}/{}/{} within radius {}:",
        tiles.len(),
        args.z,
        args.x,
        args.y,
        args.radius
    );
    for tile in tiles {
        println!("  {}", tile);
    }
    Ok(())
}

fn compute(args: &NeighborsArgs) -> Result<Vec<TileIndex>, CliError> {
    if args.z > MAX_ZOOM {
        return Err(CliError::InvalidArgument(format!(
            "zoom {} is deeper than the maximum of {}",
            args.z, MAX_ZOOM
        )));
    }
    if args.radius > MAX_RADIUS {
        return Err(CliError::InvalidArgument(format!(
            "radius {} is wider than the maximum of {}",
            args.radius, MAX_RADIUS
        )));
    }
    Ok(neighbors(TileIndex::new(args.z, args.x, args.y), args.radius))
}
