//! Tile command - serve one tile through the cache.

use std::path::PathBuf;

use clap::Args;
use planetile::config::ConfigFile;

use super::common::{start_logging, start_service};
use crate::error::CliError;

/// Arguments of `planetile tile`.
#[derive(Debug, Args)]
pub struct TileArgs {
    /// Dataset name (e.g. global, moon, mercury)
    pub dataset: String,
    /// Zoom level
    pub z: u8,
    /// Column, 0 at the western edge
    pub x: u32,
    /// Row, 0 at the northern edge
    pub y: u32,
    /// Write the tile to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Wait for write-back and neighbor prefetch before exiting
    #[arg(long)]
    pub drain: bool,
}

/// Run the tile command.
pub async fn run(args: TileArgs, config: &ConfigFile) -> Result<(), CliError> {
    let _logging = start_logging(config)?;
    let service = start_service(config).await?;

    let result = service.serve(&args.dataset, args.z, args.x, args.y).await;
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            service.shutdown().await;
            return Err(e.into());
        }
    };

    println!(
        "Tile {}/{}/{}/{}: {} bytes (X-Cache: {})",
        args.dataset,
        args.z,
        args.x,
        args.y,
        response.data.len(),
        response.cache_status
    );

    if let Some(path) = &args.output {
        std::fs::write(path, &response.data).map_err(|error| CliError::FileWrite {
            path: path.display().to_string(),
            error,
        })?;
        println!("Saved to {}", path.display());
    }

    if args.drain {
        println!("Waiting for background work...");
        service.drain().await;
        let stats = service.stats().await;
        println!(
            "Prefetched {} neighbor(s), {} already cached, {} unavailable",
            stats.prefetch.tiles_fetched,
            stats.prefetch.tiles_already_cached,
            stats.prefetch.fetch_failures
        );
    }

    service.shutdown().await;
    Ok(())
}
