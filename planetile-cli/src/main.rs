//! Planetile CLI - Command-line interface
//!
//! This binary drives the planetile library: serve tiles through the tiered
//! cache, inspect and clear it, and manage the configuration file.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::common::{load_config, resolve_config_path};
use commands::neighbors::NeighborsArgs;
use commands::tile::TileArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "planetile")]
#[command(version, about = "Tiered tile cache for planetary map tiles", long_about = None)]
struct Cli {
    /// Config file (default: ~/.planetile/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve one tile through the cache, fetching it from origin on a miss
    Tile(TileArgs),

    /// Show the neighbors a tile would prefetch
    Neighbors(NeighborsArgs),

    /// Show cache and prefetch statistics
    Stats,

    /// Remove cached tiles
    Clear {
        /// Only tiles of this dataset
        #[arg(long)]
        dataset: Option<String>,

        /// Only tiles of this zoom level
        #[arg(long)]
        zoom: Option<u8>,
    },

    /// Check whether the Redis tier is reachable
    Health,

    /// Print the map client metadata document
    Metadata,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => commands::init::run(&resolve_config_path(config_path), force),
        Commands::Neighbors(args) => commands::neighbors::run(args),
        Commands::Tile(args) => commands::tile::run(args, &load_config(config_path)?).await,
        Commands::Stats => commands::cache::stats(&load_config(config_path)?).await,
        Commands::Clear { dataset, zoom } => {
            commands::cache::clear(&load_config(config_path)?, dataset, zoom).await
        }
        Commands::Health => commands::info::health(&load_config(config_path)?).await,
        Commands::Metadata => commands::info::metadata(&load_config(config_path)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile_command() {
        let cli = Cli::try_parse_from([
            "planetile", "tile", "moon", "3", "5", "2", "-o", "tile.jpg", "--drain",
        ])
        .unwrap();

        match cli.command {
            Commands::Tile(args) => {
                assert_eq!(args.dataset, "moon");
                assert_eq!((args.z, args.x, args.y), (3, 5, 2));
                assert_eq!(args.output, Some(PathBuf::from("tile.jpg")));
                assert!(args.drain);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from([
            "planetile", "clear", "--zoom", "4", "--config", "/etc/planetile.ini",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/planetile.ini")));
        assert!(matches!(
            cli.command,
            Commands::Clear {
                dataset: None,
                zoom: Some(4)
            }
        ));
    }

    #[test]
    fn test_neighbors_default_radius() {
        let cli = Cli::try_parse_from(["planetile", "neighbors", "2", "0", "0"]).unwrap();
        assert!(matches!(cli.command, Commands::Neighbors(ref args) if args.radius == 1));
    }

    #[test]
    fn test_rejects_negative_coordinates() {
        assert!(Cli::try_parse_from(["planetile", "tile", "global", "2", "-1", "0"]).is_err());
    }
}
