//! Init command - initialize configuration file.

use std::path::Path;

use planetile::config::ConfigFile;

use crate::error::CliError;

/// Run the init command.
///
/// Writes the default configuration to `path`. An existing file is kept
/// unless `force` is set.
pub fn run(path: &Path, force: bool) -> Result<(), CliError> {
    let written = if force {
        ConfigFile::default().save_to(path)?;
        true
    } else {
        ConfigFile::ensure_exists(path)?
    };

    if written {
        println!("Configuration file written: {}", path.display());
    } else {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }
    println!();
    println!("Edit this file to point at your Redis server or add datasets.");
    Ok(())
}
