//! Common helpers shared across CLI commands.

use std::path::{Path, PathBuf};

use planetile::app::{AppConfig, TileService};
use planetile::config::{config_file_path, ConfigFile};
use planetile::logging::{init_logging, LoggingGuard};
use tracing::debug;

use crate::error::CliError;

/// Config file path: `--config` if given, the default location otherwise.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = resolve_config_path(cli_path);
    let config = ConfigFile::load_from(&path)?;
    debug!(path = %path.display(), exists = path.exists(), "Configuration loaded");
    Ok(config)
}

/// Set up logging as configured in `[logging]`.
pub fn start_logging(config: &ConfigFile) -> Result<LoggingGuard, CliError> {
    init_logging(
        &config.logging.directory,
        &config.logging.file,
        &config.logging.level,
    )
    .map_err(|e| {
        CliError::LoggingInit(format!(
            "{}: {}",
            config.logging.directory.join(&config.logging.file).display(),
            e
        ))
    })
}

/// Start a tile service from the config file.
pub async fn start_service(config: &ConfigFile) -> Result<TileService, CliError> {
    let app_config = AppConfig::from_config_file(config)?;
    Ok(TileService::start(app_config).await?)
}

/// Print a JSON document for humans.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}
