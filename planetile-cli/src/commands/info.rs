//! Health and metadata commands.

use planetile::app::{AppConfig, HealthStatus, PlanetMetadata};
use planetile::config::ConfigFile;

use super::common::{print_json, start_logging, start_service};
use crate::error::CliError;

/// Check the distributed tier and print a health report.
pub async fn health(config: &ConfigFile) -> Result<(), CliError> {
    let _logging = start_logging(config)?;
    let service = start_service(config).await?;

    let report = service.health().await;
    print_json(&serde_json::to_value(&report).unwrap_or_default());
    if report.status == HealthStatus::Degraded {
        eprintln!("Tiles are served from memory and origin only.");
    }

    service.shutdown().await;
    Ok(())
}

/// Print the map client bootstrap document.
///
/// Needs no running service.
pub fn metadata(config: &ConfigFile) -> Result<(), CliError> {
    let app_config = AppConfig::from_config_file(config)?;
    let metadata = PlanetMetadata::new(&app_config.datasets, app_config.prefetch.max_zoom);
    print_json(&serde_json::to_value(&metadata).unwrap_or_default());
    Ok(())
}
