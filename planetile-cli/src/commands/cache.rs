//! Cache management CLI commands.

use planetile::config::ConfigFile;
use planetile::coord::{DatasetId, MAX_ZOOM};

use super::common::{print_json, start_logging, start_service};
use crate::error::CliError;

/// Show cache and prefetch statistics.
pub async fn stats(config: &ConfigFile) -> Result<(), CliError> {
    let _logging = start_logging(config)?;
    let service = start_service(config).await?;

    let stats = service.stats().await;
    print_json(&stats.to_json());

    service.shutdown().await;
    Ok(())
}

/// Clear cached tiles, optionally restricted to a dataset and/or zoom level.
pub async fn clear(
    config: &ConfigFile,
    dataset: Option<String>,
    zoom: Option<u8>,
) -> Result<(), CliError> {
    let dataset = parse_dataset(dataset)?;
    if let Some(z) = zoom {
        if z > MAX_ZOOM {
            return Err(CliError::InvalidArgument(format!(
                "zoom {} is deeper than the maximum of {}",
                z, MAX_ZOOM
            )));
        }
    }

    let _logging = start_logging(config)?;
    let service = start_service(config).await?;

    println!("Clearing {}", describe_scope(dataset.as_ref(), zoom));
    let report = service.clear(dataset, zoom).await;

    println!("  Memory tier: {} tile(s) removed", report.memory_removed);
    match report.distributed_removed {
        Some(count) => println!("  Redis tier:  {} tile(s) removed", count),
        None => println!("  Redis tier:  unreachable, nothing removed"),
    }

    service.shutdown().await;
    Ok(())
}

fn parse_dataset(dataset: Option<String>) -> Result<Option<DatasetId>, CliError> {
    dataset
        .map(|name| DatasetId::new(name).map_err(|e| CliError::InvalidArgument(e.to_string())))
        .transpose()
}

fn describe_scope(dataset: Option<&DatasetId>, zoom: Option<u8>) -> String {
    match (dataset, zoom) {
        (Some(dataset), Some(z)) => format!("zoom {} of dataset '{}'", z, dataset),
        (Some(dataset), None) => format!("dataset '{}'", dataset),
        (None, Some(z)) => format!("zoom {} of every dataset", z),
        (None, None) => "all cached tiles".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dataset() {
        assert_eq!(parse_dataset(None).unwrap(), None);
        assert_eq!(
            parse_dataset(Some("moon".to_string())).unwrap(),
            Some(DatasetId::new("moon").unwrap())
        );
        assert!(parse_dataset(Some("mo*n".to_string())).is_err());
    }

    #[test]
    fn test_describe_scope() {
        let moon = DatasetId::new("moon").unwrap();
        assert_eq!(describe_scope(Some(&moon), Some(3)), "zoom 3 of dataset 'moon'");
        assert_eq!(describe_scope(None, Some(3)), "zoom 3 of every dataset");
        assert_eq!(describe_scope(None, None), "all cached tiles");
    }
}
