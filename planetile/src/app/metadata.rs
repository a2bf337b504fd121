//! Documents describing the service: planet metadata, health and statistics.

use serde::Serialize;

use crate::cache::CacheStatistics;
use crate::coord::DatasetId;
use crate::prefetch::PrefetchStats;
use crate::provider::DatasetRegistry;

/// Tile route exposed to map clients.
pub const TILE_URL_TEMPLATE: &str = "/api/tiles/{dataset}/{z}/{x}/{y}.jpg";

/// Zoom level of the initial map view.
pub const INITIAL_ZOOM: u8 = 2;

/// Map client bootstrap document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanetMetadata {
    pub planet: String,
    pub initial_view: InitialView,
    pub tile_url_template: String,
    pub available_datasets: Vec<DatasetId>,
    pub zoom_range: ZoomRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitialView {
    /// `[longitude, latitude]` in degrees
    pub center: [f64; 2],
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl PlanetMetadata {
    /// Metadata listing every dataset of `registry`, zoomable down to `max_zoom`.
    pub fn new(registry: &DatasetRegistry, max_zoom: u8) -> Self {
        Self {
            planet: "mars".to_string(),
            initial_view: InitialView {
                center: [0.0, 0.0],
                zoom: INITIAL_ZOOM,
            },
            tile_url_template: TILE_URL_TEMPLATE.to_string(),
            available_datasets: registry.names(),
            zoom_range: ZoomRange {
                min: 0,
                max: max_zoom,
            },
        }
    }
}

/// Overall service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every tier answers.
    Healthy,
    /// Tiles are served, but the distributed tier is unreachable.
    Degraded,
}

/// Result of a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// RFC 3339 time of the check
    pub timestamp: String,
    pub distributed_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributed_error: Option<String>,
}

impl HealthReport {
    /// Report for the outcome of a distributed tier ping, stamped now.
    pub fn from_ping<E: std::fmt::Display>(ping: Result<(), E>) -> Self {
        let timestamp = chrono::Utc::now().to_rfc3339();
        match ping {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                timestamp,
                distributed_reachable: true,
                distributed_error: None,
            },
            Err(e) => Self {
                status: HealthStatus::Degraded,
                timestamp,
                distributed_reachable: false,
                distributed_error: Some(e.to_string()),
            },
        }
    }
}

/// Cache and prefetch statistics together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub cache: CacheStatistics,
    pub prefetch: PrefetchStats,
}

impl ServiceStats {
    /// JSON document including the derived hit rates.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "cache": self.cache.to_json(),
            "prefetch": serde_json::to_value(&self.prefetch).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_document() {
        let metadata = PlanetMetadata::new(&DatasetRegistry::builtin(), 7);
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["planet"], "mars");
        assert_eq!(json["initial_view"]["zoom"], 2);
        assert_eq!(json["initial_view"]["center"], serde_json::json!([0.0, 0.0]));
        assert_eq!(json["tile_url_template"], "/api/tiles/{dataset}/{z}/{x}/{y}.jpg");
        assert_eq!(
            json["available_datasets"],
            serde_json::json!(["global", "mercury", "moon"])
        );
        assert_eq!(json["zoom_range"], serde_json::json!({"min": 0, "max": 7}));
    }

    #[test]
    fn test_health_report_from_ping() {
        let healthy = HealthReport::from_ping::<String>(Ok(()));
        assert_eq!(healthy.status, HealthStatus::Healthy);
        assert!(healthy.distributed_reachable);
        assert!(chrono::DateTime::parse_from_rfc3339(&healthy.timestamp).is_ok());

        let degraded = HealthReport::from_ping(Err("connection refused"));
        assert_eq!(degraded.status, HealthStatus::Degraded);
        assert_eq!(degraded.distributed_error.as_deref(), Some("connection refused"));

        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json["status"], "degraded");
    }
}
