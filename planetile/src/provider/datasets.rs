//! Dataset registry and origin URL resolution.
//!
//! Each dataset maps to a URL template on the origin tile server. Templates
//! use `{z}`, `{x}` and `{y}` placeholders; the NASA Trek servers order the
//! path as `{z}/{y}/{x}`.

use std::collections::BTreeMap;

use super::types::ProviderError;
use crate::coord::{DatasetId, TileCoord};

/// Mars Viking MDIM 2.1 colour mosaic.
pub const MARS_GLOBAL_TEMPLATE: &str = "https://trek.nasa.gov/tiles/Mars/EQ/Mars_Viking_MDIM21_ClrMosaic_global_232m/1.0.0/default/default028mm/{z}/{y}/{x}.jpg";

/// Lunar Reconnaissance Orbiter WAC global mosaic.
pub const MOON_TEMPLATE: &str = "https://trek.nasa.gov/tiles/Moon/EQ/LRO_WAC_Mosaic_Global_303ppd_v02/1.0.0//default/default028mm/{z}/{y}/{x}.jpg";

/// MESSENGER MDIS basemap of Mercury.
pub const MERCURY_TEMPLATE: &str = "https://trek.nasa.gov/tiles/Mercury/EQ/Mercury_MESSENGER_MDIS_Basemap_BDR_Mosaic_Global_166m/1.0.0//default/default028mm/{z}/{y}/{x}.jpg";

/// Built-in datasets as `(name, template)` pairs.
pub const BUILTIN_DATASETS: [(&str, &str); 3] = [
    ("global", MARS_GLOBAL_TEMPLATE),
    ("moon", MOON_TEMPLATE),
    ("mercury", MERCURY_TEMPLATE),
];

const PLACEHOLDERS: [&str; 3] = ["{z}", "{x}", "{y}"];

/// Validated origin URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Validate a template for `dataset`.
    pub fn parse(dataset: &DatasetId, template: &str) -> Result<Self, ProviderError> {
        let invalid = |reason: String| ProviderError::InvalidTemplate {
            dataset: dataset.to_string(),
            reason,
        };

        if !(template.starts_with("http://") || template.starts_with("https://")) {
            return Err(invalid("must start with http:// or https://".to_string()));
        }
        for placeholder in PLACEHOLDERS {
            if !template.contains(placeholder) {
                return Err(invalid(format!("missing {} placeholder", placeholder)));
            }
        }

        Ok(Self(template.to_string()))
    }

    /// Substitute the coordinate into the template.
    pub fn render(&self, z: u8, x: u32, y: u32) -> String {
        self.0
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Known datasets and their origin templates.
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    templates: BTreeMap<DatasetId, UrlTemplate>,
}

impl DatasetRegistry {
    /// Registry without any dataset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the built-in NASA Trek datasets.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, template) in BUILTIN_DATASETS {
            if let Ok(dataset) = DatasetId::new(name) {
                if let Ok(template) = UrlTemplate::parse(&dataset, template) {
                    registry.templates.insert(dataset, template);
                }
            }
        }
        registry
    }

    /// Add a dataset or replace its template.
    pub fn insert(&mut self, dataset: DatasetId, template: &str) -> Result<(), ProviderError> {
        let template = UrlTemplate::parse(&dataset, template)?;
        self.templates.insert(dataset, template);
        Ok(())
    }

    /// Whether the dataset is known.
    pub fn contains(&self, dataset: &DatasetId) -> bool {
        self.templates.contains_key(dataset)
    }

    /// Known dataset names in sorted order.
    pub fn names(&self) -> Vec<DatasetId> {
        self.templates.keys().cloned().collect()
    }

    /// Template of a dataset.
    pub fn template(&self, dataset: &DatasetId) -> Option<&UrlTemplate> {
        self.templates.get(dataset)
    }

    /// Origin URL of a tile.
    ///
    /// Fails with [`ProviderError::UnsupportedDataset`] for unknown datasets.
    pub fn resolve(&self, coord: &TileCoord) -> Result<String, ProviderError> {
        self.templates
            .get(&coord.dataset)
            .map(|template| template.render(coord.z, coord.x, coord.y))
            .ok_or_else(|| ProviderError::UnsupportedDataset(coord.dataset.to_string()))
    }
}
