//! Tile origin: URL resolution plus HTTP fetch.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use super::datasets::DatasetRegistry;
use super::http::OriginClient;
use super::types::{ProviderError, TileFetcher};
use crate::cache::BoxFuture;
use crate::coord::{DatasetId, TileCoord};

/// Fetches tiles from the origin server of their dataset.
#[derive(Clone)]
pub struct Origin {
    registry: Arc<DatasetRegistry>,
    client: Arc<dyn OriginClient>,
}

impl Origin {
    pub fn new(registry: DatasetRegistry, client: Arc<dyn OriginClient>) -> Self {
        Self {
            registry: Arc::new(registry),
            client,
        }
    }

    /// Origin URL of a tile.
    pub fn resolve_url(&self, coord: &TileCoord) -> Result<String, ProviderError> {
        self.registry.resolve(coord)
    }

    /// Whether the dataset has an origin.
    pub fn supports(&self, dataset: &DatasetId) -> bool {
        self.registry.contains(dataset)
    }

    /// The dataset registry.
    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    async fn fetch(&self, coord: &TileCoord) -> Result<Bytes, ProviderError> {
        let url = self.resolve_url(coord)?;
        let result = self.client.get(&url).await;
        match &result {
            Ok(data) => debug!(tile = %coord, bytes = data.len(), "Fetched from origin"),
            Err(e) => debug!(tile = %coord, url = %url, error = %e, "Origin fetch failed"),
        }
        result
    }
}

impl TileFetcher for Origin {
    fn fetch_tile<'a>(&'a self, coord: &'a TileCoord) -> BoxFuture<'a, Result<Bytes, ProviderError>> {
        Box::pin(self.fetch(coord))
    }
}
