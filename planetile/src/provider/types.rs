//! Provider types and traits

use bytes::Bytes;
use thiserror::Error;

use crate::cache::BoxFuture;
use crate::coord::TileCoord;

/// Errors that can occur while resolving or fetching a tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The dataset has no origin URL template.
    #[error("Unsupported dataset: {0}")]
    UnsupportedDataset(String),

    /// A URL template is missing one of its placeholders.
    #[error("Invalid URL template for dataset '{dataset}': {reason}")]
    InvalidTemplate { dataset: String, reason: String },

    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The origin answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The request did not complete within its deadline.
    #[error("Request to {0} timed out")]
    Timeout(String),
}

impl ProviderError {
    /// Whether the error stems from configuration rather than the origin.
    ///
    /// Configuration errors are fatal to the triggering request; all other
    /// errors mean the tile is unavailable right now.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProviderError::UnsupportedDataset(_) | ProviderError::InvalidTemplate { .. }
        )
    }
}

/// Capability to fetch one tile from its origin.
///
/// Injected into the prefetcher so that rounds can be tested without a
/// network.
pub trait TileFetcher: Send + Sync {
    /// Fetch the tile's bytes.
    fn fetch_tile<'a>(&'a self, coord: &'a TileCoord) -> BoxFuture<'a, Result<Bytes, ProviderError>>;
}
