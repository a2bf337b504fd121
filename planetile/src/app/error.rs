//! Application error types.

use std::fmt;

use thiserror::Error;

use crate::cache::DistributedCacheError;
use crate::coord::CoordError;
use crate::provider::ProviderError;

/// Errors that can occur while starting the service.
#[derive(Debug)]
pub enum AppError {
    /// The distributed tier could not be set up.
    DistributedTier(DistributedCacheError),

    /// The origin HTTP client could not be created.
    OriginClient(ProviderError),

    /// Configuration error.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DistributedTier(e) => {
                write!(f, "Failed to set up distributed cache: {}", e)
            }
            AppError::OriginClient(e) => {
                write!(f, "Failed to create origin client: {}", e)
            }
            AppError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::DistributedTier(e) => Some(e),
            AppError::OriginClient(e) => Some(e),
            AppError::Config(_) => None,
        }
    }
}

impl From<DistributedCacheError> for AppError {
    fn from(e: DistributedCacheError) -> Self {
        AppError::DistributedTier(e)
    }
}

/// Errors returned to a foreground tile request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServeError {
    /// The coordinate itself is invalid.
    #[error("Invalid tile coordinate: {0}")]
    InvalidCoordinate(#[from] CoordError),

    /// The dataset has no usable origin.
    #[error("Dataset '{dataset}' is not supported: {reason}")]
    UnsupportedDataset { dataset: String, reason: String },

    /// The origin could not deliver the tile.
    #[error("Could not fetch tile {tile}: {reason}")]
    TileUnavailable { tile: String, reason: String },
}

impl ServeError {
    /// HTTP status a front-end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ServeError::InvalidCoordinate(_) | ServeError::UnsupportedDataset { .. } => 400,
            ServeError::TileUnavailable { .. } => 404,
        }
    }
}
