//! Tile origin abstraction
//!
//! This module resolves dataset coordinates to origin URLs and downloads
//! tile bytes over HTTP. [`Origin`] combines both and implements
//! [`TileFetcher`], the capability injected into the prefetcher.
//!
//! ```ignore
//! use planetile::provider::{DatasetRegistry, Origin, OriginConfig, ReqwestOriginClient};
//!
//! let client = ReqwestOriginClient::new(&OriginConfig::default())?;
//! let origin = Origin::new(DatasetRegistry::builtin(), Arc::new(client));
//! let bytes = origin.fetch_tile(&coord).await?;
//! ```

mod datasets;
mod http;
mod origin;
mod types;

pub use datasets::{
    DatasetRegistry, UrlTemplate, BUILTIN_DATASETS, MARS_GLOBAL_TEMPLATE, MERCURY_TEMPLATE,
    MOON_TEMPLATE,
};
pub use http::{
    OriginClient, OriginConfig, ReqwestOriginClient, DEFAULT_MAX_IDLE_PER_HOST,
    DEFAULT_ORIGIN_TIMEOUT_SECS,
};
pub use origin::Origin;
pub use types::{ProviderError, TileFetcher};

#[cfg(any(test, feature = "test-util"))]
pub use http::tests::MockOriginClient;
