//! HTTP client abstraction for testability

use std::time::Duration;

use bytes::Bytes;

use super::types::ProviderError;
use crate::cache::BoxFuture;

/// Default origin request timeout in seconds.
pub const DEFAULT_ORIGIN_TIMEOUT_SECS: u64 = 10;

/// Default number of idle connections kept per origin host.
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 10;

const USER_AGENT: &str = concat!("planetile/", env!("CARGO_PKG_VERSION"));

/// Settings for the origin HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginConfig {
    /// Deadline for a whole request, including reading the body.
    pub timeout: Duration,
    /// Idle connections kept alive per host.
    pub max_idle_per_host: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_ORIGIN_TIMEOUT_SECS),
            max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
        }
    }
}

/// Trait for fetching raw bytes from the tile origin.
///
/// This abstraction allows mock clients in tests.
pub trait OriginClient: Send + Sync {
    /// Performs an HTTP GET request, returning the body on a 200 response.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, ProviderError>>;
}

/// Origin client implementation using async reqwest.
#[derive(Clone)]
pub struct ReqwestOriginClient {
    client: reqwest::Client,
}

impl ReqwestOriginClient {
    /// Creates a client with the given settings.
    pub fn new(config: &OriginConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ProviderError::HttpError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    async fn get_inner(&self, url: &str) -> Result<Bytes, ProviderError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(url.to_string())
            } else {
                ProviderError::HttpError(format!("Request failed: {}", e))
            }
        })?;

        // Only a plain 200 carries a tile
        if response.status() != reqwest::StatusCode::OK {
            return Err(ProviderError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(url.to_string())
            } else {
                ProviderError::HttpError(format!("Failed to read response: {}", e))
            }
        })
    }
}

impl OriginClient for ReqwestOriginClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, ProviderError>> {
        Box::pin(self.get_inner(url))
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Mock origin client for testing.
    ///
    /// Answers from a URL map, falling back to `default_response`. Every
    /// requested URL is recorded.
    pub struct MockOriginClient {
        pub responses: Mutex<HashMap<String, Result<Bytes, ProviderError>>>,
        pub default_response: Result<Bytes, ProviderError>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockOriginClient {
        /// Client answering every URL with `body`.
        pub fn serving(body: &'static [u8]) -> Self {
            Self::with_default(Ok(Bytes::from_static(body)))
        }

        /// Client answering every URL with `response`.
        pub fn with_default(response: Result<Bytes, ProviderError>) -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                default_response: response,
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Override the answer for one URL.
        pub fn respond(&self, url: &str, response: Result<Bytes, ProviderError>) {
            self.responses.lock().insert(url.to_string(), response);
        }

        /// URLs requested so far.
        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().clone()
        }
    }

    impl OriginClient for MockOriginClient {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, ProviderError>> {
            self.requests.lock().push(url.to_string());
            let response = self
                .responses
                .lock()
                .get(url)
                .cloned()
                .unwrap_or_else(|| self.default_response.clone());
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockOriginClient::serving(&[1, 2, 3, 4]);

        let result = mock.get("http://example.com/a.jpg").await;
        assert_eq!(result.unwrap(), Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(mock.requested(), vec!["http://example.com/a.jpg"]);
    }

    #[tokio::test]
    async fn test_mock_client_per_url_override() {
        let mock = MockOriginClient::serving(b"ok");
        mock.respond(
            "http://example.com/missing.jpg",
            Err(ProviderError::HttpStatus {
                status: 404,
                url: "http://example.com/missing.jpg".into(),
            }),
        );

        assert!(mock.get("http://example.com/missing.jpg").await.is_err());
        assert!(mock.get("http://example.com/other.jpg").await.is_ok());
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestOriginClient::new(&OriginConfig::default()).is_ok());
    }
}
