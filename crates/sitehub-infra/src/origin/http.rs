//! reqwest-backed origin client.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;

use sitehub_core::ports::{FetchError, OriginClient, OriginResponse};

/// Origin client configuration.
#[derive(Debug, Clone)]
pub struct OriginClientConfig {
    /// Bound on the whole exchange, body included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for OriginClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("sitehub/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl OriginClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: std::env::var("CDN_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_timeout: std::env::var("CDN_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            user_agent: defaults.user_agent,
        }
    }
}

/// HTTP origin client. Automatic redirects are disabled so the cache can
/// keep the originally requested key across hops.
pub struct HttpOriginClient {
    client: reqwest::Client,
}

impl HttpOriginClient {
    pub fn new(config: &OriginClientConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client })
    }
}

fn map_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.to_string())
    }
}

#[async_trait]
impl OriginClient for HttpOriginClient {
    async fn get(&self, url: &str) -> Result<OriginResponse, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_error)?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(OriginResponse {
            status,
            location,
            body: response.bytes_stream().map(|chunk| chunk.map_err(map_error)).boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_origin_is_transport_error() {
        let config = OriginClientConfig {
            connect_timeout: Duration::from_millis(200),
            timeout: Duration::from_millis(500),
            ..OriginClientConfig::default()
        };
        let client = HttpOriginClient::new(&config).unwrap();

        // Port 9 (discard) on loopback is closed in test environments.
        let err = client.get("http://127.0.0.1:9/asset.js").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout));
    }
}
