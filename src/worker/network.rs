//! Network seam used by the asset cache controller

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use super::fetch::{Request, Response, ResponseType};

#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkFetchError {
    /// No connectivity (connection refused, DNS failure, timeout)
    #[error("Network unavailable: {0}")]
    Offline(String),

    /// Any other transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for NetworkFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            NetworkFetchError::Offline(err.to_string())
        } else {
            NetworkFetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait Network: Send + Sync + 'static {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkFetchError>;
}

/// Fetches app-shell resources from the origin over HTTP
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: Url,
}

impl HttpNetwork {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, NetworkFetchError> {
        let origin = Url::parse(origin).map_err(|e| NetworkFetchError::InvalidUrl(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkFetchError::Transport(e.to_string()))?;
        Ok(Self { client, origin })
    }

    pub fn resolve(&self, url: &str) -> Result<Url, NetworkFetchError> {
        self.origin
            .join(url)
            .map_err(|e| NetworkFetchError::InvalidUrl(e.to_string()))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkFetchError> {
        let target = self.resolve(&request.url)?;
        let same_origin = target.origin() == self.origin.origin();

        let response = self
            .client
            .request(request.method.clone(), target)
            .send()
            .await?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(Response {
            status,
            response_type: if same_origin {
                ResponseType::Basic
            } else {
                ResponseType::Cors
            },
            headers,
            body,
        })
    }
}
