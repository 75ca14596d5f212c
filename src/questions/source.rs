//! Remote question source
//!
//! The canonical question list lives behind a single bulk read. The core only
//! depends on [`QuestionSource`]; transport, auth and pagination belong to the
//! implementation.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::bundled::FallbackDataset;
use super::types::{validate_all, QuestionRecord};
use crate::config::RemoteConfig;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Remote source is not configured
    #[error("Remote source not configured: {0}")]
    NotConfigured(String),

    /// Transport failure (DNS, connection refused, timeout)
    #[error("Request failed: {0}")]
    Request(String),

    /// Non-success HTTP status
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// Body was not a question list
    #[error("Decode error: {0}")]
    Decode(String),

    /// Records violate the data model constraints
    #[error("Invalid question data: {0}")]
    Invalid(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::Status(status.as_u16())
        } else {
            SourceError::Request(err.to_string())
        }
    }
}

/// Bulk read of the canonical question list
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<QuestionRecord>, SourceError>;
}

/// Serves the embedded dataset as if it were remote
pub struct BundledSource {
    dataset: FallbackDataset,
}

impl BundledSource {
    pub fn new(dataset: FallbackDataset) -> Self {
        Self { dataset }
    }
}

impl Default for BundledSource {
    fn default() -> Self {
        Self::new(FallbackDataset::bundled())
    }
}

#[async_trait]
impl QuestionSource for BundledSource {
    async fn fetch_all(&self) -> Result<Vec<QuestionRecord>, SourceError> {
        Ok(self.dataset.to_vec())
    }
}

/// REST table endpoint returning every question row as JSON
pub struct HttpQuestionSource {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpQuestionSource {
    pub fn new(
        base_url: &str,
        table: &str,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, SourceError> {
        let endpoint = Self::endpoint_url(base_url, table)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| SourceError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, SourceError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("remote.url is not set".to_string()))?;
        Self::new(url, &config.table, config.api_key.clone(), config.timeout_ms)
    }

    fn endpoint_url(base_url: &str, table: &str) -> Result<Url, SourceError> {
        let base = Url::parse(base_url).map_err(|e| SourceError::NotConfigured(e.to_string()))?;
        let mut endpoint = base
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| SourceError::NotConfigured(e.to_string()))?;
        endpoint
            .query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "id");
        Ok(endpoint)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn fetch_all(&self) -> Result<Vec<QuestionRecord>, SourceError> {
        debug!("Fetching question list from {}", self.endpoint);

        let mut request = self.client.get(self.endpoint.clone());
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let questions: Vec<QuestionRecord> = response.json().await?;
        validate_all(&questions).map_err(SourceError::Invalid)?;

        debug!("Fetched {} questions from remote source", questions.len());
        Ok(questions)
    }
}
