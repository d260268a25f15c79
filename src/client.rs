//! Client for the structural analysis service

use async_trait::async_trait;

use crate::config::RecalcConfig;
use crate::models::{HealthResponse, RecalcRequest, RecalcResponse};

/// Transport-level failures reaching the analysis service
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    ApiError { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// The recalculation RPC, injected into the coordinator
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Submit one batch. `Ok` means the service answered; the body may still
    /// report `success: false`.
    async fn recalculate(&self, request: &RecalcRequest) -> Result<RecalcResponse, ClientError>;

    async fn health(&self) -> Result<HealthResponse, ClientError>;
}

/// HTTP client for the analysis service
pub struct HttpAnalysisClient {
    base_url: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpAnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: "/api/v1/recalculate".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &RecalcConfig) -> Self {
        Self::new(config.analysis_url.clone()).with_endpoint(config.endpoint.clone())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn recalculate(&self, request: &RecalcRequest) -> Result<RecalcResponse, ClientError> {
        let url = self.url(&self.endpoint);

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.url("/health");
        let response = self.client.get(&url).send().await?.json().await?;
        Ok(response)
    }
}
