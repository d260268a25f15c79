//! Runtime configuration read from the environment

use std::path::PathBuf;

use crate::error::{RecalcError, RecalcResult};
use crate::models::AnalysisOptions;

pub const DEFAULT_ANALYSIS_URL: &str = "http://127.0.0.1:8084";
pub const DEFAULT_ENDPOINT: &str = "/api/v1/recalculate";

#[derive(Debug, Clone)]
pub struct RecalcConfig {
    /// Base URL of the analysis service
    pub analysis_url: String,
    /// Path of the recalculation call on the analysis service
    pub endpoint: String,
    /// Analysis session the edits belong to
    pub session_id: String,
    /// Optional JSON file with the initial baseline snapshot
    pub baseline_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub options: AnalysisOptions,
}

impl RecalcConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            analysis_url: DEFAULT_ANALYSIS_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            session_id: session_id.into(),
            baseline_path: None,
            host: "0.0.0.0".to_string(),
            port: 8085,
            options: AnalysisOptions::default(),
        }
    }

    pub fn from_env() -> RecalcResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RecalcResult<Self> {
        let session_id = lookup("ANALYSIS_SESSION_ID").unwrap_or_default();
        if session_id.trim().is_empty() {
            return Err(RecalcError::InvalidInput(
                "ANALYSIS_SESSION_ID must be set".to_string(),
            ));
        }

        let mut config = Self::new(session_id.trim());
        if let Some(url) = lookup("ANALYSIS_URL") {
            config.analysis_url = url;
        }
        if let Some(endpoint) = lookup("ANALYSIS_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config.baseline_path = lookup("BASELINE_PATH").map(PathBuf::from);
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .map_err(|_| RecalcError::InvalidInput(format!("Invalid PORT '{}'", port)))?;
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
