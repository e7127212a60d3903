mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use http::HttpArtifactProducer;

/// Result type for image generation
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Errors that can occur while producing an image
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Generation job failed: {0}")]
    JobFailed(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// Samplers the generation API accepts
pub const SAMPLERS: &[&str] = &[
    "Euler a",
    "LMS",
    "Heun",
    "DPM2",
    "DPM2 a",
    "DPM++ 2S a",
    "DPM++ 2M",
    "DPM++ SDE",
    "DPM fast",
    "DPM adaptive",
    "LMS Karras",
    "DPM2 Karras",
    "DPM2 a Karras",
    "DPM++ 2S a Karras",
    "DPM++ 2M Karras",
    "DPM++ SDE Karras",
    "DDIM",
    "PLMS",
];

/// Most autocomplete suggestions a chat client will show
pub const MAX_MODEL_SUGGESTIONS: usize = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    Square,
    Portrait,
    Landscape,
}

/// Parameters for one image generation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upscale: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Reject requests the API would refuse anyway
    pub fn validate(&self) -> ArtifactResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(ArtifactError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        if let Some(sampler) = &self.sampler {
            if !SAMPLERS.contains(&sampler.as_str()) {
                return Err(ArtifactError::InvalidRequest(format!(
                    "unknown sampler '{}'",
                    sampler
                )));
            }
        }
        Ok(())
    }
}

/// A produced image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub url: String,
    /// Provider job id, for logging
    pub job_id: Option<String>,
}

/// Something that turns generation parameters into an image reference
#[async_trait]
pub trait ArtifactProducer: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> ArtifactResult<Artifact>;

    /// Models that can be passed as `GenerateRequest::model`
    async fn list_models(&self) -> ArtifactResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str;
}

/// Autocomplete: models starting with `prefix`, capped for chat clients
pub fn filter_models(models: Vec<String>, prefix: &str) -> Vec<String> {
    models
        .into_iter()
        .filter(|m| m.starts_with(prefix))
        .take(MAX_MODEL_SUGGESTIONS)
        .collect()
}

/// Configuration for the image generation API
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Overall time allowed for one generation, including polling
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.prodia.com".to_string(),
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl ArtifactConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = std::env::var("PRODIA_API_KEY").ok().and_then(|key| {
            let trimmed = key.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

        let base_url = std::env::var("PRODIA_BASE_URL")
            .ok()
            .and_then(|url| {
                let trimmed = url.trim().trim_end_matches('/');
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or(defaults.base_url);

        Self {
            api_key,
            base_url,
            timeout: std::env::var("PRODIA_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            poll_interval: std::env::var("PRODIA_POLL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
        }
    }

    /// Build the HTTP producer, if an API key is configured
    pub fn build_producer(&self) -> ArtifactResult<HttpArtifactProducer> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            ArtifactError::ConfigError("No image API configured. Set PRODIA_API_KEY".to_string())
        })?;
        HttpArtifactProducer::new(
            self.base_url.clone(),
            api_key,
            self.timeout,
            self.poll_interval,
        )
    }
}
