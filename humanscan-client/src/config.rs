//! Configuration for humanscan-client

use crate::error::{DetectError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Endpoint of the detection service when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/v1/predict";

pub const DEFAULT_THRESHOLD: f64 = 0.5;

const DEFAULT_MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// How numeric threshold input outside [0, 1] is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdPolicy {
    /// Accept any finite number, warn when it leaves [0, 1]
    Permissive,
    /// Reject numbers outside [0, 1] the same way non-numeric input is rejected
    Strict,
}

impl ThresholdPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdPolicy::Permissive => "permissive",
            ThresholdPolicy::Strict => "strict",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Some(ThresholdPolicy::Permissive),
            "strict" => Some(ThresholdPolicy::Strict),
            _ => None,
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::Permissive
    }
}

/// Detection client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Detection service endpoint (POST, JSON body)
    pub endpoint: String,
    /// Threshold the editor starts with
    pub default_threshold: f64,
    /// Range handling for threshold edits
    pub threshold_policy: ThresholdPolicy,
    /// Per-request timeout; `None` waits for the service indefinitely
    pub request_timeout_secs: Option<u64>,
    /// Largest image file intake will read
    pub max_image_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            default_threshold: DEFAULT_THRESHOLD,
            threshold_policy: ThresholdPolicy::default(),
            request_timeout_secs: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON or TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DetectError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration text, JSON first, then TOML
    pub fn from_str(content: &str) -> Result<Self> {
        if let Ok(config) = serde_json::from_str::<ClientConfig>(content) {
            return Ok(config);
        }

        toml::from_str::<ClientConfig>(content)
            .map_err(|e| DetectError::Config(format!("Unknown config format: {}", e)))
    }

    /// Defaults overridden by `HUMANSCAN_*` environment variables
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Apply `HUMANSCAN_*` environment overrides; unparseable values are ignored
    pub fn merge_env(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("HUMANSCAN_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint.trim().to_string();
            }
        }

        if let Ok(threshold) = std::env::var("HUMANSCAN_THRESHOLD") {
            if let Ok(t) = threshold.trim().parse::<f64>() {
                self.default_threshold = t;
            }
        }

        if let Ok(timeout) = std::env::var("HUMANSCAN_TIMEOUT_SECS") {
            if let Ok(t) = timeout.trim().parse::<u64>() {
                self.request_timeout_secs = Some(t);
            }
        }

        if let Ok(policy) = std::env::var("HUMANSCAN_THRESHOLD_POLICY") {
            if let Some(p) = ThresholdPolicy::from_str(&policy) {
                self.threshold_policy = p;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err("Endpoint must not be empty".to_string());
        }

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(format!("Endpoint must be an http(s) URL: {}", endpoint));
        }

        if !self.default_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.default_threshold)
        {
            return Err("Default threshold must be between 0.0 and 1.0".to_string());
        }

        if self.request_timeout_secs == Some(0) {
            return Err("Request timeout must be at least 1 second".to_string());
        }

        if self.max_image_bytes == 0 {
            return Err("Max image size must be non-zero".to_string());
        }

        Ok(())
    }
}
