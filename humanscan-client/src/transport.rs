//! HTTP transport to the remote detection service

use crate::config::ClientConfig;
use crate::error::{DetectError, Result};
use crate::request::{DetectionRequest, DetectionResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const MAX_ERROR_BODY: usize = 500;

#[async_trait]
pub trait DetectionService: Send + Sync {
    /// Where requests are sent
    fn endpoint(&self) -> &str;

    /// Issue one detection call and decode the success body
    async fn detect(&self, request: &DetectionRequest) -> Result<DetectionResponse>;
}

/// Detection service reached over HTTP with a JSON body
pub struct HttpDetectionService {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl HttpDetectionService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate().map_err(DetectError::Config)?;
        let mut service = Self::new(config.endpoint.trim());
        service.timeout = config.request_timeout_secs.map(Duration::from_secs);
        Ok(service)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl DetectionService for HttpDetectionService {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn detect(&self, request: &DetectionRequest) -> Result<DetectionResponse> {
        let body = request.to_json()?;
        tracing::debug!(
            "POST {} ({} byte body, threshold {})",
            self.endpoint,
            body.len(),
            request.confidence_threshold
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // Keep diagnostics readable when the service answers with a whole HTML page
            let body = if text.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text[..end].to_string()
            } else {
                text
            };
            return Err(DetectError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        DetectionResponse::from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[test]
    fn test_service_endpoint() {
        let service = HttpDetectionService::new("http://localhost:8000/api/v1/predict");
        assert_eq!(service.endpoint(), "http://localhost:8000/api/v1/predict");
        assert!(service.timeout.is_none());
    }

    #[test]
    fn test_service_from_config() {
        let mut config = ClientConfig::default();
        config.request_timeout_secs = Some(15);
        let service = HttpDetectionService::from_config(&config).unwrap();
        assert_eq!(service.endpoint(), config.endpoint);
        assert_eq!(service.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_service_from_invalid_config() {
        let mut config = ClientConfig::default();
        config.endpoint = "localhost:8000".to_string();
        let result = HttpDetectionService::from_config(&config);
        assert!(matches!(result, Err(DetectError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Port 9 (discard) on localhost is almost never listening
        let service = HttpDetectionService::new("http://127.0.0.1:9/api/v1/predict")
            .with_timeout(Duration::from_secs(2));
        let request = DetectionRequest {
            b64image: "data:image/png;base64,".to_string(),
            confidence_threshold: 0.5,
        };
        let err = service.detect(&request).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Transport);
    }
}
