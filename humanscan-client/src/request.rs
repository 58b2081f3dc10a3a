//! Wire types for the detection service

use crate::error::{DetectError, Result};
use crate::image::{annotated_data_uri, SelectedImage, PNG_DATA_URI_PREFIX};
use crate::threshold::ThresholdField;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// Request body: the selected image and the current threshold, nothing else
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRequest {
    pub b64image: String,
    pub confidence_threshold: f64,
}

impl DetectionRequest {
    /// Pair the selected image with the threshold field's current value.
    ///
    /// Fails with [`DetectError::NoImageSelected`] when nothing was picked.
    pub fn build(image: Option<&SelectedImage>, threshold: &ThresholdField) -> Result<Self> {
        let image = image.ok_or(DetectError::NoImageSelected)?;
        Ok(Self {
            b64image: image.as_data_uri().to_string(),
            confidence_threshold: threshold.value(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Success body returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetectionResponse {
    /// Annotated PNG, base64 without a data URI prefix
    pub b64image: String,
    pub num_humans: u64,
}

impl DetectionResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| DetectError::InvalidResponse(format!("malformed detection body: {}", e)))
    }
}

/// What the result region displays after a successful detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    /// `data:image/png;base64,...`, ready to render
    pub annotated_image: String,
    pub person_count: u64,
}

impl DetectionResult {
    pub fn annotated_png(&self) -> Result<Vec<u8>> {
        let payload = self
            .annotated_image
            .strip_prefix(PNG_DATA_URI_PREFIX)
            .unwrap_or(&self.annotated_image);
        general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| DetectError::InvalidResponse(format!("annotated image is not base64: {}", e)))
    }
}

impl From<DetectionResponse> for DetectionResult {
    fn from(response: DetectionResponse) -> Self {
        Self {
            annotated_image: annotated_data_uri(&response.b64image),
            person_count: response.num_humans,
        }
    }
}
