//! humanscan-client: client side of a remote human-detection service
//!
//! Encodes a chosen image as a data URI, pairs it with a confidence threshold,
//! posts it to the detection endpoint and reconciles the answer (an annotated
//! PNG and a person count) with the session's displayed state.

pub mod config;
pub mod error;
pub mod image;
pub mod reconciler;
pub mod request;
pub mod session;
pub mod threshold;
pub mod transport;

pub use config::{ClientConfig, ThresholdPolicy, DEFAULT_ENDPOINT};
pub use error::{DetectError, ErrorClass, Result};
pub use image::SelectedImage;
pub use reconciler::{Completion, DetectionState, DispatchTicket};
pub use request::{DetectionRequest, DetectionResponse, DetectionResult};
pub use session::{DetectionSession, SessionView};
pub use threshold::{ThresholdEdit, ThresholdField};
pub use transport::{DetectionService, HttpDetectionService};
