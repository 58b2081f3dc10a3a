//! Error types for humanscan-client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Please select image first!")]
    NoImageSelected,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Image too large: {size} bytes (max {limit} bytes)")]
    ImageTooLarge { size: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Detection service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from detection service: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid confidence threshold: {0}")]
    InvalidThreshold(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Where an error sits in the client's failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Shown to the user immediately, no request is made.
    UserPrecondition,
    /// The call could not complete; logged for the operator only.
    Transport,
    /// Rejected threshold input; silently ignored.
    InputValidation,
    /// Failed before any request existed (file, media type, config).
    Local,
}

impl DetectError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DetectError::NoImageSelected => ErrorClass::UserPrecondition,
            DetectError::Http(_)
            | DetectError::Status { .. }
            | DetectError::InvalidResponse(_)
            | DetectError::Json(_) => ErrorClass::Transport,
            DetectError::InvalidThreshold(_) => ErrorClass::InputValidation,
            DetectError::UnsupportedMediaType(_)
            | DetectError::ImageTooLarge { .. }
            | DetectError::Io(_)
            | DetectError::Config(_) => ErrorClass::Local,
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;
