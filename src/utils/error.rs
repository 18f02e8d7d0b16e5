//! Error types and handling
//!
//! Common error types used across the application.

use crate::capture::CaptureError;
use crate::config::ConfigError;
use crate::export::{ExportError, PipelineError};
use crate::recorder::SessionState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Session is busy processing clips")]
    Busy,

    #[error("Operation not allowed while {0:?}")]
    InvalidState(SessionState),
}

/// Error response for machine-readable output
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Capture(_) => "CAPTURE_ERROR",
            AppError::Export(_) => "EXPORT_ERROR",
            AppError::Pipeline(_) => "PIPELINE_ERROR",
            AppError::Busy => "SESSION_BUSY",
            AppError::InvalidState(_) => "INVALID_STATE",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_codes() {
        let response: ErrorResponse = AppError::Busy.into();
        assert_eq!(response.code, "SESSION_BUSY");

        let response: ErrorResponse = AppError::InvalidState(SessionState::Recording).into();
        assert_eq!(response.code, "INVALID_STATE");
        assert!(response.message.contains("Recording"));
    }
}
