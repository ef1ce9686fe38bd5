//! Error types shared across the crate
//!
//! Each enum maps one failure domain: microphone capture, backend API
//! calls, and session orchestration. HTTP handlers translate these into
//! status codes and JSON error bodies.

use thiserror::Error;

/// Failures while acquiring or running the microphone
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No microphone found. Please connect a microphone and try again.")]
    DeviceUnavailable,

    #[error("Microphone access denied. Please allow microphone access and try again.")]
    PermissionDenied,

    #[error("Audio capture failed: {0}")]
    Stream(String),
}

/// Failures talking to the interview backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
}

/// Failures in session orchestration
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to load interview session: {0}")]
    LoadFailed(#[source] ApiError),

    #[error("Interview has no questions")]
    NoQuestions,

    #[error("Failed to process recording. Please try again.")]
    Submission(#[source] ApiError),

    #[error("Session is not active")]
    NotActive,

    #[error("{0}")]
    InvalidOperation(String),
}

impl CaptureError {
    /// Stable machine-readable code for the control API
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::DeviceUnavailable => "DEVICE_UNAVAILABLE",
            CaptureError::PermissionDenied => "PERMISSION_DENIED",
            CaptureError::Stream(_) => "CAPTURE_FAILED",
        }
    }
}
