//! Error taxonomy for the capture and upload pipeline

use crate::session::Phase;
use serde::Serialize;
use thiserror::Error;

/// Camera acquisition failures. Fatal to the current attempt; `start` may be retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("no camera available: {0}")]
    NoDevice(String),
}

/// A required metadata field was missing or blank.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("missing required field `{field}`")]
pub struct ValidationError {
    pub field: &'static str,
}

/// Primary upload failed. The artifact is kept so the upload can be retried.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "lowercase")]
pub enum UploadError {
    #[error("upload request failed: {0}")]
    Network(String),

    #[error("upload rejected with HTTP {0}")]
    Status(u16),
}

/// Processing trigger failed after a successful upload. Reported, never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "lowercase")]
pub enum TriggerError {
    #[error("trigger request failed: {0}")]
    Network(String),

    #[error("trigger rejected with HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("cannot {operation} while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The capture task died before handing back its chunks. Nothing usable
    /// was recorded.
    #[error("recorder failed: {0}")]
    Recorder(String),
}

impl CaptureError {
    pub fn invalid_state(operation: &'static str, phase: Phase) -> Self {
        Self::InvalidState { operation, phase }
    }

    /// Stable machine-readable code, used by the control API.
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::Device(DeviceError::PermissionDenied(_)) => "PERMISSION_DENIED",
            CaptureError::Device(DeviceError::NoDevice(_)) => "NO_DEVICE",
            CaptureError::InvalidState { .. } => "INVALID_STATE",
            CaptureError::Validation(_) => "VALIDATION_ERROR",
            CaptureError::Upload(_) => "UPLOAD_ERROR",
            CaptureError::Recorder(_) => "RECORDER_ERROR",
        }
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;
