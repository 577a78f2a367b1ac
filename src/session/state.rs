use crate::error::{UploadError, ValidationError};
use crate::upload::UploadReceipt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the capture session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Nothing captured, camera off
    #[default]
    Idle,
    /// Camera on, chunks accumulating
    Recording,
    /// Artifact ready for preview and upload
    Recorded,
    /// Upload in flight; every other action is refused
    Uploading,
    /// Backend stored the artifact; only reset or a new recording is allowed
    Uploaded,
    /// Upload failed; artifact kept for retry
    UploadFailed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Recording => "recording",
            Phase::Recorded => "recorded",
            Phase::Uploading => "uploading",
            Phase::Uploaded => "uploaded",
            Phase::UploadFailed => "upload-failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the recording is for. Both fields are required before upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub subject_id: String,
    pub batch_id: String,
}

impl SessionMetadata {
    pub fn new(subject_id: impl Into<String>, batch_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            batch_id: batch_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject_id.trim().is_empty() {
            return Err(ValidationError { field: "subject_id" });
        }
        if self.batch_id.trim().is_empty() {
            return Err(ValidationError { field: "batch_id" });
        }
        Ok(())
    }
}

/// Result of the most recent upload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadOutcome {
    Success { receipt: UploadReceipt },
    Error { error: UploadError },
}
