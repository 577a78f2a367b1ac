use crate::error::TriggerError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Multipart field names the attendance backend expects
pub const FIELD_ID: &str = "id";
pub const FIELD_BATCH: &str = "batch";
pub const FIELD_VIDEO: &str = "video";
pub const VIDEO_FILE_NAME: &str = "video.mp4";

/// Result of the processing trigger fired after a stored upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum TriggerOutcome {
    Accepted,
    Failed(TriggerError),
}

impl TriggerOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TriggerOutcome::Accepted)
    }
}

/// Proof that the backend stored the artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub size_bytes: usize,
    pub uploaded_at: DateTime<Utc>,
    pub trigger: TriggerOutcome,
}
