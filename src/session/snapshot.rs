use super::state::{Phase, SessionMetadata, UploadOutcome};
use crate::capture::{ArtifactSummary, LivePreview, PreviewRef};
use serde::Serialize;

/// Point-in-time view of the session, safe to serialize
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub metadata: SessionMetadata,
    pub artifact: Option<ArtifactSummary>,
    pub preview: Option<PreviewRef>,
    pub upload: Option<UploadOutcome>,
    /// Upload attempts made for the current artifact
    pub upload_attempts: u32,
    pub live: LivePreview,
}

impl SessionSnapshot {
    /// Whether the upload action should be offered
    pub fn can_submit(&self) -> bool {
        matches!(self.phase, Phase::Recorded | Phase::UploadFailed)
    }

    /// Whether starting a new recording should be offered
    pub fn can_start(&self) -> bool {
        !matches!(self.phase, Phase::Recording | Phase::Uploading)
    }
}
