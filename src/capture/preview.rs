use super::recorder::Artifact;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Route prefix the control API serves previews under
pub const PREVIEW_ROUTE: &str = "/previews";

/// Locally dereferenceable handle to an artifact, suitable for playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRef {
    pub id: Uuid,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub data: Bytes,
    pub content_type: String,
}

/// Registry of playable artifacts
///
/// Cloning shares the registry, so the control API can resolve refs that the
/// session controller created.
#[derive(Debug, Clone, Default)]
pub struct PreviewManager {
    entries: Arc<RwLock<HashMap<Uuid, PreviewEntry>>>,
}

impl PreviewManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_ref(&self, artifact: &Artifact) -> PreviewRef {
        let id = Uuid::new_v4();
        self.entries.write().insert(
            id,
            PreviewEntry {
                data: artifact.data(),
                content_type: artifact.content_type().to_string(),
            },
        );

        debug!(preview_id = %id, artifact_id = %artifact.id(), "Preview created");

        PreviewRef {
            id,
            url: format!("{}/{}", PREVIEW_ROUTE, id),
        }
    }

    /// Release a ref. Unknown or already-released refs are ignored.
    pub fn release_ref(&self, preview: &PreviewRef) -> bool {
        let removed = self.entries.write().remove(&preview.id).is_some();
        if removed {
            debug!(preview_id = %preview.id, "Preview released");
        } else {
            warn!(preview_id = %preview.id, "Preview already released");
        }
        removed
    }

    pub fn resolve(&self, id: Uuid) -> Option<PreviewEntry> {
        self.entries.read().get(&id).cloned()
    }

    /// Number of refs created and not yet released
    pub fn outstanding(&self) -> usize {
        self.entries.read().len()
    }
}
