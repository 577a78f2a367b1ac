use super::snapshot::SessionSnapshot;
use super::state::{Phase, SessionMetadata, UploadOutcome};
use crate::auth::TokenStore;
use crate::capture::{
    Artifact, ArtifactSummary, DeviceFactory, DeviceGateway, LivePreview, MediaStream,
    PreviewManager, PreviewRef, RecorderSession,
};
use crate::config::Config;
use crate::error::{CaptureError, CaptureResult, UploadError};
use crate::upload::{UploadPipeline, UploadReceipt};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

/// A finished recording and the preview ref that plays it
struct Take {
    artifact: Artifact,
    preview: PreviewRef,
}

/// Session state. Each variant owns exactly the resources valid in that phase.
enum Stage {
    Idle,
    Recording { stream: MediaStream },
    Recorded { take: Take },
    Uploading { take: Take },
    Uploaded { take: Take, receipt: UploadReceipt },
    UploadFailed { take: Take, error: UploadError },
}

impl Stage {
    fn phase(&self) -> Phase {
        match self {
            Stage::Idle => Phase::Idle,
            Stage::Recording { .. } => Phase::Recording,
            Stage::Recorded { .. } => Phase::Recorded,
            Stage::Uploading { .. } => Phase::Uploading,
            Stage::Uploaded { .. } => Phase::Uploaded,
            Stage::UploadFailed { .. } => Phase::UploadFailed,
        }
    }

    fn take(&self) -> Option<&Take> {
        match self {
            Stage::Recorded { take }
            | Stage::Uploading { take }
            | Stage::Uploaded { take, .. }
            | Stage::UploadFailed { take, .. } => Some(take),
            Stage::Idle | Stage::Recording { .. } => None,
        }
    }

    fn into_take(self) -> Option<Take> {
        match self {
            Stage::Recorded { take }
            | Stage::Uploading { take }
            | Stage::Uploaded { take, .. }
            | Stage::UploadFailed { take, .. } => Some(take),
            Stage::Idle | Stage::Recording { .. } => None,
        }
    }

    fn upload_outcome(&self) -> Option<UploadOutcome> {
        match self {
            Stage::Uploaded { receipt, .. } => Some(UploadOutcome::Success {
                receipt: receipt.clone(),
            }),
            Stage::UploadFailed { error, .. } => Some(UploadOutcome::Error {
                error: error.clone(),
            }),
            _ => None,
        }
    }
}

struct Session {
    stage: Stage,
    metadata: SessionMetadata,
    recorder: RecorderSession,
    upload_attempts: u32,
}

struct Shared {
    device: Arc<dyn DeviceGateway>,
    previews: PreviewManager,
    uploader: UploadPipeline,
    session: Mutex<Session>,
}

/// Orchestrates one capture session: record, preview, upload
///
/// The only component that touches the device, recorder, preview registry
/// and upload pipeline. Every transition runs under one lock; an upload holds
/// the `uploading` phase instead of the lock, which refuses all competing
/// transitions until the upload resolves.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(
        device: Arc<dyn DeviceGateway>,
        previews: PreviewManager,
        uploader: UploadPipeline,
    ) -> Self {
        info!(device = device.name(), "Session controller created");

        Self {
            shared: Arc::new(Shared {
                device,
                previews,
                uploader,
                session: Mutex::new(Session {
                    stage: Stage::Idle,
                    metadata: SessionMetadata::default(),
                    recorder: RecorderSession::new(),
                    upload_attempts: 0,
                }),
            }),
        }
    }

    /// Build the device, preview registry and upload pipeline from config
    pub fn from_config(config: &Config, tokens: TokenStore) -> anyhow::Result<Self> {
        let device = DeviceFactory::create(&config.device)?;
        let uploader = UploadPipeline::new(&config.backend, tokens)?;
        Ok(Self::new(device, PreviewManager::new(), uploader))
    }

    pub fn previews(&self) -> &PreviewManager {
        &self.shared.previews
    }

    /// Live camera output binding
    pub fn subscribe_live(&self) -> watch::Receiver<LivePreview> {
        self.shared.device.live_view().subscribe()
    }

    pub async fn phase(&self) -> Phase {
        self.shared.session.lock().await.stage.phase()
    }

    pub async fn metadata(&self) -> SessionMetadata {
        self.shared.session.lock().await.metadata.clone()
    }

    /// The current artifact, if a recording has completed
    pub async fn artifact(&self) -> Option<Artifact> {
        let session = self.shared.session.lock().await;
        session.stage.take().map(|take| take.artifact.clone())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.shared.session.lock().await;
        let take = session.stage.take();

        SessionSnapshot {
            phase: session.stage.phase(),
            metadata: session.metadata.clone(),
            artifact: take.map(|t| t.artifact.summary()),
            preview: take.map(|t| t.preview.clone()),
            upload: session.stage.upload_outcome(),
            upload_attempts: session.upload_attempts,
            live: self.shared.device.live_view().current(),
        }
    }

    /// Update who the recording is for. Refused while an upload is in flight.
    pub async fn set_metadata(&self, metadata: SessionMetadata) -> CaptureResult<()> {
        let mut session = self.shared.session.lock().await;
        let phase = session.stage.phase();
        if phase == Phase::Uploading {
            return Err(CaptureError::invalid_state("edit metadata", phase));
        }
        session.metadata = metadata;
        Ok(())
    }

    /// Open the camera and start recording
    ///
    /// Discards any previous artifact first. If the camera cannot be acquired
    /// the session is left idle with no stream held.
    pub async fn start(&self) -> CaptureResult<()> {
        let mut session = self.shared.session.lock().await;
        let from = session.stage.phase();
        if matches!(from, Phase::Recording | Phase::Uploading) {
            return Err(CaptureError::invalid_state("start recording", from));
        }

        let previous = std::mem::replace(&mut session.stage, Stage::Idle);
        if let Some(take) = previous.into_take() {
            self.discard(take);
        }
        session.upload_attempts = 0;

        let mut stream = match self.shared.device.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(device = self.shared.device.name(), "Camera acquisition failed: {}", e);
                return Err(e.into());
            }
        };

        if let Err(e) = session.recorder.begin(&mut stream) {
            self.shared.device.release(&mut stream);
            return Err(e);
        }

        info!(%from, stream_id = %stream.id(), "Recording started");
        session.stage = Stage::Recording { stream };
        Ok(())
    }

    /// Stop recording, release the camera, and create the preview
    pub async fn stop(&self) -> CaptureResult<ArtifactSummary> {
        let mut session = self.shared.session.lock().await;
        let mut stream = match std::mem::replace(&mut session.stage, Stage::Idle) {
            Stage::Recording { stream } => stream,
            other => {
                let phase = other.phase();
                session.stage = other;
                return Err(CaptureError::invalid_state("stop recording", phase));
            }
        };

        let ended = session.recorder.end().await;
        self.shared.device.release(&mut stream);
        drop(stream);
        let artifact = ended?;

        let preview = self.shared.previews.create_ref(&artifact);
        let summary = artifact.summary();

        info!(
            artifact_id = %summary.id,
            size_bytes = summary.size_bytes,
            preview = %preview.url,
            "Recording stopped"
        );

        session.stage = Stage::Recorded {
            take: Take { artifact, preview },
        };
        Ok(summary)
    }

    /// Upload the current artifact and trigger processing
    ///
    /// Only one upload runs at a time. Once begun, the upload runs to
    /// completion even if the caller stops waiting for it.
    pub async fn submit(&self) -> CaptureResult<UploadReceipt> {
        let (metadata, artifact, attempt) = self.begin_upload().await?;

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let result = shared.uploader.submit(&metadata, &artifact).await;
            Self::finish_upload(&shared, attempt, result).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Upload task failed: {}", e);
                let aborted: CaptureResult<UploadReceipt> =
                    Err(UploadError::Network("upload task aborted".to_string()).into());
                Self::finish_upload(&self.shared, attempt, aborted).await
            }
        }
    }

    /// Discard the artifact and preview and return to idle
    pub async fn reset(&self) -> CaptureResult<()> {
        let mut session = self.shared.session.lock().await;
        let from = session.stage.phase();
        match from {
            Phase::Idle => return Ok(()),
            Phase::Recording | Phase::Uploading => {
                return Err(CaptureError::invalid_state("reset", from));
            }
            Phase::Recorded | Phase::Uploaded | Phase::UploadFailed => {}
        }

        let previous = std::mem::replace(&mut session.stage, Stage::Idle);
        if let Some(take) = previous.into_take() {
            self.discard(take);
        }
        session.upload_attempts = 0;

        info!(%from, "Session reset");
        Ok(())
    }

    async fn begin_upload(&self) -> CaptureResult<(SessionMetadata, Artifact, u32)> {
        let mut session = self.shared.session.lock().await;
        let phase = session.stage.phase();
        if !matches!(phase, Phase::Recorded | Phase::UploadFailed) {
            return Err(CaptureError::invalid_state("submit", phase));
        }
        session.metadata.validate()?;

        let take = match std::mem::replace(&mut session.stage, Stage::Idle) {
            Stage::Recorded { take } | Stage::UploadFailed { take, .. } => take,
            other => {
                session.stage = other;
                return Err(CaptureError::invalid_state("submit", phase));
            }
        };

        let artifact = take.artifact.clone();
        session.stage = Stage::Uploading { take };
        session.upload_attempts += 1;

        info!(
            artifact_id = %artifact.id(),
            attempt = session.upload_attempts,
            "Upload started"
        );

        Ok((session.metadata.clone(), artifact, session.upload_attempts))
    }

    async fn finish_upload(
        shared: &Shared,
        attempt: u32,
        result: CaptureResult<UploadReceipt>,
    ) -> CaptureResult<UploadReceipt> {
        let mut session = shared.session.lock().await;
        let take = match std::mem::replace(&mut session.stage, Stage::Idle) {
            Stage::Uploading { take } => take,
            other => {
                // Already resolved by the other path
                session.stage = other;
                return result;
            }
        };

        session.stage = match &result {
            Ok(receipt) => {
                info!(attempt, trigger = ?receipt.trigger, "Upload succeeded");
                Stage::Uploaded {
                    take,
                    receipt: receipt.clone(),
                }
            }
            Err(CaptureError::Upload(error)) => {
                warn!(attempt, "Upload failed: {}", error);
                Stage::UploadFailed {
                    take,
                    error: error.clone(),
                }
            }
            Err(e) => {
                warn!(attempt, "Upload refused: {}", e);
                Stage::Recorded { take }
            }
        };

        result
    }

    fn discard(&self, take: Take) {
        self.shared.previews.release_ref(&take.preview);
        info!(artifact_id = %take.artifact.id(), "Artifact discarded");
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let session = self.session.get_mut();
        match std::mem::replace(&mut session.stage, Stage::Idle) {
            Stage::Recording { mut stream } => self.device.release(&mut stream),
            other => {
                if let Some(take) = other.into_take() {
                    self.previews.release_ref(&take.preview);
                }
            }
        }
    }
}
