use super::device::{MediaChunk, MediaStream};
use crate::error::{CaptureError, CaptureResult};
use crate::session::Phase;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Content type of every artifact the recorder produces
pub const MP4_CONTENT_TYPE: &str = "video/mp4";

/// A finished recording: every delivered chunk concatenated into one buffer
///
/// Always `video/mp4`; the backend contract allows no other container.
#[derive(Debug, Clone)]
pub struct Artifact {
    id: Uuid,
    data: Bytes,
    chunk_count: usize,
    created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(data: Bytes, chunk_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            chunk_count,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cheap handle to the bytes; the buffer itself is shared
    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn content_type(&self) -> &'static str {
        MP4_CONTENT_TYPE
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            id: self.id,
            size_bytes: self.len(),
            content_type: self.content_type(),
            chunk_count: self.chunk_count,
            created_at: self.created_at,
        }
    }
}

/// Serializable description of an artifact, without its bytes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub id: Uuid,
    pub size_bytes: usize,
    pub content_type: &'static str,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

struct ActiveRecording {
    stream_id: Uuid,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Vec<Bytes>>,
}

/// Owns at most one recording at a time on top of a live stream
#[derive(Default)]
pub struct RecorderSession {
    active: Option<ActiveRecording>,
}

impl RecorderSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the stream's chunk feed and start accumulating immediately
    pub fn begin(&mut self, stream: &mut MediaStream) -> CaptureResult<()> {
        if self.active.is_some() {
            return Err(CaptureError::invalid_state("begin recording", Phase::Recording));
        }
        let chunks = stream
            .take_chunks()
            .ok_or_else(|| CaptureError::invalid_state("begin recording", Phase::Recording))?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let stream_id = stream.id();
        let task = tokio::spawn(collect_chunks(stream_id, chunks, stop_rx));

        info!(%stream_id, "Recorder started");

        self.active = Some(ActiveRecording {
            stream_id,
            stop_tx,
            task,
        });
        Ok(())
    }

    /// Stop, flush pending chunks, and return the concatenated artifact
    pub async fn end(&mut self) -> CaptureResult<Artifact> {
        let active = self
            .active
            .take()
            .ok_or_else(|| CaptureError::invalid_state("end recording", Phase::Idle))?;

        // The task may already have finished if the feed closed on its own
        let _ = active.stop_tx.send(());

        let parts = match active.task.await {
            Ok(parts) => parts,
            Err(e) => {
                error!(stream_id = %active.stream_id, "Recorder task failed: {}", e);
                return Err(CaptureError::Recorder(e.to_string()));
            }
        };

        let total: usize = parts.iter().map(Bytes::len).sum();
        let mut buf = BytesMut::with_capacity(total);
        for part in &parts {
            buf.extend_from_slice(part);
        }

        let artifact = Artifact::new(buf.freeze(), parts.len());

        info!(
            stream_id = %active.stream_id,
            artifact_id = %artifact.id(),
            chunks = artifact.chunk_count(),
            size_bytes = artifact.len(),
            "Recorder stopped"
        );

        Ok(artifact)
    }
}

async fn collect_chunks(
    stream_id: Uuid,
    mut chunks: mpsc::Receiver<MediaChunk>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Vec<Bytes> {
    let mut parts = Vec::new();
    let mut feed_open = true;

    while feed_open {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            chunk = chunks.recv() => match chunk {
                Some(chunk) => push_chunk(&mut parts, chunk),
                None => feed_open = false,
            },
        }
    }

    // Flush whatever the device delivered before the stop
    while let Ok(chunk) = chunks.try_recv() {
        push_chunk(&mut parts, chunk);
    }

    debug!(%stream_id, parts = parts.len(), "Chunk collection finished");
    parts
}

fn push_chunk(parts: &mut Vec<Bytes>, chunk: MediaChunk) {
    if !chunk.is_empty() {
        parts.push(chunk.data);
    }
}
