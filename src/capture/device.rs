use crate::config::{DeviceConfig, DeviceKind};
use crate::error::DeviceError;
use anyhow::{Context, Result};
use bytes::Bytes;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use uuid::Uuid;

use super::file::FileCamera;
use super::scripted::ScriptedCamera;

/// Encoded media delivered by a device while its tracks are live
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Encoded container bytes
    pub data: Bytes,
}

impl MediaChunk {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// One track of a live stream. Stopping is shared with the producing device.
#[derive(Debug)]
pub struct MediaTrack {
    kind: TrackKind,
    label: String,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Flag the producer polls to know when to stop emitting
    pub fn live_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.live)
    }

    /// Returns true if the track was live before this call
    pub fn stop(&self) -> bool {
        self.live.swap(false, Ordering::SeqCst)
    }
}

/// Live device handle: tracks plus the chunk feed
///
/// Dropping the stream stops every track, so a stream can never outlive
/// the session that owns it with the camera still on.
#[derive(Debug)]
pub struct MediaStream {
    id: Uuid,
    device: String,
    tracks: Vec<MediaTrack>,
    chunks: Option<mpsc::Receiver<MediaChunk>>,
}

impl MediaStream {
    pub fn new(
        device: impl Into<String>,
        tracks: Vec<MediaTrack>,
        chunks: mpsc::Receiver<MediaChunk>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            device: device.into(),
            tracks,
            chunks: Some(chunks),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    /// Hand the chunk feed to a recorder. Only the first caller gets it.
    pub fn take_chunks(&mut self) -> Option<mpsc::Receiver<MediaChunk>> {
        self.chunks.take()
    }

    /// Stop every track, returning how many were still live
    pub fn stop(&mut self) -> usize {
        let mut stopped = 0;
        for track in &self.tracks {
            if track.stop() {
                debug!(
                    stream_id = %self.id,
                    kind = ?track.kind(),
                    label = track.label(),
                    "Track stopped"
                );
                stopped += 1;
            }
        }
        stopped
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        let stopped = self.stop();
        if stopped > 0 {
            debug!(stream_id = %self.id, stopped, "Stopped live tracks on drop");
        }
    }
}

/// What the live camera output is currently showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LivePreview {
    Unbound,
    Bound { stream_id: Uuid, device: String },
}

/// On-screen binding for the live camera feed
#[derive(Debug)]
pub struct LiveView {
    tx: watch::Sender<LivePreview>,
}

impl LiveView {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LivePreview::Unbound);
        Self { tx }
    }

    pub fn bind(&self, stream: &MediaStream) {
        self.tx.send_replace(LivePreview::Bound {
            stream_id: stream.id(),
            device: stream.device().to_string(),
        });
    }

    /// Unbind only if the view still shows this stream
    pub fn unbind(&self, stream_id: Uuid) {
        self.tx.send_if_modified(|current| match current {
            LivePreview::Bound { stream_id: bound, .. } if *bound == stream_id => {
                *current = LivePreview::Unbound;
                true
            }
            _ => false,
        });
    }

    pub fn current(&self) -> LivePreview {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LivePreview> {
        self.tx.subscribe()
    }
}

impl Default for LiveView {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera device gateway
///
/// Implementations:
/// - `ScriptedCamera`: fixed chunk script, configurable failures (tests)
/// - `FileCamera`: replays an MP4 file as a live feed
#[async_trait::async_trait]
pub trait DeviceGateway: Send + Sync {
    /// Open the camera and bind its live output
    async fn acquire(&self) -> Result<MediaStream, DeviceError>;

    /// Live output binding for this device
    fn live_view(&self) -> &LiveView;

    /// Backend name for logging
    fn name(&self) -> &str;

    /// Stop every track and unbind the live output. Idempotent.
    fn release(&self, stream: &mut MediaStream) {
        let stopped = stream.stop();
        self.live_view().unbind(stream.id());
        debug!(
            device = self.name(),
            stream_id = %stream.id(),
            stopped,
            "Released media stream"
        );
    }
}

/// Device gateway factory
pub struct DeviceFactory;

impl DeviceFactory {
    /// Create a device gateway from configuration
    pub fn create(config: &DeviceConfig) -> Result<Arc<dyn DeviceGateway>> {
        match config.kind {
            DeviceKind::File => {
                let path = config
                    .path
                    .clone()
                    .context("device.path is required for the file camera")?;
                Ok(Arc::new(FileCamera::new(
                    path,
                    config.chunk_bytes,
                    std::time::Duration::from_millis(config.chunk_interval_ms),
                )))
            }
            DeviceKind::Scripted => Ok(Arc::new(ScriptedCamera::new(
                config.scripted_chunks.clone(),
            ))),
        }
    }
}
