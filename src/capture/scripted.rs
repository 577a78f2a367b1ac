use super::device::{DeviceGateway, LiveView, MediaChunk, MediaStream, MediaTrack, TrackKind};
use crate::error::DeviceError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Availability {
    Ready,
    PermissionDenied,
    Missing,
}

/// Camera that delivers a fixed script of chunk sizes as soon as it is acquired
///
/// Every chunk is queued before `acquire` returns, so a recorder stopped at any
/// point afterwards sees all of them.
pub struct ScriptedCamera {
    chunk_sizes: Vec<usize>,
    availability: Availability,
    live_view: LiveView,
    acquisitions: AtomicUsize,
    issued: Mutex<Vec<Arc<AtomicBool>>>,
}

impl ScriptedCamera {
    pub fn new(chunk_sizes: Vec<usize>) -> Self {
        Self {
            chunk_sizes,
            availability: Availability::Ready,
            live_view: LiveView::new(),
            acquisitions: AtomicUsize::new(0),
            issued: Mutex::new(Vec::new()),
        }
    }

    /// Every acquisition fails as if the user rejected the permission prompt
    pub fn deny_permission(mut self) -> Self {
        self.availability = Availability::PermissionDenied;
        self
    }

    /// Every acquisition fails as if no camera were attached
    pub fn without_device(mut self) -> Self {
        self.availability = Availability::Missing;
        self
    }

    /// Number of successful acquisitions
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Tracks handed out by this camera that are still running
    pub fn live_tracks(&self) -> usize {
        self.issued
            .lock()
            .iter()
            .filter(|flag| flag.load(Ordering::SeqCst))
            .count()
    }
}

#[async_trait::async_trait]
impl DeviceGateway for ScriptedCamera {
    async fn acquire(&self) -> Result<MediaStream, DeviceError> {
        match self.availability {
            Availability::PermissionDenied => {
                return Err(DeviceError::PermissionDenied(
                    "user rejected camera access".to_string(),
                ))
            }
            Availability::Missing => {
                return Err(DeviceError::NoDevice("no camera attached".to_string()))
            }
            Availability::Ready => {}
        }

        let (tx, rx) = mpsc::channel(self.chunk_sizes.len().max(1));
        for (i, &size) in self.chunk_sizes.iter().enumerate() {
            let chunk = MediaChunk::new(vec![(i % 251) as u8; size]);
            // Capacity covers the whole script
            let _ = tx.try_send(chunk);
        }

        let track = MediaTrack::new(TrackKind::Video, "scripted camera");
        {
            let mut issued = self.issued.lock();
            issued.retain(|flag| flag.load(Ordering::SeqCst));
            issued.push(track.live_flag());
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        let stream = MediaStream::new(self.name(), vec![track], rx);
        self.live_view.bind(&stream);

        info!(
            stream_id = %stream.id(),
            chunks = self.chunk_sizes.len(),
            "Scripted camera acquired"
        );

        Ok(stream)
    }

    fn live_view(&self) -> &LiveView {
        &self.live_view
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
