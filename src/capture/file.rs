use super::device::{DeviceGateway, LiveView, MediaChunk, MediaStream, MediaTrack, TrackKind};
use crate::error::DeviceError;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Replays an MP4 file as if it were a live camera feed
///
/// The file is emitted in `chunk_bytes` slices, one per `interval`, until the
/// track is stopped or the file runs out.
pub struct FileCamera {
    path: PathBuf,
    chunk_bytes: usize,
    interval: Duration,
    live_view: LiveView,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>, chunk_bytes: usize, interval: Duration) -> Self {
        Self {
            path: path.into(),
            chunk_bytes: chunk_bytes.max(1),
            interval: interval.max(Duration::from_millis(1)),
            live_view: LiveView::new(),
        }
    }
}

#[async_trait::async_trait]
impl DeviceGateway for FileCamera {
    async fn acquire(&self) -> Result<MediaStream, DeviceError> {
        let data = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                DeviceError::PermissionDenied(format!("{}: {}", self.path.display(), e))
            }
            _ => DeviceError::NoDevice(format!("{}: {}", self.path.display(), e)),
        })?;
        let data = Bytes::from(data);

        info!(
            path = %self.path.display(),
            size_bytes = data.len(),
            chunk_bytes = self.chunk_bytes,
            "File camera acquired"
        );

        let track = MediaTrack::new(TrackKind::Video, self.path.display().to_string());
        let live = track.live_flag();
        let (tx, rx) = mpsc::channel(64);
        let chunk_bytes = self.chunk_bytes;
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut offset = 0;

            while offset < data.len() {
                ticker.tick().await;
                if !live.load(Ordering::SeqCst) {
                    break;
                }

                let end = (offset + chunk_bytes).min(data.len());
                let chunk = MediaChunk::new(data.slice(offset..end));
                if tx.send(chunk).await.is_err() {
                    warn!("Chunk receiver dropped, stopping file feed");
                    break;
                }

                offset = end;
            }
        });

        let stream = MediaStream::new(self.name(), vec![track], rx);
        self.live_view.bind(&stream);
        Ok(stream)
    }

    fn live_view(&self) -> &LiveView {
        &self.live_view
    }

    fn name(&self) -> &str {
        "file"
    }
}
