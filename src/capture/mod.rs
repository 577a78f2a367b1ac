//! Camera capture: device gateway, recorder, and local preview

pub mod device;
pub mod file;
pub mod preview;
pub mod recorder;
pub mod scripted;

pub use device::{
    DeviceFactory, DeviceGateway, LivePreview, LiveView, MediaChunk, MediaStream, MediaTrack,
    TrackKind,
};
pub use file::FileCamera;
pub use preview::{PreviewEntry, PreviewManager, PreviewRef, PREVIEW_ROUTE};
pub use recorder::{Artifact, ArtifactSummary, RecorderSession, MP4_CONTENT_TYPE};
pub use scripted::ScriptedCamera;
