pub mod auth;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod upload;

pub use auth::{AuthDecision, AuthGuard, TokenStore};
pub use capture::{
    Artifact, DeviceFactory, DeviceGateway, FileCamera, LivePreview, MediaChunk, MediaStream,
    PreviewManager, PreviewRef, RecorderSession, ScriptedCamera,
};
pub use config::Config;
pub use error::{CaptureError, DeviceError, TriggerError, UploadError, ValidationError};
pub use http::{create_router, AppState};
pub use session::{Phase, SessionController, SessionMetadata, SessionSnapshot, UploadOutcome};
pub use upload::{TriggerOutcome, UploadPipeline, UploadReceipt};
