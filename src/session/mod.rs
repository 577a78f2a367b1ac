//! Capture session management
//!
//! This module provides the `SessionController` state machine that manages:
//! - Camera acquisition and release
//! - Recording into a single artifact
//! - Local preview refs for playback
//! - Guarded, single-flight upload with the processing trigger

mod controller;
mod snapshot;
mod state;

pub use controller::SessionController;
pub use snapshot::SessionSnapshot;
pub use state::{Phase, SessionMetadata, UploadOutcome};
