//! Local HTTP control API for the capture session
//!
//! This module exposes the session controller to a browser or script.
//! Session and preview routes answer 401 until `/auth/login` succeeds:
//! - POST /auth/login - Log in against the backend
//! - GET /auth/me - Current user
//! - POST /auth/logout - Forget the token
//! - GET /session - Current snapshot
//! - POST /session/start - Start recording
//! - POST /session/stop - Stop recording and create the preview
//! - PUT /session/metadata - Set subject and batch
//! - POST /session/upload - Upload and trigger processing
//! - POST /session/reset - Discard the recording
//! - GET /previews/:id - Play back a recording
//! - GET /health - Health check

mod guard;
mod handlers;
mod routes;
mod state;

pub use handlers::{
    AuthResponse, ErrorResponse, LoginRequest, LoginRequiredResponse, UploadResponse,
};
pub use routes::create_router;
pub use state::AppState;
