use super::state::AppState;
use crate::auth::{AuthDecision, CurrentUser};
use crate::error::{CaptureError, DeviceError};
use crate::session::{SessionMetadata, SessionSnapshot};
use crate::upload::UploadReceipt;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub receipt: UploadReceipt,
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
    pub session: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub authenticated: bool,
    pub user: Option<CurrentUser>,
}

/// Body of every 401: where to log in
#[derive(Debug, Serialize)]
pub struct LoginRequiredResponse {
    pub code: &'static str,
    pub error: String,
    pub login: &'static str,
}

pub(super) fn login_required(message: impl Into<String>) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(LoginRequiredResponse {
            code: "UNAUTHORIZED",
            error: message.into(),
            login: "/auth/login",
        }),
    )
        .into_response()
}

fn status_for(err: &CaptureError) -> StatusCode {
    match err {
        CaptureError::Device(DeviceError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        CaptureError::Device(DeviceError::NoDevice(_)) => StatusCode::NOT_FOUND,
        CaptureError::InvalidState { .. } => StatusCode::CONFLICT,
        CaptureError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CaptureError::Upload(_) => StatusCode::BAD_GATEWAY,
        CaptureError::Recorder(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn failure(state: &AppState, err: CaptureError) -> Response {
    let status = status_for(&err);
    error!(code = err.code(), "Request failed: {}", err);

    (
        status,
        Json(ErrorResponse {
            code: err.code().to_string(),
            error: err.to_string(),
            session: state.controller.snapshot().await,
        }),
    )
        .into_response()
}

async fn snapshot(state: &AppState) -> Response {
    (StatusCode::OK, Json(state.controller.snapshot().await)).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
/// Current session snapshot
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    snapshot(&state).await
}

/// POST /session/start
/// Open the camera and start recording
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.start().await {
        Ok(()) => snapshot(&state).await,
        Err(e) => failure(&state, e).await,
    }
}

/// POST /session/stop
/// Stop recording and expose the preview
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.stop().await {
        Ok(artifact) => {
            info!(artifact_id = %artifact.id, "Recording ready for preview");
            snapshot(&state).await
        }
        Err(e) => failure(&state, e).await,
    }
}

/// PUT /session/metadata
/// Set the subject and batch the recording belongs to
pub async fn update_metadata(
    State(state): State<AppState>,
    Json(metadata): Json<SessionMetadata>,
) -> impl IntoResponse {
    match state.controller.set_metadata(metadata).await {
        Ok(()) => snapshot(&state).await,
        Err(e) => failure(&state, e).await,
    }
}

/// POST /session/upload
/// Upload the artifact and trigger processing
pub async fn upload(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.submit().await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(UploadResponse {
                receipt,
                session: state.controller.snapshot().await,
            }),
        )
            .into_response(),
        Err(e) => failure(&state, e).await,
    }
}

/// POST /session/reset
/// Discard the artifact and return to idle
pub async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.reset().await {
        Ok(()) => snapshot(&state).await,
        Err(e) => failure(&state, e).await,
    }
}

/// GET /previews/:id
/// Artifact bytes for local playback
pub async fn get_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.controller.previews().resolve(id) {
        Some(entry) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, entry.content_type)],
            entry.data,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "preview not found").into_response(),
    }
}

/// POST /auth/login
/// Exchange credentials with the backend and cache the token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    if let Err(e) = state.auth.login(&request.username, &request.password).await {
        warn!(username = %request.username, "Login failed: {:#}", e);
        return login_required(format!("{:#}", e));
    }
    current_user(State(state)).await.into_response()
}

/// GET /auth/me
/// Validate the cached token
pub async fn current_user(State(state): State<AppState>) -> impl IntoResponse {
    match state.auth.check().await {
        AuthDecision::Authorized(user) => (
            StatusCode::OK,
            Json(AuthResponse {
                authenticated: true,
                user,
            }),
        )
            .into_response(),
        AuthDecision::RedirectToLogin => login_required("login required"),
    }
}

/// POST /auth/logout
/// Forget the cached token
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    state.auth.tokens().clear();
    info!("Logged out");
    Json(AuthResponse {
        authenticated: false,
        user: None,
    })
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
