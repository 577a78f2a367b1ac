use super::handlers::login_required;
use super::state::AppState;
use crate::auth::AuthDecision;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Reject the request with 401 unless the cached token still validates
pub async fn require_login(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match state.auth.check().await {
        AuthDecision::Authorized(_) => next.run(request).await,
        AuthDecision::RedirectToLogin => login_required("login required"),
    }
}
