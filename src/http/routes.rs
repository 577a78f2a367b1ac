use super::guard::require_login;
use super::handlers;
use super::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    // Everything that touches the camera or the artifact needs a valid token
    let protected = Router::new()
        .route("/session", get(handlers::get_session))
        .route("/session/start", post(handlers::start_recording))
        .route("/session/stop", post(handlers::stop_recording))
        .route("/session/metadata", put(handlers::update_metadata))
        .route("/session/upload", post(handlers::upload))
        .route("/session/reset", post(handlers::reset))
        .route("/previews/:id", get(handlers::get_preview))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Login surface
        .route("/auth/login", post(handlers::login))
        .route("/auth/me", get(handlers::current_user))
        .route("/auth/logout", post(handlers::logout))
        .merge(protected)
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
