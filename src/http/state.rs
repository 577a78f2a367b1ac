use crate::auth::AuthGuard;
use crate::session::SessionController;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The capture session driven by this server
    pub controller: SessionController,
    /// Token check in front of every session route
    pub auth: AuthGuard,
}

impl AppState {
    pub fn new(controller: SessionController, auth: AuthGuard) -> Self {
        Self { controller, auth }
    }
}
