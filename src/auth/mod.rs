//! Client side of the bearer-token route guard
//!
//! Tokens are issued and validated by the backend; this module only caches
//! the token in memory, attaches it to requests, and decides whether the
//! caller must be sent back to the login surface.

use crate::config::BackendConfig;
use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// In-memory access token cache shared by every backend client
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn clear(&self) {
        self.token.write().take();
    }

    pub fn is_present(&self) -> bool {
        self.token.read().is_some()
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Identity reported by the token validation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
    pub teacher_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Token accepted. The identity is absent if the body was not recognised.
    Authorized(Option<CurrentUser>),
    RedirectToLogin,
}

#[derive(Clone)]
pub struct AuthGuard {
    client: reqwest::Client,
    me_url: String,
    login_url: String,
    tokens: TokenStore,
}

impl AuthGuard {
    pub fn new(backend: &BackendConfig, tokens: TokenStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(backend.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            me_url: backend.endpoint(&backend.auth_me_path),
            login_url: backend.endpoint(&backend.login_path),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Exchange credentials for an access token and cache it
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.login_url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .context("Failed to reach login endpoint")?;

        if !response.status().is_success() {
            bail!("Login rejected with HTTP {}", response.status().as_u16());
        }

        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        self.tokens.set(body.access_token);
        info!(username, "Logged in");
        Ok(())
    }

    /// Validate the cached token. Any failure discards it.
    pub async fn check(&self) -> AuthDecision {
        let Some(token) = self.tokens.get() else {
            info!("No access token cached");
            return AuthDecision::RedirectToLogin;
        };

        let response = match self.client.get(&self.me_url).bearer_auth(&token).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Token validation request failed: {}", e);
                self.tokens.clear();
                return AuthDecision::RedirectToLogin;
            }
        };

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Token rejected");
            self.tokens.clear();
            return AuthDecision::RedirectToLogin;
        }

        let user = response.json::<CurrentUser>().await.ok();
        AuthDecision::Authorized(user)
    }
}
