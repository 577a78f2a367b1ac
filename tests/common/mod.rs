// Shared fixtures for integration tests: a fake attendance backend and
// controller builders wired to it.
#![allow(dead_code)]

use attendance_capture::config::BackendConfig;
use attendance_capture::{
    DeviceGateway, PreviewManager, ScriptedCamera, SessionController, TokenStore, UploadPipeline,
};
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub const VALID_TOKEN: &str = "valid-token";

#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub id: Option<String>,
    pub batch: Option<String>,
    pub video_len: usize,
    pub video_file_name: Option<String>,
    pub video_content_type: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Debug)]
struct Inner {
    upload_status: StatusCode,
    trigger_status: StatusCode,
    upload_delay: Duration,
    uploads: Vec<ReceivedUpload>,
    triggers: usize,
    events: Vec<&'static str>,
}

/// Scriptable stand-in for the attendance backend
#[derive(Clone)]
pub struct FakeBackend {
    pub addr: SocketAddr,
    inner: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            upload_status: StatusCode::OK,
            trigger_status: StatusCode::OK,
            upload_delay: Duration::ZERO,
            uploads: Vec::new(),
            triggers: 0,
            events: Vec::new(),
        }));

        let app = Router::new()
            .route("/video", post(upload))
            .route("/flow/", post(trigger))
            .route("/auth/me", get(me))
            .route("/auth/login", post(login))
            .with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, inner }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url(),
            timeout_secs: 10,
            ..BackendConfig::default()
        }
    }

    pub fn set_upload_status(&self, status: StatusCode) {
        self.inner.lock().upload_status = status;
    }

    pub fn set_trigger_status(&self, status: StatusCode) {
        self.inner.lock().trigger_status = status;
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.inner.lock().upload_delay = delay;
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.inner.lock().uploads.clone()
    }

    pub fn triggers(&self) -> usize {
        self.inner.lock().triggers
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.inner.lock().events.clone()
    }
}

async fn upload(
    State(inner): State<Arc<Mutex<Inner>>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut received = ReceivedUpload {
        id: None,
        batch: None,
        video_len: 0,
        video_file_name: None,
        video_content_type: None,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "id" => received.id = Some(field.text().await.unwrap()),
            "batch" => received.batch = Some(field.text().await.unwrap()),
            "video" => {
                received.video_file_name = field.file_name().map(str::to_string);
                received.video_content_type = field.content_type().map(str::to_string);
                received.video_len = field.bytes().await.unwrap().len();
            }
            _ => {}
        }
    }

    let delay = inner.lock().upload_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut inner = inner.lock();
    inner.uploads.push(received);
    inner.events.push("upload");
    (inner.upload_status, "upload")
}

async fn trigger(State(inner): State<Arc<Mutex<Inner>>>) -> impl IntoResponse {
    let mut inner = inner.lock();
    inner.triggers += 1;
    inner.events.push("trigger");
    (inner.trigger_status, "trigger")
}

async fn me(headers: HeaderMap) -> impl IntoResponse {
    let expected = format!("Bearer {}", VALID_TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => (
            StatusCode::OK,
            Json(serde_json::json!({ "username": "ada", "teacher_id": "T1" })),
        )
            .into_response(),
        _ => (StatusCode::UNAUTHORIZED, "invalid token").into_response(),
    }
}

async fn login(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    if body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "access_token": VALID_TOKEN, "token_type": "bearer" })),
        )
            .into_response()
    } else {
        (StatusCode::BAD_REQUEST, "Invalid password").into_response()
    }
}

/// Controller wired to a scripted camera and the given backend
pub fn controller(camera: Arc<ScriptedCamera>, backend: &BackendConfig) -> SessionController {
    controller_with_tokens(camera, backend, TokenStore::new())
}

/// Same, sharing `tokens` with whoever logs in
pub fn controller_with_tokens(
    camera: Arc<ScriptedCamera>,
    backend: &BackendConfig,
    tokens: TokenStore,
) -> SessionController {
    let device: Arc<dyn DeviceGateway> = camera;
    let uploader = UploadPipeline::new(backend, tokens).unwrap();
    SessionController::new(device, PreviewManager::new(), uploader)
}

/// Backend config pointing at a port nothing listens on
pub fn unreachable_backend() -> BackendConfig {
    BackendConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 5,
        ..BackendConfig::default()
    }
}
