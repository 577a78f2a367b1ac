use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Attendance backend endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    #[serde(default = "default_trigger_path")]
    pub trigger_path: String,
    #[serde(default = "default_auth_me_path")]
    pub auth_me_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Whole-request timeout for each backend call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Join `path` onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    File,
    Scripted,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_kind")]
    pub kind: DeviceKind,
    /// Source file for the file camera
    pub path: Option<PathBuf>,
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: u64,
    /// Chunk sizes emitted by the scripted camera
    #[serde(default)]
    pub scripted_chunks: Vec<usize>,
}

impl Config {
    /// Load `path` (any extension the `config` crate knows, optional) with
    /// `ATTENDANCE__SECTION__KEY` environment overrides on top.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ATTENDANCE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            upload_path: default_upload_path(),
            trigger_path: default_trigger_path(),
            auth_me_path: default_auth_me_path(),
            login_path: default_login_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: default_device_kind(),
            path: None,
            chunk_bytes: default_chunk_bytes(),
            chunk_interval_ms: default_chunk_interval_ms(),
            scripted_chunks: Vec::new(),
        }
    }
}

fn default_service_name() -> String {
    "attendance-capture".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5173
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_upload_path() -> String {
    "/video".to_string()
}

fn default_trigger_path() -> String {
    "/flow/".to_string()
}

fn default_auth_me_path() -> String {
    "/auth/me".to_string()
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_device_kind() -> DeviceKind {
    DeviceKind::File
}

fn default_chunk_bytes() -> usize {
    64 * 1024
}

fn default_chunk_interval_ms() -> u64 {
    250
}
