use anyhow::{bail, Context, Result};
use attendance_capture::config::DeviceKind;
use attendance_capture::{
    create_router, AppState, AuthDecision, AuthGuard, Config, SessionController, SessionMetadata,
    TokenStore,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "attendance-capture", version, about = "Record and upload attendance videos")]
struct Cli {
    /// Config file, without extension
    #[arg(long, default_value = "config/attendance-capture")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the local control API
    Serve,
    /// Record from the configured device and upload in one go
    Capture {
        /// Teacher/subject ID sent as `id`
        #[arg(long)]
        subject: String,
        /// Batch sent as `batch`
        #[arg(long)]
        batch: String,
        /// Replay this MP4 file as the camera
        #[arg(long)]
        source: Option<PathBuf>,
        /// How long to record before stopping
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        /// Log in before uploading
        #[arg(long, requires = "password")]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attendance_capture=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;

    info!("Attendance capture v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}", cfg.backend.base_url);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Capture {
            subject,
            batch,
            source,
            seconds,
            username,
            password,
        } => {
            if let Some(source) = source {
                cfg.device.kind = DeviceKind::File;
                cfg.device.path = Some(source);
            }
            let credentials = username.zip(password);
            capture(cfg, SessionMetadata::new(subject, batch), seconds, credentials).await
        }
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let tokens = TokenStore::new();
    let auth = AuthGuard::new(&cfg.backend, tokens.clone())?;
    let controller = SessionController::from_config(&cfg, tokens)?;
    let app = create_router(AppState::new(controller, auth));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} listening on http://{}", cfg.service.name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")
}

async fn capture(
    cfg: Config,
    metadata: SessionMetadata,
    seconds: u64,
    credentials: Option<(String, String)>,
) -> Result<()> {
    let tokens = TokenStore::new();

    if let Some((username, password)) = credentials {
        let guard = AuthGuard::new(&cfg.backend, tokens.clone())?;
        guard.login(&username, &password).await?;
        if guard.check().await == AuthDecision::RedirectToLogin {
            bail!("Backend rejected the access token; log in again");
        }
    }

    let controller = SessionController::from_config(&cfg, tokens)?;
    controller.set_metadata(metadata).await?;

    let mut live = controller.subscribe_live();
    tokio::spawn(async move {
        while live.changed().await.is_ok() {
            info!(live = ?*live.borrow(), "Live preview changed");
        }
    });

    controller.start().await?;
    info!("Recording for {}s (Ctrl-C to stop early)", seconds);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("Stopping early"),
    }

    let artifact = controller.stop().await?;
    info!(
        "Recorded {} bytes in {} chunks",
        artifact.size_bytes, artifact.chunk_count
    );

    let receipt = controller.submit().await?;
    if receipt.trigger.is_accepted() {
        info!("Upload complete, processing attendance");
    } else {
        warn!("Upload stored but processing was not started: {:?}", receipt.trigger);
    }

    Ok(())
}
