// Integration tests for the capture session state machine
//
// These tests drive the controller through record → preview → upload
// against a fake backend and check phases, resources and backend calls.

mod common;

use anyhow::Result;
use attendance_capture::config::DeviceKind;
use attendance_capture::{
    CaptureError, Config, DeviceError, DeviceGateway, LivePreview, Phase, ScriptedCamera,
    SessionController, SessionMetadata, TokenStore, TriggerError, TriggerOutcome, UploadError,
    UploadOutcome,
};
use axum::http::StatusCode;
use common::{controller, unreachable_backend, FakeBackend};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn metadata() -> SessionMetadata {
    SessionMetadata::new("T1", "B1")
}

#[tokio::test]
async fn test_blank_metadata_fails_validation_without_network() -> Result<()> {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![100]));
    let session = controller(camera, &backend.backend_config());

    session.start().await?;
    session.stop().await?;
    session.set_metadata(SessionMetadata::new("", "B1")).await?;

    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, CaptureError::Validation(ref v) if v.field == "subject_id"));
    assert_eq!(session.phase().await, Phase::Recorded);
    assert!(backend.uploads().is_empty());
    assert_eq!(backend.triggers(), 0);

    Ok(())
}

#[tokio::test]
async fn test_successful_upload_triggers_processing() -> Result<()> {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![1000, 500]));
    let session = controller(Arc::clone(&camera), &backend.backend_config());

    session.set_metadata(metadata()).await?;
    session.start().await?;
    assert_eq!(session.phase().await, Phase::Recording);

    let summary = session.stop().await?;
    assert_eq!(summary.size_bytes, 1500);
    assert_eq!(session.phase().await, Phase::Recorded);

    let receipt = session.submit().await?;

    assert_eq!(receipt.size_bytes, 1500);
    assert_eq!(receipt.trigger, TriggerOutcome::Accepted);
    assert_eq!(session.phase().await, Phase::Uploaded);

    let uploads = backend.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].id.as_deref(), Some("T1"));
    assert_eq!(uploads[0].batch.as_deref(), Some("B1"));
    assert_eq!(uploads[0].video_len, 1500);
    assert_eq!(backend.triggers(), 1);
    assert_eq!(backend.events(), vec!["upload", "trigger"]);

    let snapshot = session.snapshot().await;
    assert!(matches!(snapshot.upload, Some(UploadOutcome::Success { .. })));
    assert_eq!(snapshot.upload_attempts, 1);
    assert!(!snapshot.can_submit());

    Ok(())
}

#[tokio::test]
async fn test_failed_upload_keeps_artifact_for_retry() -> Result<()> {
    let backend = FakeBackend::start().await;
    backend.set_upload_status(StatusCode::INTERNAL_SERVER_ERROR);
    let camera = Arc::new(ScriptedCamera::new(vec![300, 200]));
    let session = controller(camera, &backend.backend_config());

    session.set_metadata(metadata()).await?;
    session.start().await?;
    session.stop().await?;
    let before = session.artifact().await.expect("artifact after stop");

    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, CaptureError::Upload(UploadError::Status(500))));
    assert_eq!(session.phase().await, Phase::UploadFailed);
    assert_eq!(backend.triggers(), 0, "trigger must not fire after a failed upload");

    let after = session.artifact().await.expect("artifact kept after failure");
    assert_eq!(after.id(), before.id());
    assert_eq!(after.data(), before.data());
    assert_eq!(session.metadata().await, metadata());

    let snapshot = session.snapshot().await;
    assert!(matches!(
        snapshot.upload,
        Some(UploadOutcome::Error { error: UploadError::Status(500) })
    ));
    assert!(snapshot.can_submit());

    // Retry with identical inputs once the backend recovers
    backend.set_upload_status(StatusCode::OK);
    let receipt = session.submit().await?;

    assert_eq!(receipt.size_bytes, 500);
    assert_eq!(session.phase().await, Phase::Uploaded);
    assert_eq!(backend.uploads().len(), 2);
    assert_eq!(backend.triggers(), 1);
    assert_eq!(session.snapshot().await.upload_attempts, 2);

    Ok(())
}

#[tokio::test]
async fn test_network_fault_is_upload_failure() -> Result<()> {
    let camera = Arc::new(ScriptedCamera::new(vec![10]));
    let session = controller(camera, &unreachable_backend());

    session.set_metadata(metadata()).await?;
    session.start().await?;
    session.stop().await?;

    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, CaptureError::Upload(UploadError::Network(_))));
    assert_eq!(session.phase().await, Phase::UploadFailed);
    assert!(session.artifact().await.is_some());

    Ok(())
}

#[tokio::test]
async fn test_permission_denied_leaves_session_idle() {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![10]).deny_permission());
    let session = controller(Arc::clone(&camera), &backend.backend_config());

    let err = session.start().await.unwrap_err();

    assert!(matches!(err, CaptureError::Device(DeviceError::PermissionDenied(_))));
    assert_eq!(session.phase().await, Phase::Idle);
    assert_eq!(camera.live_tracks(), 0);
    assert_eq!(*session.subscribe_live().borrow(), LivePreview::Unbound);
}

#[tokio::test]
async fn test_missing_camera_leaves_session_idle() {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![10]).without_device());
    let session = controller(camera, &backend.backend_config());

    let err = session.start().await.unwrap_err();

    assert!(matches!(err, CaptureError::Device(DeviceError::NoDevice(_))));
    assert_eq!(session.phase().await, Phase::Idle);
}

#[tokio::test]
async fn test_trigger_failure_does_not_undo_upload() -> Result<()> {
    let backend = FakeBackend::start().await;
    backend.set_trigger_status(StatusCode::NOT_FOUND);
    let camera = Arc::new(ScriptedCamera::new(vec![64]));
    let session = controller(camera, &backend.backend_config());

    session.set_metadata(metadata()).await?;
    session.start().await?;
    session.stop().await?;
    let receipt = session.submit().await?;

    assert_eq!(
        receipt.trigger,
        TriggerOutcome::Failed(TriggerError::Status(404))
    );
    assert_eq!(session.phase().await, Phase::Uploaded);
    assert_eq!(backend.uploads().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_submits_upload_once() -> Result<()> {
    let backend = FakeBackend::start().await;
    backend.set_upload_delay(Duration::from_millis(200));
    let camera = Arc::new(ScriptedCamera::new(vec![128]));
    let session = controller(camera, &backend.backend_config());

    session.set_metadata(metadata()).await?;
    session.start().await?;
    session.stop().await?;

    let (first, second) = tokio::join!(session.submit(), session.submit());

    let results = [first, second];
    let rejected = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(CaptureError::InvalidState {
                    phase: Phase::Uploading,
                    ..
                })
            )
        })
        .count();
    let succeeded = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 1);
    assert_eq!(backend.uploads().len(), 1);
    assert_eq!(backend.triggers(), 1);

    Ok(())
}

#[tokio::test]
async fn test_transitions_blocked_while_uploading() -> Result<()> {
    let backend = FakeBackend::start().await;
    backend.set_upload_delay(Duration::from_millis(300));
    let camera = Arc::new(ScriptedCamera::new(vec![128]));
    let session = controller(camera, &backend.backend_config());

    session.set_metadata(metadata()).await?;
    session.start().await?;
    session.stop().await?;

    let uploading = {
        let session = session.clone();
        tokio::spawn(async move { session.submit().await })
    };

    // Let the upload enter its network phase
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.phase().await, Phase::Uploading);

    for err in [
        session.start().await.unwrap_err(),
        session.reset().await.unwrap_err(),
        session.set_metadata(metadata()).await.unwrap_err(),
    ] {
        assert!(matches!(err, CaptureError::InvalidState { .. }));
    }

    uploading.await??;
    assert_eq!(session.phase().await, Phase::Uploaded);

    Ok(())
}

#[tokio::test]
async fn test_submit_after_upload_is_rejected() -> Result<()> {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![10]));
    let session = controller(camera, &backend.backend_config());

    session.set_metadata(metadata()).await?;
    session.start().await?;
    session.stop().await?;
    session.submit().await?;

    let err = session.submit().await.unwrap_err();

    assert!(matches!(
        err,
        CaptureError::InvalidState {
            phase: Phase::Uploaded,
            ..
        }
    ));
    assert_eq!(backend.uploads().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_reset_releases_everything() -> Result<()> {
    let backend = FakeBackend::start().await;
    backend.set_upload_status(StatusCode::BAD_GATEWAY);
    let camera = Arc::new(ScriptedCamera::new(vec![10, 20]));
    let session = controller(Arc::clone(&camera), &backend.backend_config());
    session.set_metadata(metadata()).await?;

    // From recorded
    session.start().await?;
    session.stop().await?;
    assert_eq!(session.previews().outstanding(), 1);
    session.reset().await?;
    assert_reset(&session, &camera).await;

    // From upload-failed
    session.start().await?;
    session.stop().await?;
    assert!(session.submit().await.is_err());
    assert_eq!(session.phase().await, Phase::UploadFailed);
    session.reset().await?;
    assert_reset(&session, &camera).await;

    // From uploaded
    backend.set_upload_status(StatusCode::OK);
    session.start().await?;
    session.stop().await?;
    session.submit().await?;
    session.reset().await?;
    assert_reset(&session, &camera).await;

    // Idle reset is a no-op
    session.reset().await?;
    assert_reset(&session, &camera).await;

    Ok(())
}

async fn assert_reset(
    session: &attendance_capture::SessionController,
    camera: &ScriptedCamera,
) {
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.artifact.is_none());
    assert!(snapshot.preview.is_none());
    assert!(snapshot.upload.is_none());
    assert_eq!(snapshot.live, LivePreview::Unbound);
    assert_eq!(session.previews().outstanding(), 0);
    assert_eq!(camera.live_tracks(), 0);
}

#[tokio::test]
async fn test_new_recording_discards_previous_take() -> Result<()> {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![10]));
    let session = controller(Arc::clone(&camera), &backend.backend_config());

    session.start().await?;
    session.stop().await?;
    let first = session.snapshot().await.preview.expect("preview after stop");

    session.start().await?;
    assert!(session.previews().resolve(first.id).is_none());
    assert_eq!(session.previews().outstanding(), 0);
    assert!(session.artifact().await.is_none());

    session.stop().await?;
    let second = session.snapshot().await.preview.expect("preview after stop");
    assert_ne!(first.id, second.id);
    assert_eq!(session.previews().outstanding(), 1);
    assert_eq!(camera.acquisitions(), 2);
    assert_eq!(camera.live_tracks(), 0);

    Ok(())
}

#[tokio::test]
async fn test_live_preview_follows_recording() -> Result<()> {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![10]));
    let session = controller(Arc::clone(&camera), &backend.backend_config());
    let live = session.subscribe_live();

    session.start().await?;
    assert!(matches!(*live.borrow(), LivePreview::Bound { .. }));
    assert_eq!(camera.live_tracks(), 1);

    session.stop().await?;
    assert_eq!(*live.borrow(), LivePreview::Unbound);
    assert_eq!(camera.live_tracks(), 0);

    Ok(())
}

#[tokio::test]
async fn test_out_of_order_events_are_invalid_state() -> Result<()> {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![10]));
    let session = controller(camera, &backend.backend_config());
    session.set_metadata(metadata()).await?;

    assert!(matches!(
        session.stop().await,
        Err(CaptureError::InvalidState { phase: Phase::Idle, .. })
    ));
    assert!(matches!(
        session.submit().await,
        Err(CaptureError::InvalidState { phase: Phase::Idle, .. })
    ));

    session.start().await?;
    assert!(matches!(
        session.start().await,
        Err(CaptureError::InvalidState { phase: Phase::Recording, .. })
    ));
    assert!(matches!(
        session.submit().await,
        Err(CaptureError::InvalidState { phase: Phase::Recording, .. })
    ));
    assert!(matches!(
        session.reset().await,
        Err(CaptureError::InvalidState { phase: Phase::Recording, .. })
    ));
    assert_eq!(session.phase().await, Phase::Recording);

    Ok(())
}

#[tokio::test]
async fn test_drop_releases_held_stream() -> Result<()> {
    let backend = FakeBackend::start().await;
    let camera = Arc::new(ScriptedCamera::new(vec![10]));
    let session = controller(Arc::clone(&camera), &backend.backend_config());

    session.start().await?;
    assert_eq!(camera.live_tracks(), 1);

    drop(session);
    assert_eq!(camera.live_tracks(), 0);
    assert_eq!(camera.live_view().current(), LivePreview::Unbound);

    Ok(())
}

#[tokio::test]
async fn test_configured_controller_always_uploads_mp4() -> Result<()> {
    let backend = FakeBackend::start().await;
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("capture.toml");
    // A leftover recorder section must not change what goes on the wire
    std::fs::write(
        &path,
        format!(
            "[backend]\nbase_url = \"{}\"\n\n[recorder]\ncontent_type = \"video/webm\"\n\n[device]\nkind = \"scripted\"\nscripted_chunks = [300, 200]\n",
            backend.base_url()
        ),
    )?;
    let config = Config::load(path.with_extension("").to_str().unwrap())?;

    let session = SessionController::from_config(&config, TokenStore::new())?;
    session.set_metadata(metadata()).await?;
    session.start().await?;
    let artifact = session.stop().await?;
    session.submit().await?;

    assert_eq!(artifact.size_bytes, 500);
    assert_eq!(artifact.content_type, "video/mp4");
    let uploads = backend.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].video_content_type.as_deref(), Some("video/mp4"));
    assert_eq!(uploads[0].video_len, 500);

    Ok(())
}

#[tokio::test]
async fn test_file_device_without_path_is_rejected() {
    let mut config = Config::default();
    config.device.kind = DeviceKind::File;
    config.device.path = None;

    assert!(SessionController::from_config(&config, TokenStore::new()).is_err());
}
