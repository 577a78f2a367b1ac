use super::messages::{
    TriggerOutcome, UploadReceipt, FIELD_BATCH, FIELD_ID, FIELD_VIDEO, VIDEO_FILE_NAME,
};
use crate::auth::TokenStore;
use crate::capture::Artifact;
use crate::config::BackendConfig;
use crate::error::{CaptureResult, TriggerError, UploadError};
use crate::session::SessionMetadata;
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, RequestBuilder, StatusCode};
use tracing::{debug, info, instrument, warn};

/// Uploads a finished artifact and asks the backend to start processing it
pub struct UploadPipeline {
    client: reqwest::Client,
    upload_url: String,
    trigger_url: String,
    tokens: TokenStore,
}

impl UploadPipeline {
    pub fn new(backend: &BackendConfig, tokens: TokenStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(backend.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            upload_url: backend.endpoint(&backend.upload_path),
            trigger_url: backend.endpoint(&backend.trigger_path),
            tokens,
        })
    }

    /// Validate, upload, then trigger processing
    ///
    /// Fails fast with a validation error before touching the network. An
    /// upload failure leaves the artifact untouched so the caller can retry
    /// with the same inputs. The trigger only runs after the upload returned
    /// 200, and its result never undoes the stored upload.
    #[instrument(skip_all, fields(artifact_id = %artifact.id(), size_bytes = artifact.len()))]
    pub async fn submit(
        &self,
        metadata: &SessionMetadata,
        artifact: &Artifact,
    ) -> CaptureResult<UploadReceipt> {
        metadata.validate()?;

        self.upload(metadata, artifact).await?;
        let trigger = self.trigger().await;

        Ok(UploadReceipt {
            size_bytes: artifact.len(),
            uploaded_at: Utc::now(),
            trigger,
        })
    }

    async fn upload(&self, metadata: &SessionMetadata, artifact: &Artifact) -> Result<(), UploadError> {
        let form = Self::form(metadata, artifact)?;

        debug!(url = %self.upload_url, "Uploading artifact");

        let response = self
            .authorize(self.client.post(&self.upload_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Upload rejected");
            return Err(UploadError::Status(status.as_u16()));
        }

        info!(
            subject_id = %metadata.subject_id,
            batch_id = %metadata.batch_id,
            "Artifact uploaded"
        );
        Ok(())
    }

    async fn trigger(&self) -> TriggerOutcome {
        let response = self
            .authorize(self.client.post(&self.trigger_url))
            .send()
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::OK => {
                info!("Processing accepted");
                TriggerOutcome::Accepted
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(status, "Processing trigger rejected");
                TriggerOutcome::Failed(TriggerError::Status(status))
            }
            Err(e) => {
                warn!("Processing trigger failed: {}", e);
                TriggerOutcome::Failed(TriggerError::Network(e.to_string()))
            }
        }
    }

    fn form(metadata: &SessionMetadata, artifact: &Artifact) -> Result<Form, UploadError> {
        let video = Part::stream_with_length(Body::from(artifact.data()), artifact.len() as u64)
            .file_name(VIDEO_FILE_NAME)
            .mime_str(artifact.content_type())
            .map_err(|e| UploadError::Network(format!("invalid content type: {}", e)))?;

        Ok(Form::new()
            .text(FIELD_ID, metadata.subject_id.clone())
            .text(FIELD_BATCH, metadata.batch_id.clone())
            .part(FIELD_VIDEO, video))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}
