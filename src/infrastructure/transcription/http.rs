//! HTTP transcription backend adapter
//!
//! Uploads the artifact as multipart field `audio` and reads back
//! `{"transcript": "..."}`. Failures come back as `{"error", "code"}`.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::{Transcriber, TranscriptionError};
use crate::domain::recording::ArtifactRef;

/// Error code the backend uses when the audio contained no speech
const NO_SPEECH_CODE: &str = "NO_SPEECH";

const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    code: Option<String>,
}

/// Transcriber backed by a `POST /transcribe` endpoint
pub struct HttpTranscriber {
    url: String,
    client: reqwest::Client,
}

impl HttpTranscriber {
    /// Create a transcriber posting to the full endpoint URL.
    /// Fails when the HTTP client cannot be set up (e.g. no TLS backend).
    pub fn new(url: impl Into<String>) -> Result<Self, TranscriptionError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| {
                TranscriptionError::RequestFailed(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn build_form(artifact: &ArtifactRef) -> Result<Form, TranscriptionError> {
        let bytes = tokio::fs::read(artifact.path()).await.map_err(|e| {
            TranscriptionError::ArtifactUnreadable(format!("{}: {}", artifact.path().display(), e))
        })?;
        let part = Part::bytes(bytes)
            .file_name(artifact.file_name())
            .mime_str(artifact.mime_type().as_str())
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;
        Ok(Form::new().part("audio", part))
    }

    fn rejection(status: StatusCode, body: &str) -> TranscriptionError {
        let parsed: Option<ErrorResponse> = serde_json::from_str(body).ok();
        let (message, code) = match parsed {
            Some(ErrorResponse { error, code }) => (error, code),
            None => (None, None),
        };

        if code.as_deref() == Some(NO_SPEECH_CODE) {
            return TranscriptionError::NoSpeech;
        }

        TranscriptionError::Rejected {
            code: code.unwrap_or_else(|| format!("HTTP_{}", status.as_u16())),
            message: message.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            }),
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, artifact: &ArtifactRef) -> Result<String, TranscriptionError> {
        let form = Self::build_form(artifact).await?;
        debug!(url = %self.url, size = %artifact.human_readable_size(), "uploading recording");

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::rejection(status, &body));
        }

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

        let text = body.transcript.ok_or(TranscriptionError::EmptyResponse)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TranscriptionError::NoSpeech);
        }
        Ok(trimmed.to_string())
    }
}
