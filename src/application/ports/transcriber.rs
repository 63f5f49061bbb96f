//! Transcription port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::ArtifactRef;

/// Transcription errors
#[derive(Debug, Clone, Error)]
pub enum TranscriptionError {
    #[error("Could not read recording: {0}")]
    ArtifactUnreadable(String),

    #[error("Transcription request failed: {0}")]
    RequestFailed(String),

    #[error("Could not transcribe audio - no speech detected")]
    NoSpeech,

    #[error("Transcription rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Failed to parse transcription response: {0}")]
    ParseError(String),

    #[error("Empty transcription response")]
    EmptyResponse,
}

/// Port for speech-to-text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a captured recording to text.
    ///
    /// # Arguments
    /// * `artifact` - The finalized recording
    ///
    /// # Returns
    /// The recognized text or an error
    async fn transcribe(&self, artifact: &ArtifactRef) -> Result<String, TranscriptionError>;
}

/// Blanket implementation for boxed transcriber types
#[async_trait]
impl Transcriber for Box<dyn Transcriber> {
    async fn transcribe(&self, artifact: &ArtifactRef) -> Result<String, TranscriptionError> {
        self.as_ref().transcribe(artifact).await
    }
}
