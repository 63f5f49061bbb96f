//! Placeholder transcriber used when no backend is configured

use std::time::Duration as StdDuration;

use async_trait::async_trait;

use crate::application::ports::{Transcriber, TranscriptionError};
use crate::domain::recording::ArtifactRef;

/// Simulated processing time
pub const DEFAULT_PLACEHOLDER_DELAY: StdDuration = StdDuration::from_secs(2);

/// Text returned for every recording
pub const PLACEHOLDER_TEXT: &str = "This is a placeholder transcription of your voice message.";

/// Resolves after a fixed delay with fixed text
#[derive(Debug, Clone)]
pub struct PlaceholderTranscriber {
    delay: StdDuration,
    text: String,
}

impl PlaceholderTranscriber {
    pub fn new() -> Self {
        Self::with_delay(DEFAULT_PLACEHOLDER_DELAY)
    }

    pub fn with_delay(delay: StdDuration) -> Self {
        Self {
            delay,
            text: PLACEHOLDER_TEXT.to_string(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

impl Default for PlaceholderTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for PlaceholderTranscriber {
    async fn transcribe(&self, _artifact: &ArtifactRef) -> Result<String, TranscriptionError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.text.clone())
    }
}
