//! Native audio port interface
//!
//! The lowest layer of capture: one exclusive hardware input stream, the
//! platform permission that guards it, and the on-disk artifacts it writes.
//! Only the resource gateway talks to this port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::ArtifactRef;

/// Native audio errors
#[derive(Debug, Clone, Error)]
pub enum NativeAudioError {
    #[error("Could not query microphone permission: {0}")]
    PermissionQuery(String),

    #[error("Audio input is busy")]
    DeviceBusy,

    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Failed to start recording: {0}")]
    StartFailed(String),

    #[error("Failed to stop recording: {0}")]
    StopFailed(String),

    #[error("Failed to delete recording: {0}")]
    DeleteFailed(String),
}

/// Port for the platform's recording subsystem
#[async_trait]
pub trait NativeAudio: Send + Sync {
    /// Ask the platform for microphone access. May prompt the user.
    async fn request_permission(&self) -> Result<bool, NativeAudioError>;

    /// Open the input stream and begin capturing.
    async fn start(&self) -> Result<(), NativeAudioError>;

    /// Close the input stream and persist what was captured.
    ///
    /// # Returns
    /// The artifact, or `None` when nothing was captured
    async fn stop(&self) -> Result<Option<ArtifactRef>, NativeAudioError>;

    /// Remove a persisted artifact. Deleting a missing artifact succeeds.
    async fn delete(&self, artifact: &ArtifactRef) -> Result<(), NativeAudioError>;
}

/// Blanket implementation for boxed native audio backends
#[async_trait]
impl NativeAudio for Box<dyn NativeAudio> {
    async fn request_permission(&self) -> Result<bool, NativeAudioError> {
        self.as_ref().request_permission().await
    }

    async fn start(&self) -> Result<(), NativeAudioError> {
        self.as_ref().start().await
    }

    async fn stop(&self) -> Result<Option<ArtifactRef>, NativeAudioError> {
        self.as_ref().stop().await
    }

    async fn delete(&self, artifact: &ArtifactRef) -> Result<(), NativeAudioError> {
        self.as_ref().delete(artifact).await
    }
}
