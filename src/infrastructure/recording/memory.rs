//! In-process capture backend
//!
//! Needs no hardware: a recording is the span between `start` and `stop`,
//! rendered as silence into a real FLAC artifact. Used by the replay harness
//! and for exercising the controller end to end. A capture whose artifact
//! could not be written is kept until a later `stop` writes it or the next
//! `start` replaces it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use super::artifact_file;
use super::flac_encoder::TARGET_SAMPLE_RATE;
use super::pcm::silence;
use crate::application::ports::{NativeAudio, NativeAudioError};
use crate::domain::recording::ArtifactRef;

/// Simulated microphone
pub struct MemoryAudio {
    recordings_dir: PathBuf,
    permission: bool,
    started: StdMutex<Option<Instant>>,
    unwritten: StdMutex<Option<u64>>,
    starts: AtomicU32,
    stops: AtomicU32,
    deletes: AtomicU32,
}

impl MemoryAudio {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            permission: true,
            started: StdMutex::new(None),
            unwritten: StdMutex::new(None),
            starts: AtomicU32::new(0),
            stops: AtomicU32::new(0),
            deletes: AtomicU32::new(0),
        }
    }

    /// Simulate a platform that refuses microphone access
    pub fn with_permission(mut self, granted: bool) -> Self {
        self.permission = granted;
        self
    }

    pub fn is_open(&self) -> bool {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NativeAudio for MemoryAudio {
    async fn request_permission(&self) -> Result<bool, NativeAudioError> {
        Ok(self.permission)
    }

    async fn start(&self) -> Result<(), NativeAudioError> {
        let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        if started.is_some() {
            return Err(NativeAudioError::DeviceBusy);
        }
        *started = Some(Instant::now());
        *self.unwritten.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<Option<ArtifactRef>, NativeAudioError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let millis = {
            let started = self
                .started
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            let mut unwritten = self.unwritten.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(started) = started {
                *unwritten = Some(started.elapsed().as_millis() as u64);
            }
            *unwritten
        };
        let Some(millis) = millis else {
            return Ok(None);
        };
        if millis == 0 {
            debug!("simulated recording was empty");
            *self.unwritten.lock().unwrap_or_else(PoisonError::into_inner) = None;
            return Ok(None);
        }

        let artifact =
            artifact_file::write_flac(&self.recordings_dir, silence(millis), TARGET_SAMPLE_RATE)
                .await?;
        *self.unwritten.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(Some(artifact))
    }

    async fn delete(&self, artifact: &ArtifactRef) -> Result<(), NativeAudioError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        artifact_file::remove(artifact).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn start_stop_produces_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let audio = MemoryAudio::new(dir.path());

        audio.start().await.unwrap();
        assert!(audio.is_open());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let artifact = audio.stop().await.unwrap().unwrap();
        assert!(!audio.is_open());
        assert!(artifact.path().exists());

        audio.delete(&artifact).await.unwrap();
        assert!(!artifact.path().exists());
        assert_eq!((audio.starts(), audio.stops(), audio.deletes()), (1, 1, 1));
    }

    #[tokio::test]
    async fn second_start_is_busy() {
        let audio = MemoryAudio::new(std::env::temp_dir());
        audio.start().await.unwrap();
        assert!(matches!(
            audio.start().await,
            Err(NativeAudioError::DeviceBusy)
        ));
    }

    #[tokio::test]
    async fn stop_when_closed_captures_nothing() {
        let audio = MemoryAudio::new(std::env::temp_dir());
        assert_eq!(audio.stop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_write_is_retried_on_next_stop() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let audio = MemoryAudio::new(blocker.join("recordings"));

        audio.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(
            audio.stop().await,
            Err(NativeAudioError::StopFailed(_))
        ));
        assert!(!audio.is_open());
        // the capture survives the failure
        assert!(matches!(
            audio.stop().await,
            Err(NativeAudioError::StopFailed(_))
        ));

        std::fs::remove_file(&blocker).unwrap();
        let artifact = audio.stop().await.unwrap().unwrap();
        assert!(artifact.path().exists());
        assert_eq!(audio.stop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn start_drops_an_unwritten_capture() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let audio = MemoryAudio::new(blocker.join("recordings"));

        audio.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(audio.stop().await.is_err());

        audio.start().await.unwrap();
        std::fs::remove_file(&blocker).unwrap();
        assert!(audio.stop().await.unwrap().is_some());
        assert_eq!(audio.stop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn permission_can_be_refused() {
        let audio = MemoryAudio::new(std::env::temp_dir()).with_permission(false);
        assert!(!audio.request_permission().await.unwrap());
    }
}
