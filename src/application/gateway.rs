//! Resource gateway
//!
//! Sole owner of the microphone permission state and of the native recording
//! resource. Every operation that touches the resource runs under one lock,
//! so at most one native stream is ever open, and every exit path (finalize,
//! discard, stale abort) marks the handle released even when the native stop
//! call fails.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::recording::{ArtifactRef, RecordingHandle};
use crate::domain::session::SessionId;

use super::ports::{NativeAudio, NativeAudioError};

/// Why a recording could not be started. Surfaced to the user.
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    #[error("Microphone permission not granted")]
    PermissionDenied,

    #[error("Recording handle {0} is still held")]
    HandleAlreadyHeld(RecordingHandle),

    #[error("Acquisition superseded by a newer press")]
    Superseded,

    #[error("Recording hardware unavailable: {0}")]
    Hardware(String),
}

impl AcquisitionError {
    /// Permission problems get a different notice than hardware problems
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// A native stop/delete that failed on both attempts. Never leaves the gateway
/// as an error path of its own; it is logged and the handle released anyway.
#[derive(Debug, Clone, Error)]
#[error("Failed to {operation} {target}: {source}")]
pub struct ReleaseError {
    pub target: String,
    pub operation: &'static str,
    pub source: NativeAudioError,
}

/// Why finalize produced no artifact. The handle is released either way.
#[derive(Debug, Clone, Error)]
pub enum FinalizeError {
    #[error("Recording handle {0} is not held")]
    NotHeld(RecordingHandle),

    #[error("No recording data was captured")]
    NoArtifact,
}

/// Gateway over one native audio backend
pub struct ResourceGateway<N: NativeAudio> {
    native: N,
    permission: Mutex<Option<bool>>,
    slot: Mutex<Option<RecordingHandle>>,
    // Mirror of `slot` readable without awaiting; 0 means nothing held
    held: AtomicU64,
    claimed: AtomicU64,
    next_handle: AtomicU64,
}

impl<N: NativeAudio> ResourceGateway<N> {
    /// Create a gateway owning the given backend
    pub fn new(native: N) -> Self {
        Self {
            native,
            permission: Mutex::new(None),
            slot: Mutex::new(None),
            held: AtomicU64::new(0),
            claimed: AtomicU64::new(SessionId::NONE.get()),
            next_handle: AtomicU64::new(0),
        }
    }

    /// Access the backend
    pub fn native(&self) -> &N {
        &self.native
    }

    /// Request microphone permission once and cache the outcome.
    /// Platform errors fail closed and are cached as "not granted".
    pub async fn ensure_permission(&self) -> bool {
        let mut cached = self.permission.lock().await;
        if let Some(granted) = *cached {
            return granted;
        }
        let granted = match self.native.request_permission().await {
            Ok(granted) => granted,
            Err(e) => {
                warn!(error = %e, "permission request failed; treating as denied");
                false
            }
        };
        debug!(granted, "microphone permission resolved");
        *cached = Some(granted);
        granted
    }

    /// Drop the cached permission and ask the platform again
    pub async fn recheck_permission(&self) -> bool {
        *self.permission.lock().await = None;
        self.ensure_permission().await
    }

    /// Cached permission outcome, if one has been requested
    pub async fn cached_permission(&self) -> Option<bool> {
        *self.permission.lock().await
    }

    /// Record the newest accepted session. Acquires issued for any other
    /// session are refused from now on.
    pub fn claim(&self, session: SessionId) {
        self.claimed.store(session.get(), Ordering::SeqCst);
    }

    /// The handle currently held, if any
    pub fn active_handle(&self) -> Option<RecordingHandle> {
        match self.held.load(Ordering::SeqCst) {
            0 => None,
            id => Some(RecordingHandle::new(id)),
        }
    }

    pub fn holds_handle(&self) -> bool {
        self.active_handle().is_some()
    }

    /// Open the native recording resource for `session`.
    ///
    /// Fails when permission has not been granted, when the session has been
    /// superseded, when a handle is still held, or when the hardware refuses.
    pub async fn acquire(&self, session: SessionId) -> Result<RecordingHandle, AcquisitionError> {
        if *self.permission.lock().await != Some(true) {
            return Err(AcquisitionError::PermissionDenied);
        }

        let mut slot = self.slot.lock().await;
        if self.claimed.load(Ordering::SeqCst) != session.get() {
            debug!(%session, "acquire superseded by a newer press");
            return Err(AcquisitionError::Superseded);
        }
        if let Some(held) = *slot {
            return Err(AcquisitionError::HandleAlreadyHeld(held));
        }

        self.native
            .start()
            .await
            .map_err(|e| AcquisitionError::Hardware(e.to_string()))?;

        let handle = RecordingHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        *slot = Some(handle);
        self.held.store(handle.id(), Ordering::SeqCst);
        info!(%session, %handle, "recording resource acquired");
        Ok(handle)
    }

    /// Stop the recording and return its artifact.
    ///
    /// The handle is released even when stopping fails twice.
    pub async fn finalize(&self, handle: RecordingHandle) -> Result<ArtifactRef, FinalizeError> {
        let mut slot = self.slot.lock().await;
        if *slot != Some(handle) {
            debug!(%handle, "finalize on a released handle ignored");
            return Err(FinalizeError::NotHeld(handle));
        }

        let stopped = self.stop_with_retry(handle).await;
        self.release(&mut slot, handle);

        match stopped {
            Ok(Some(artifact)) => {
                info!(%handle, artifact = %artifact, "recording finalized");
                Ok(artifact)
            }
            Ok(None) => Err(FinalizeError::NoArtifact),
            Err(e) => {
                warn!(error = %e, "giving up on stop; handle released without artifact");
                Err(FinalizeError::NoArtifact)
            }
        }
    }

    /// Stop the recording and delete whatever it captured.
    /// Discarding a released handle is a logged no-op.
    pub async fn discard(&self, handle: RecordingHandle) {
        let mut slot = self.slot.lock().await;
        if *slot != Some(handle) {
            debug!(%handle, "discard on a released handle ignored");
            return;
        }
        self.discard_locked(&mut slot, handle).await;
    }

    /// Discard whatever handle is held, regardless of which session owns it.
    /// Used before acquiring for a press that found a stale session. Does
    /// nothing unless `session` still holds the claim.
    pub async fn abort_active(&self, session: SessionId) -> Option<RecordingHandle> {
        let mut slot = self.slot.lock().await;
        if self.claimed.load(Ordering::SeqCst) != session.get() {
            return None;
        }
        let Some(handle) = *slot else {
            return None;
        };
        info!(%session, %handle, "aborting stale recording");
        self.discard_locked(&mut slot, handle).await;
        Some(handle)
    }

    /// Delete a finalized artifact once it has been consumed
    pub async fn dispose(&self, artifact: &ArtifactRef) {
        if let Err(e) = self.delete_with_retry(artifact).await {
            warn!(error = %e, "could not delete consumed recording");
        }
    }

    async fn discard_locked(&self, slot: &mut Option<RecordingHandle>, handle: RecordingHandle) {
        let stopped = self.stop_with_retry(handle).await;
        self.release(slot, handle);

        match stopped {
            Ok(Some(artifact)) => {
                if let Err(e) = self.delete_with_retry(&artifact).await {
                    warn!(error = %e, "could not delete discarded recording");
                } else {
                    debug!(%handle, "discarded recording deleted");
                }
            }
            Ok(None) => debug!(%handle, "discarded recording captured nothing"),
            Err(e) => warn!(error = %e, "giving up on stop; handle released anyway"),
        }
    }

    // Idempotent: releasing a handle that is not held only logs
    fn release(&self, slot: &mut Option<RecordingHandle>, handle: RecordingHandle) {
        if *slot == Some(handle) {
            *slot = None;
            self.held.store(0, Ordering::SeqCst);
            debug!(%handle, "recording handle released");
        } else {
            debug!(%handle, "release on an already-released handle ignored");
        }
    }

    async fn stop_with_retry(
        &self,
        handle: RecordingHandle,
    ) -> Result<Option<ArtifactRef>, ReleaseError> {
        match self.native.stop().await {
            Ok(artifact) => Ok(artifact),
            Err(first) => {
                warn!(%handle, error = %first, "stop failed; retrying once");
                self.native.stop().await.map_err(|source| ReleaseError {
                    target: handle.to_string(),
                    operation: "stop",
                    source,
                })
            }
        }
    }

    async fn delete_with_retry(&self, artifact: &ArtifactRef) -> Result<(), ReleaseError> {
        match self.native.delete(artifact).await {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(artifact = %artifact, error = %first, "delete failed; retrying once");
                self.native
                    .delete(artifact)
                    .await
                    .map_err(|source| ReleaseError {
                        target: artifact.path().display().to_string(),
                        operation: "delete",
                        source,
                    })
            }
        }
    }
}
