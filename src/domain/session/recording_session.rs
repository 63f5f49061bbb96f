//! Recording session entity and its state machine

use std::fmt;
use std::time::{Duration as StdDuration, Instant};

use thiserror::Error;

use crate::domain::recording::{ArtifactRef, RecordingHandle};

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Cancelling,
    StoppingAndProcessing,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Recording => "recording",
            Self::Cancelling => "cancelling",
            Self::StoppingAndProcessing => "processing",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier of one press-to-resolution cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Sentinel that matches no session
    pub const NONE: SessionId = SessionId(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while {current_state} (intended {intended_state})")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub intended_state: SessionState,
    pub action: String,
}

/// Result of feeding a drag sample into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    EnteredCancelZone,
    LeftCancelZone,
    Unchanged,
}

/// One in-flight press-and-hold session.
///
/// Two states are tracked side by side. `intended` changes the instant the
/// user does something (press, release, interruption) and is what gesture
/// decisions consult. `confirmed` only changes when the native resource
/// settles. They diverge while an acquire or release is in flight.
///
/// State machine (confirmed):
///   ACQUIRING -> RECORDING (confirm_acquired)
///   RECORDING -> CANCELLING (enter_cancelling)
///   RECORDING -> PROCESSING (enter_processing)
///   any -> IDLE (the controller drops the session)
#[derive(Debug)]
pub struct RecordingSession {
    id: SessionId,
    intended: SessionState,
    confirmed: SessionState,
    handle: Option<RecordingHandle>,
    started_at: Instant,
    elapsed_seconds: u64,
    over_cancel_zone: bool,
    artifact: Option<ArtifactRef>,
}

impl RecordingSession {
    /// Accept a press. `started_at` is fixed here and never revised.
    pub fn begin(id: SessionId, started_at: Instant) -> Self {
        Self {
            id,
            intended: SessionState::Recording,
            confirmed: SessionState::Acquiring,
            handle: None,
            started_at,
            elapsed_seconds: 0,
            over_cancel_zone: false,
            artifact: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// State as confirmed by the native resource
    pub fn state(&self) -> SessionState {
        self.confirmed
    }

    /// State as decided by the user's gesture
    pub fn intended(&self) -> SessionState {
        self.intended
    }

    pub fn handle(&self) -> Option<RecordingHandle> {
        self.handle
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_over_cancel_zone(&self) -> bool {
        self.over_cancel_zone
    }

    pub fn artifact(&self) -> Option<&ArtifactRef> {
        self.artifact.as_ref()
    }

    /// The user is still holding and no decision has been made
    pub fn is_holding(&self) -> bool {
        self.intended == SessionState::Recording
    }

    /// Recording is confirmed by hardware and still wanted by the user
    pub fn is_live(&self) -> bool {
        self.is_holding() && self.confirmed == SessionState::Recording
    }

    /// Hold time measured from the accepted press
    pub fn held_for(&self, now: Instant) -> StdDuration {
        now.saturating_duration_since(self.started_at)
    }

    fn invalid(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.confirmed,
            intended_state: self.intended,
            action: action.to_string(),
        }
    }

    /// Acquisition settled successfully
    pub fn confirm_acquired(
        &mut self,
        handle: RecordingHandle,
    ) -> Result<(), InvalidStateTransition> {
        if self.confirmed != SessionState::Acquiring {
            return Err(self.invalid("confirm acquisition"));
        }
        self.handle = Some(handle);
        self.confirmed = SessionState::Recording;
        Ok(())
    }

    /// Feed a drag sample; `past_threshold` is whether dx crossed the cancel line.
    /// The cancel zone only arms once recording is confirmed.
    pub fn update_drag(&mut self, past_threshold: bool) -> DragOutcome {
        if !self.is_live() {
            return DragOutcome::Unchanged;
        }
        match (past_threshold, self.over_cancel_zone) {
            (true, false) => {
                self.over_cancel_zone = true;
                DragOutcome::EnteredCancelZone
            }
            (false, true) => {
                self.over_cancel_zone = false;
                DragOutcome::LeftCancelZone
            }
            _ => DragOutcome::Unchanged,
        }
    }

    /// Decide the fate of the session at release.
    ///
    /// Cancels when over the cancel zone (flagged, or the release sample itself
    /// is past the threshold) or when the hold was shorter than `short_press`.
    pub fn resolve_release(
        &mut self,
        now: Instant,
        release_past_threshold: bool,
        short_press: StdDuration,
    ) -> Result<SessionState, InvalidStateTransition> {
        if !self.is_holding() {
            return Err(self.invalid("release"));
        }
        let cancel = self.over_cancel_zone
            || release_past_threshold
            || self.held_for(now) < short_press;
        self.over_cancel_zone = false;
        self.intended = if cancel {
            SessionState::Cancelling
        } else {
            SessionState::StoppingAndProcessing
        };
        Ok(self.intended)
    }

    /// Platform interruption: always a cancel, never a finalize
    pub fn resolve_termination(&mut self) -> Result<SessionState, InvalidStateTransition> {
        if !self.is_holding() {
            return Err(self.invalid("terminate"));
        }
        self.over_cancel_zone = false;
        self.intended = SessionState::Cancelling;
        Ok(self.intended)
    }

    /// The maximum duration elapsed while the user was still holding
    pub fn resolve_limit(&mut self) -> Result<SessionState, InvalidStateTransition> {
        if !self.is_live() {
            return Err(self.invalid("stop at limit"));
        }
        self.over_cancel_zone = false;
        self.intended = SessionState::StoppingAndProcessing;
        Ok(self.intended)
    }

    /// Advance the visible timer; returns the new elapsed seconds
    pub fn tick(&mut self, now: Instant) -> u64 {
        if self.is_live() {
            self.elapsed_seconds = self.held_for(now).as_secs();
        }
        self.elapsed_seconds
    }

    /// Begin the discard path. Returns the handle the gateway must discard.
    pub fn enter_cancelling(&mut self) -> Result<RecordingHandle, InvalidStateTransition> {
        self.enter_release(SessionState::Cancelling, "cancel")
    }

    /// Begin the finalize path. Returns the handle the gateway must finalize.
    pub fn enter_processing(&mut self) -> Result<RecordingHandle, InvalidStateTransition> {
        self.enter_release(SessionState::StoppingAndProcessing, "finalize")
    }

    fn enter_release(
        &mut self,
        next: SessionState,
        action: &str,
    ) -> Result<RecordingHandle, InvalidStateTransition> {
        if self.confirmed != SessionState::Recording || self.intended != next {
            return Err(self.invalid(action));
        }
        let handle = self.handle.ok_or_else(|| self.invalid(action))?;
        self.confirmed = next;
        Ok(handle)
    }

    /// The gateway has released the handle (finalize or discard settled)
    pub fn mark_released(&mut self) {
        self.handle = None;
    }

    /// Record the artifact produced by a successful finalize
    pub fn record_artifact(&mut self, artifact: ArtifactRef) -> Result<(), InvalidStateTransition> {
        if self.confirmed != SessionState::StoppingAndProcessing {
            return Err(self.invalid("record artifact"));
        }
        self.handle = None;
        self.artifact = Some(artifact);
        Ok(())
    }
}
