//! UI intents and host hooks
//!
//! What the session controller tells the presentation layer, and what it
//! needs from the screen hosting the control.

use std::fmt;

use crate::domain::session::{RecordingSession, SessionId, SessionState};

/// Visible controller state, published on every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerSnapshot {
    /// State confirmed by the recording resource
    pub state: SessionState,
    /// State decided by the user's gesture
    pub intended: SessionState,
    pub elapsed_seconds: u64,
    pub over_cancel_zone: bool,
    pub cancel_zone_visible: bool,
    pub session: Option<SessionId>,
}

impl ControllerSnapshot {
    /// Snapshot of an idle controller
    pub fn idle() -> Self {
        Self::default()
    }

    pub(crate) fn of(session: &RecordingSession) -> Self {
        Self {
            state: session.state(),
            intended: session.intended(),
            elapsed_seconds: session.elapsed_seconds(),
            over_cancel_zone: session.is_over_cancel_zone(),
            cancel_zone_visible: session.is_holding(),
            session: Some(session.id()),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// The user is holding the control and no decision has been made yet
    pub fn is_holding(&self) -> bool {
        self.intended == SessionState::Recording
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording && self.is_holding()
    }

    /// Visible timer text, e.g. "0:07"
    pub fn elapsed_label(&self) -> String {
        format!("{}:{:02}", self.elapsed_seconds / 60, self.elapsed_seconds % 60)
    }
}

/// Tactile feedback requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticPulse {
    /// Medium impact when a press is accepted
    PressAccepted,
    /// Light impact when the drag crosses into the cancel zone
    EnteredCancelZone,
    /// Error notification when a recording is thrown away
    Cancelled,
    /// Warning notification when the maximum duration is hit
    LimitReached,
}

impl HapticPulse {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PressAccepted => "impact-medium",
            Self::EnteredCancelZone => "impact-light",
            Self::Cancelled => "notify-error",
            Self::LimitReached => "notify-warning",
        }
    }
}

impl fmt::Display for HapticPulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-visible messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PermissionRequired,
    RecordingUnavailable,
    LimitReached { max_secs: u64 },
    FinalizeFailed,
    TranscriptionFailed,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Self::PermissionRequired => "Permission Required",
            Self::RecordingUnavailable => "Recording Error",
            Self::LimitReached { .. } => "Time Limit",
            Self::FinalizeFailed => "Recording Error",
            Self::TranscriptionFailed => "Transcription Failed",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::PermissionRequired => {
                "Microphone access is needed to record voice messages.".to_string()
            }
            Self::RecordingUnavailable => "Could not start recording. Please try again.".to_string(),
            Self::LimitReached { max_secs } => {
                format!("Recordings are limited to {} seconds.", max_secs)
            }
            Self::FinalizeFailed => "Could not get recording data.".to_string(),
            Self::TranscriptionFailed => {
                "Could not transcribe the recording. Please try again.".to_string()
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title(), self.message())
    }
}

/// Everything the controller asks the presentation layer to do
#[derive(Debug, Clone, PartialEq)]
pub enum UiIntent {
    State(ControllerSnapshot),
    Haptic(HapticPulse),
    Notice(Notice),
    Tick { elapsed_seconds: u64 },
}

/// Callbacks into the screen hosting the control
pub trait HostHooks: Send + Sync {
    /// Recognized text of a successful session. Called once per session.
    fn on_ready(&self, text: String);

    /// Called only when the value changes
    fn on_recording_state_changed(&self, _is_recording: bool) {}

    /// Press guard: the control is disabled
    fn is_disabled(&self) -> bool {
        false
    }

    /// Press guard: the user already typed something
    fn has_pending_text(&self) -> bool {
        false
    }
}

impl<H: HostHooks + ?Sized> HostHooks for std::sync::Arc<H> {
    fn on_ready(&self, text: String) {
        self.as_ref().on_ready(text)
    }

    fn on_recording_state_changed(&self, is_recording: bool) {
        self.as_ref().on_recording_state_changed(is_recording)
    }

    fn is_disabled(&self) -> bool {
        self.as_ref().is_disabled()
    }

    fn has_pending_text(&self) -> bool {
        self.as_ref().has_pending_text()
    }
}
