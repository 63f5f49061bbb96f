//! Session domain module

mod recording_session;

pub use recording_session::{DragOutcome, InvalidStateTransition, RecordingSession, SessionId, SessionState};
