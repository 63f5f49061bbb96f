//! Gesture domain module
//!
//! Raw pointer samples as delivered by the touch surface, and the discrete
//! events the session controller understands.

use std::fmt;

/// Phase of a pointer sample within one touch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    /// Finger down on the control
    Start,
    /// Finger moved while down
    Move,
    /// Finger lifted
    End,
    /// The platform took the gesture away (scroll view, incoming call, ...)
    Terminate,
}

impl PointerPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Move => "move",
            Self::End => "end",
            Self::Terminate => "terminate",
        }
    }
}

impl fmt::Display for PointerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pointer/touch sample in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub phase: PointerPhase,
    pub x: f32,
    pub y: f32,
}

impl PointerSample {
    pub const fn new(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self { phase, x, y }
    }

    pub const fn start(x: f32) -> Self {
        Self::new(PointerPhase::Start, x, 0.0)
    }

    pub const fn moved(x: f32) -> Self {
        Self::new(PointerPhase::Move, x, 0.0)
    }

    pub const fn end(x: f32) -> Self {
        Self::new(PointerPhase::End, x, 0.0)
    }

    pub const fn terminate() -> Self {
        Self::new(PointerPhase::Terminate, 0.0, 0.0)
    }
}

/// Discrete gesture events consumed by the session controller.
/// `dx` is horizontal displacement from the press point; negative is leftward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    Press,
    Drag { dx: f32 },
    Release { dx: f32 },
    /// Forced termination by the platform; always a hard cancel
    Terminate,
}

impl GestureEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::Drag { .. } => "drag",
            Self::Release { .. } => "release",
            Self::Terminate => "terminate",
        }
    }
}
