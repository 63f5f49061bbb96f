//! Gesture-to-intent adapter
//!
//! Turns the raw pointer sample stream into the discrete events the session
//! controller consumes, and projects controller state back onto the control's
//! visual properties. The projection is a pure function of the last
//! published snapshot and the latest drag sample.

use crate::domain::gesture::{GestureEvent, PointerPhase, PointerSample};
use crate::domain::recording::CaptureLimits;

use super::controller::{ControllerError, ControllerHandle};
use super::intent::ControllerSnapshot;

/// Hint shown under the control while holding
pub const SLIDE_TO_CANCEL_HINT: &str = "← Slide to Cancel";

/// Hint shown once the drag has crossed the cancel threshold
pub const RELEASE_TO_CANCEL_HINT: &str = "Release to Cancel";

/// Appearance of the cancel zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelZoneView {
    Hidden,
    /// Shown at full opacity with a neutral tint
    Visible,
    /// Shown at full opacity with the alert tint: releasing now cancels
    Armed,
}

impl CancelZoneView {
    pub fn opacity(&self) -> f32 {
        match self {
            Self::Hidden => 0.0,
            Self::Visible | Self::Armed => 1.0,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Self::Armed)
    }
}

/// Animation targets for the capture control
#[derive(Debug, Clone, PartialEq)]
pub struct ControlView {
    pub offset_x: f32,
    pub scale: f32,
    pub cancel_zone: CancelZoneView,
    /// Offset and scale return to rest with a spring animation
    pub spring_to_rest: bool,
    pub cancel_hint: &'static str,
    pub slide_arrow_offset: f32,
}

impl ControlView {
    /// The control at rest
    pub fn rest() -> Self {
        Self {
            offset_x: 0.0,
            scale: 1.0,
            cancel_zone: CancelZoneView::Hidden,
            spring_to_rest: false,
            cancel_hint: SLIDE_TO_CANCEL_HINT,
            slide_arrow_offset: 0.0,
        }
    }
}

/// Pointer stream to gesture event translator
#[derive(Debug, Clone)]
pub struct GestureAdapter {
    limits: CaptureLimits,
    origin_x: Option<f32>,
    dx: f32,
    spring_to_rest: bool,
}

impl GestureAdapter {
    pub fn new(limits: CaptureLimits) -> Self {
        Self {
            limits,
            origin_x: None,
            dx: 0.0,
            spring_to_rest: false,
        }
    }

    /// Horizontal displacement of the latest sample from the press point
    pub fn dx(&self) -> f32 {
        self.dx
    }

    /// A pointer is down on the control
    pub fn is_tracking(&self) -> bool {
        self.origin_x.is_some()
    }

    /// Translate one sample. Samples outside a touch sequence produce nothing.
    pub fn feed(&mut self, sample: PointerSample) -> Option<GestureEvent> {
        match sample.phase {
            PointerPhase::Start => {
                self.origin_x = Some(if sample.x.is_finite() { sample.x } else { 0.0 });
                self.dx = 0.0;
                self.spring_to_rest = false;
                Some(GestureEvent::Press)
            }
            PointerPhase::Move => {
                let origin = self.origin_x?;
                if !sample.x.is_finite() {
                    return None;
                }
                self.dx = sample.x - origin;
                Some(GestureEvent::Drag { dx: self.dx })
            }
            PointerPhase::End => {
                let origin = self.origin_x.take()?;
                if sample.x.is_finite() {
                    self.dx = sample.x - origin;
                }
                self.spring_to_rest = true;
                Some(GestureEvent::Release { dx: self.dx })
            }
            PointerPhase::Terminate => {
                self.origin_x.take()?;
                self.spring_to_rest = true;
                Some(GestureEvent::Terminate)
            }
        }
    }

    /// Translate a sample and deliver the resulting event to the controller
    pub fn forward(
        &mut self,
        sample: PointerSample,
        controller: &ControllerHandle,
    ) -> Result<Option<GestureEvent>, ControllerError> {
        match self.feed(sample) {
            Some(event) => {
                controller.send(event)?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    /// Visual properties of the control for the given controller state
    pub fn view(&self, snapshot: &ControllerSnapshot) -> ControlView {
        if self.spring_to_rest {
            return ControlView {
                spring_to_rest: true,
                ..ControlView::rest()
            };
        }

        let offset_x = if snapshot.is_holding() {
            self.limits.clamp_offset(self.dx)
        } else {
            0.0
        };
        let scale = if snapshot.is_recording() {
            self.limits.recording_scale
        } else {
            1.0
        };
        let cancel_zone = match (snapshot.cancel_zone_visible, snapshot.over_cancel_zone) {
            (false, _) => CancelZoneView::Hidden,
            (true, false) => CancelZoneView::Visible,
            (true, true) => CancelZoneView::Armed,
        };
        let cancel_hint = if cancel_zone.is_alert() {
            RELEASE_TO_CANCEL_HINT
        } else {
            SLIDE_TO_CANCEL_HINT
        };

        ControlView {
            offset_x,
            scale,
            cancel_zone,
            spring_to_rest: false,
            cancel_hint,
            slide_arrow_offset: offset_x / 2.0,
        }
    }
}
