//! Capture limits: the numeric constants governing a press-and-hold session

use std::time::Duration as StdDuration;

use super::duration::{Duration, DEFAULT_STALE_GRACE_MS, DEFAULT_TICK_MS};

/// Default interactive surface width, in points
pub const DEFAULT_SURFACE_WIDTH: f32 = 390.0;

/// Leftward drag, as a fraction of the surface width, that arms cancellation
pub const DEFAULT_CANCEL_RATIO: f32 = 0.6;

/// Furthest the control may be dragged, as a fraction of the surface width
pub const DEFAULT_OFFSET_CLAMP_RATIO: f32 = 0.8;

/// Scale of the control while a recording is held
pub const DEFAULT_RECORDING_SCALE: f32 = 1.2;

/// Thresholds and timings for one capture surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureLimits {
    pub surface_width: f32,
    pub cancel_ratio: f32,
    pub offset_clamp_ratio: f32,
    pub recording_scale: f32,
    pub short_press: Duration,
    pub max_duration: Duration,
    pub tick_interval: Duration,
    pub stale_release_grace: Duration,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            surface_width: DEFAULT_SURFACE_WIDTH,
            cancel_ratio: DEFAULT_CANCEL_RATIO,
            offset_clamp_ratio: DEFAULT_OFFSET_CLAMP_RATIO,
            recording_scale: DEFAULT_RECORDING_SCALE,
            short_press: Duration::default_short_press(),
            max_duration: Duration::default_max_duration(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            stale_release_grace: Duration::from_millis(DEFAULT_STALE_GRACE_MS),
        }
    }
}

impl CaptureLimits {
    /// Limits for a surface of the given width, other values at their defaults
    pub fn for_surface(surface_width: f32) -> Self {
        Self {
            surface_width,
            ..Self::default()
        }
    }

    /// Leftward distance (positive number) past which a release cancels
    pub fn cancel_threshold(&self) -> f32 {
        self.surface_width * self.cancel_ratio
    }

    /// True only when `dx` is strictly beyond the leftward threshold.
    /// Rightward drag never cancels.
    pub fn is_past_cancel_threshold(&self, dx: f32) -> bool {
        dx < -self.cancel_threshold()
    }

    /// Horizontal offset of the control for a drag, clamped to `[-clamp*width, 0]`
    pub fn clamp_offset(&self, dx: f32) -> f32 {
        let min = -self.surface_width * self.offset_clamp_ratio;
        if dx.is_nan() {
            return 0.0;
        }
        dx.clamp(min, 0.0)
    }

    /// A hold shorter than the short-press threshold is an accidental tap
    pub fn is_short_press(&self, held: StdDuration) -> bool {
        held < self.short_press.as_std()
    }

    /// Whether a hold has reached the maximum recording length
    pub fn has_reached_max(&self, held: StdDuration) -> bool {
        held >= self.max_duration.as_std()
    }
}
