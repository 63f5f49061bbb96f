//! Recording domain module

mod artifact;
mod duration;
mod limits;

pub use artifact::{ArtifactRef, AudioMimeType, RecordingHandle};
pub use duration::{
    Duration, DEFAULT_MAX_DURATION_SECS, DEFAULT_SHORT_PRESS_MS, DEFAULT_STALE_GRACE_MS,
    DEFAULT_TICK_MS,
};
pub use limits::{
    CaptureLimits, DEFAULT_CANCEL_RATIO, DEFAULT_OFFSET_CLAMP_RATIO, DEFAULT_RECORDING_SCALE,
    DEFAULT_SURFACE_WIDTH,
};
