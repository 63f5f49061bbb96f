//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::recording::{CaptureLimits, Duration};

/// Default tracing filter level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub max_duration: Option<String>,
    pub short_press: Option<String>,
    pub cancel_ratio: Option<f32>,
    pub surface_width: Option<f32>,
    pub transcribe_url: Option<String>,
    pub recordings_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        let limits = CaptureLimits::default();
        Self {
            max_duration: Some(limits.max_duration.to_string()),
            short_press: Some(limits.short_press.to_string()),
            cancel_ratio: Some(limits.cancel_ratio),
            surface_width: Some(limits.surface_width),
            transcribe_url: None,
            recordings_dir: None,
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            max_duration: other.max_duration.or(self.max_duration),
            short_press: other.short_press.or(self.short_press),
            cancel_ratio: other.cancel_ratio.or(self.cancel_ratio),
            surface_width: other.surface_width.or(self.surface_width),
            transcribe_url: other.transcribe_url.or(self.transcribe_url),
            recordings_dir: other.recordings_dir.or(self.recordings_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    /// Get short_press as parsed Duration, or default if not set/invalid
    pub fn short_press_or_default(&self) -> Duration {
        self.short_press
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_short_press)
    }

    /// Get cancel ratio, or the default when unset or outside (0, 1]
    pub fn cancel_ratio_or_default(&self) -> f32 {
        self.cancel_ratio
            .filter(|r| *r > 0.0 && *r <= 1.0)
            .unwrap_or(CaptureLimits::default().cancel_ratio)
    }

    /// Get surface width, or the default when unset or not positive
    pub fn surface_width_or_default(&self) -> f32 {
        self.surface_width
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(CaptureLimits::default().surface_width)
    }

    /// Directory recordings are written to while in flight
    pub fn recordings_dir_or_default(&self) -> PathBuf {
        self.recordings_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("holdtalk"))
    }

    /// Get the tracing filter level, or "info" if not set
    pub fn log_level_or_default(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Build the capture limits this config describes
    pub fn capture_limits(&self) -> CaptureLimits {
        CaptureLimits {
            surface_width: self.surface_width_or_default(),
            cancel_ratio: self.cancel_ratio_or_default(),
            short_press: self.short_press_or_default(),
            max_duration: self.max_duration_or_default(),
            ..CaptureLimits::default()
        }
    }
}
