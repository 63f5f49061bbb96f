//! Duration value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default maximum recording length (2 minutes)
pub const DEFAULT_MAX_DURATION_SECS: u64 = 120;

/// Default short-press threshold; holds below this are accidental taps
pub const DEFAULT_SHORT_PRESS_MS: u64 = 500;

/// Default duration ticker interval
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Grace delay after force-releasing a stale handle, before a new acquire
pub const DEFAULT_STALE_GRACE_MS: u64 = 100;

/// Value object representing a time duration.
/// Immutable and validated on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    /// Create a Duration from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a Duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    /// Default maximum recording length (2 minutes)
    pub const fn default_max_duration() -> Self {
        Self::from_secs(DEFAULT_MAX_DURATION_SECS)
    }

    /// Default short-press threshold (500ms)
    pub const fn default_short_press() -> Self {
        Self::from_millis(DEFAULT_SHORT_PRESS_MS)
    }

    /// Get duration in whole seconds
    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    /// Get duration in milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }
}

impl From<StdDuration> for Duration {
    fn from(d: StdDuration) -> Self {
        Self::from_millis(d.as_millis() as u64)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse a duration string into a Duration value object.
    /// Supported units: "ms", "s", "m", combinable as "1m30s" or "1s500ms"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        let err = || DurationParseError {
            input: s.to_string(),
        };

        let mut total_ms: u64 = 0;
        let mut current_num = String::new();
        let mut found_any = false;
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch.is_ascii_digit() {
                current_num.push(ch);
                continue;
            }
            if current_num.is_empty() {
                return Err(err());
            }
            let value: u64 = current_num.parse().map_err(|_| err())?;
            let unit_ms = match ch {
                'm' if chars.peek() == Some(&'s') => {
                    chars.next();
                    1
                }
                'm' => 60_000,
                's' => 1000,
                _ => return Err(err()),
            };
            total_ms = value
                .checked_mul(unit_ms)
                .and_then(|v| total_ms.checked_add(v))
                .ok_or_else(err)?;
            current_num.clear();
            found_any = true;
        }

        // Leftover digits without a unit are not accepted
        if !current_num.is_empty() || !found_any || total_ms == 0 {
            return Err(err());
        }

        Ok(Self {
            milliseconds: total_ms,
        })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.as_secs();
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        let millis = self.milliseconds % 1000;

        if minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        if seconds > 0 {
            write!(f, "{}s", seconds)?;
        }
        if millis > 0 || self.milliseconds == 0 {
            write!(f, "{}ms", millis)?;
        }
        Ok(())
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::default_max_duration()
    }
}
