//! Gesture scripts for the replay harness
//!
//! ```toml
//! has_text = false
//!
//! [[step]]
//! at = "0"
//! phase = "start"
//! x = 300.0
//!
//! [[step]]
//! at = "1s200ms"
//! phase = "move"
//! x = 60.0
//!
//! [[step]]
//! at = "1s500ms"
//! phase = "end"
//! x = 60.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::gesture::{PointerPhase, PointerSample};
use crate::domain::recording::Duration;

/// Errors loading a gesture script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse script: {0}")]
    Parse(String),

    #[error("Step {step}: {message}")]
    InvalidStep { step: usize, message: String },

    #[error("Script has no steps")]
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScript {
    #[serde(default)]
    has_text: bool,
    #[serde(default)]
    disabled: bool,
    #[serde(default, rename = "step")]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    at: String,
    phase: RawPhase,
    x: Option<f32>,
    #[serde(default)]
    y: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawPhase {
    Start,
    Move,
    End,
    Terminate,
}

impl From<RawPhase> for PointerPhase {
    fn from(phase: RawPhase) -> Self {
        match phase {
            RawPhase::Start => PointerPhase::Start,
            RawPhase::Move => PointerPhase::Move,
            RawPhase::End => PointerPhase::End,
            RawPhase::Terminate => PointerPhase::Terminate,
        }
    }
}

/// One timed pointer sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    /// Offset from the start of the replay
    pub at: StdDuration,
    pub sample: PointerSample,
}

/// A validated gesture script
#[derive(Debug, Clone, PartialEq)]
pub struct GestureScript {
    /// Host guard: the user already typed text
    pub has_text: bool,
    /// Host guard: the control is disabled
    pub disabled: bool,
    pub steps: Vec<ScriptStep>,
}

impl GestureScript {
    /// Load and validate a script file
    pub async fn load(path: &Path) -> Result<Self, ScriptError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScriptError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        content.parse()
    }

    /// Offset of the last step
    pub fn length(&self) -> StdDuration {
        self.steps.last().map(|s| s.at).unwrap_or_default()
    }
}

impl std::str::FromStr for GestureScript {
    type Err = ScriptError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let raw: RawScript =
            toml::from_str(content).map_err(|e| ScriptError::Parse(e.to_string()))?;
        if raw.steps.is_empty() {
            return Err(ScriptError::Empty);
        }

        let mut steps = Vec::with_capacity(raw.steps.len());
        let mut previous = StdDuration::ZERO;
        for (index, step) in raw.steps.into_iter().enumerate() {
            let number = index + 1;
            let invalid = |message: String| ScriptError::InvalidStep {
                step: number,
                message,
            };

            let at = parse_offset(&step.at).map_err(invalid)?;
            if at < previous {
                return Err(invalid(format!(
                    "offset {} is earlier than the previous step",
                    step.at
                )));
            }
            previous = at;

            let phase = PointerPhase::from(step.phase);
            let x = match (phase, step.x) {
                (PointerPhase::Terminate, x) => x.unwrap_or_default(),
                (_, Some(x)) if x.is_finite() => x,
                (_, Some(_)) => return Err(invalid("x must be a finite number".to_string())),
                (_, None) => return Err(invalid(format!("'{}' step needs an x value", phase))),
            };

            steps.push(ScriptStep {
                at,
                sample: PointerSample::new(phase, x, step.y),
            });
        }

        Ok(Self {
            has_text: raw.has_text,
            disabled: raw.disabled,
            steps,
        })
    }
}

/// "0" or a duration string such as "750ms" or "1m30s"
fn parse_offset(value: &str) -> Result<StdDuration, String> {
    if value.trim() == "0" {
        return Ok(StdDuration::ZERO);
    }
    value
        .parse::<Duration>()
        .map(|d| d.as_std())
        .map_err(|e| e.to_string())
}
