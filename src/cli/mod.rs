//! CLI layer - Command-line interface
//!
//! Contains argument parsing, gesture scripts, output formatting, logging
//! setup, signal handling, and the replay runner.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod logging;
pub mod presenter;
pub mod script;
pub mod signals;

// Re-export commonly used types
pub use app::{run_replay, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Backend, Cli, Commands, ConfigAction, ReplayOptions};
pub use presenter::Presenter;
pub use script::{GestureScript, ScriptError, ScriptStep};
