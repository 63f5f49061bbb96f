//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// HoldTalk - press-and-hold voice capture
#[derive(Parser, Debug)]
#[command(name = "holdtalk")]
#[command(version)]
#[command(about = "Press-and-hold voice capture: hold to record, slide to cancel, release to send")]
#[command(long_about = None)]
pub struct Cli {
    /// Tracing filter (e.g. info, debug, holdtalk=trace). Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a gesture script against the session controller
    Replay(ReplayOptions),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `holdtalk replay`
#[derive(Args, Debug, Clone)]
pub struct ReplayOptions {
    /// Gesture script (TOML with [[step]] tables)
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Native audio backend
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,

    /// Transcription endpoint; the placeholder transcriber is used when unset
    #[arg(long, value_name = "URL", env = "HOLDTALK_TRANSCRIBE_URL")]
    pub transcribe_url: Option<String>,

    /// Width of the interactive surface in points
    #[arg(long, value_name = "POINTS")]
    pub surface_width: Option<f32>,

    /// Maximum recording duration (e.g., 30s, 2m)
    #[arg(long, value_name = "TIME")]
    pub max_duration: Option<String>,
}

/// Native audio backend choice
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Synthetic in-process recordings
    Memory,
    /// The default microphone via cpal
    Cpal,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "max_duration",
    "short_press",
    "cancel_ratio",
    "surface_width",
    "transcribe_url",
    "recordings_dir",
    "log_level",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
