//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like the microphone (cpal), the
//! transcription backend (HTTP), and the config file.

pub mod config;
pub mod recording;
pub mod transcription;

// Re-export adapters
pub use config::XdgConfigStore;
pub use recording::{CpalAudio, MemoryAudio};
pub use transcription::{HttpTranscriber, PlaceholderTranscriber};
