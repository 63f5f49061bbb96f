//! Transcription infrastructure module

mod http;
mod placeholder;

pub use http::HttpTranscriber;
pub use placeholder::{PlaceholderTranscriber, DEFAULT_PLACEHOLDER_DELAY, PLACEHOLDER_TEXT};
