//! Recording infrastructure module
//!
//! Native audio backends: cpal microphone capture for real use and an
//! in-process backend for replays. Both write 16 kHz mono FLAC artifacts.

mod artifact_file;
mod cpal_audio;
mod flac_encoder;
mod memory;
mod pcm;

pub use cpal_audio::CpalAudio;
pub use flac_encoder::{encode_to_flac, EncodingError, TARGET_SAMPLE_RATE};
pub use memory::MemoryAudio;
