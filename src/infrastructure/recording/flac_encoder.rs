//! FLAC encoding for recording artifacts
//!
//! Artifacts are lossless 16 kHz mono 16-bit FLAC, small enough to upload
//! while keeping speech intact for the transcription backend.

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

/// Sample rate of every artifact
pub const TARGET_SAMPLE_RATE: u32 = 16000;

const BITS_PER_SAMPLE: usize = 16;
const CHANNELS: usize = 1;

/// Audio encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("FLAC config error: {0}")]
    Config(String),

    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    #[error("FLAC write failed: {0}")]
    Write(String),

    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Encode mono 16 kHz PCM into a FLAC byte stream
pub fn encode_to_flac(pcm: &[i16]) -> Result<Vec<u8>, EncodingError> {
    let samples: Vec<i32> = pcm.iter().map(|&s| s as i32).collect();

    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EncodingError::Config(format!("{:?}", e)))?;

    let source = MemSource::from_samples(
        &samples,
        CHANNELS,
        BITS_PER_SAMPLE,
        TARGET_SAMPLE_RATE as usize,
    );

    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;

    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| EncodingError::Write(e.to_string()))?;

    Ok(sink.into_inner())
}
