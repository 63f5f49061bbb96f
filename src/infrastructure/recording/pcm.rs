//! PCM sample helpers shared by the capture backends

use rubato::{FftFixedIn, Resampler};

use super::flac_encoder::{EncodingError, TARGET_SAMPLE_RATE};

/// Convert normalized f32 samples to i16
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

/// Average interleaved channels down to mono
pub fn mix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

/// Resample mono audio from the device rate to 16 kHz
pub fn resample_to_target(samples: &[i16], source_rate: u32) -> Result<Vec<i16>, EncodingError> {
    if source_rate == TARGET_SAMPLE_RATE || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let input: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();
    let ratio = TARGET_SAMPLE_RATE as f64 / source_rate as f64;
    let output_len = (input.len() as f64 * ratio).ceil() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        TARGET_SAMPLE_RATE as usize,
        1024,
        2,
        1,
    )
    .map_err(|e| EncodingError::Resample(e.to_string()))?;

    let mut output = Vec::with_capacity(output_len);
    let mut pos = 0;
    while pos < input.len() {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(input.len());
        let mut chunk = input[pos..end].to_vec();
        chunk.resize(needed, 0.0);

        let resampled = resampler
            .process(&[chunk], None)
            .map_err(|e| EncodingError::Resample(e.to_string()))?;
        output.extend(resampled[0].iter().map(|&s| (s * 32767.0) as i16));
        pos = end;
    }

    output.truncate(output_len);
    Ok(output)
}

/// Silence of the given length at the target rate
pub fn silence(millis: u64) -> Vec<i16> {
    vec![0; (TARGET_SAMPLE_RATE as u64 * millis / 1000) as usize]
}
