//! On-disk recording artifacts

use std::io::ErrorKind;
use std::path::Path;

use uuid::Uuid;

use super::flac_encoder::encode_to_flac;
use super::pcm::resample_to_target;
use crate::application::ports::NativeAudioError;
use crate::domain::recording::{ArtifactRef, AudioMimeType};

/// Encode captured mono PCM to FLAC and write it under `dir` with a fresh name
pub async fn write_flac(
    dir: &Path,
    pcm: Vec<i16>,
    source_rate: u32,
) -> Result<ArtifactRef, NativeAudioError> {
    let flac = tokio::task::spawn_blocking(move || {
        let resampled = resample_to_target(&pcm, source_rate)?;
        encode_to_flac(&resampled)
    })
    .await
    .map_err(|e| NativeAudioError::StopFailed(format!("Encode task error: {}", e)))?
    .map_err(|e| NativeAudioError::StopFailed(e.to_string()))?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| NativeAudioError::StopFailed(format!("{}: {}", dir.display(), e)))?;

    let mime_type = AudioMimeType::Flac;
    let path = dir.join(format!("{}.{}", Uuid::new_v4(), mime_type.extension()));
    if let Err(e) = tokio::fs::write(&path, &flac).await {
        // drop whatever part of the file made it to disk
        let _ = tokio::fs::remove_file(&path).await;
        return Err(NativeAudioError::StopFailed(format!(
            "{}: {}",
            path.display(),
            e
        )));
    }

    Ok(ArtifactRef::new(path, mime_type, flac.len() as u64))
}

/// Remove an artifact file; a file that is already gone is not an error
pub async fn remove(artifact: &ArtifactRef) -> Result<(), NativeAudioError> {
    match tokio::fs::remove_file(artifact.path()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(NativeAudioError::DeleteFailed(format!(
            "{}: {}",
            artifact.path().display(),
            e
        ))),
    }
}
