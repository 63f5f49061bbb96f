//! Recording handle and artifact reference value objects

use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque token naming the exclusive native recording resource.
///
/// The gateway hands these out and is the only party that can act on the
/// resource behind one; holders can only pass the token back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordingHandle(u64);

impl RecordingHandle {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec-{}", self.0)
    }
}

/// Audio container formats artifacts are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioMimeType {
    #[default]
    Flac,
    Wav,
}

impl AudioMimeType {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flac => "audio/flac",
            Self::Wav => "audio/wav",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Wav => "wav",
        }
    }
}

/// Reference to captured audio produced by a successful finalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    path: PathBuf,
    mime_type: AudioMimeType,
    size_bytes: u64,
}

impl ArtifactRef {
    pub fn new(path: impl Into<PathBuf>, mime_type: AudioMimeType, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            mime_type,
            size_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// File name for uploads; falls back to a generic name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("recording.{}", self.mime_type.extension()))
    }

    /// Get human-readable size (e.g., "1.5 KB")
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes;
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.human_readable_size())
    }
}
