//! Microphone capture using cpal
//!
//! The input stream lives on a dedicated thread because `cpal::Stream` is not
//! `Send`. Samples are mixed down to mono as they arrive and resampled to
//! 16 kHz when the recording is stopped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::artifact_file;
use super::flac_encoder::TARGET_SAMPLE_RATE;
use super::pcm::{f32_to_i16, mix_to_mono};
use crate::application::ports::{NativeAudio, NativeAudioError};
use crate::domain::recording::ArtifactRef;

const POLL_INTERVAL: StdDuration = StdDuration::from_millis(20);

/// Default-input-device capture backend
pub struct CpalAudio {
    recordings_dir: PathBuf,
    buffer: Arc<StdMutex<Vec<i16>>>,
    device_sample_rate: Arc<AtomicU32>,
    is_recording: Arc<AtomicBool>,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

impl CpalAudio {
    /// Create a backend writing artifacts into `recordings_dir`
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            buffer: Arc::new(StdMutex::new(Vec::new())),
            device_sample_rate: Arc::new(AtomicU32::new(0)),
            is_recording: Arc::new(AtomicBool::new(false)),
            worker: StdMutex::new(None),
        }
    }

    pub fn recordings_dir(&self) -> &PathBuf {
        &self.recordings_dir
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    fn input_device() -> Result<cpal::Device, NativeAudioError> {
        cpal::default_host()
            .default_input_device()
            .ok_or(NativeAudioError::NoInputDevice)
    }

    /// Pick an input configuration, preferring mono and a range covering 16 kHz
    fn input_config(
        device: &cpal::Device,
    ) -> Result<(StreamConfig, SampleFormat), NativeAudioError> {
        let supported = device
            .supported_input_configs()
            .map_err(|e| NativeAudioError::StartFailed(format!("Failed to get configs: {}", e)))?;

        let covers_target = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate().0 <= TARGET_SAMPLE_RATE && c.max_sample_rate().0 >= TARGET_SAMPLE_RATE
        };

        let mut best: Option<cpal::SupportedStreamConfigRange> = None;
        for config in supported {
            if !matches!(config.sample_format(), SampleFormat::I16 | SampleFormat::F32) {
                continue;
            }
            let better = match &best {
                None => true,
                Some(current) => {
                    config.channels() < current.channels()
                        || (covers_target(&config) && !covers_target(current))
                }
            };
            if better {
                best = Some(config);
            }
        }

        let range = best.ok_or_else(|| {
            NativeAudioError::StartFailed("No suitable input config found".into())
        })?;
        let sample_rate = if covers_target(&range) {
            SampleRate(TARGET_SAMPLE_RATE)
        } else {
            range.min_sample_rate()
        };

        let config = StreamConfig {
            channels: range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        Ok((config, range.sample_format()))
    }

    fn open_stream(
        buffer: Arc<StdMutex<Vec<i16>>>,
        is_recording: Arc<AtomicBool>,
    ) -> Result<(cpal::Stream, u32), NativeAudioError> {
        let device = Self::input_device()?;
        let (config, format) = Self::input_config(&device)?;
        let channels = config.channels;
        let on_error = |err: cpal::StreamError| warn!(error = %err, "audio stream error");

        let stream = match format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if is_recording.load(Ordering::SeqCst) {
                        let mono = mix_to_mono(data, channels);
                        buffer
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&mono);
                    }
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if is_recording.load(Ordering::SeqCst) {
                        let mono = mix_to_mono(&f32_to_i16(data), channels);
                        buffer
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&mono);
                    }
                },
                on_error,
                None,
            ),
            other => {
                return Err(NativeAudioError::StartFailed(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => NativeAudioError::DeviceBusy,
            other => NativeAudioError::StartFailed(other.to_string()),
        })?;

        stream
            .play()
            .map_err(|e| NativeAudioError::StartFailed(e.to_string()))?;
        Ok((stream, config.sample_rate.0))
    }

    fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl NativeAudio for CpalAudio {
    /// Desktop platforms have no runtime microphone prompt; access means a
    /// usable input device is present.
    async fn request_permission(&self) -> Result<bool, NativeAudioError> {
        tokio::task::spawn_blocking(|| match Self::input_device() {
            Ok(device) => Ok(device.default_input_config().is_ok()),
            Err(NativeAudioError::NoInputDevice) => Ok(false),
            Err(e) => Err(e),
        })
        .await
        .map_err(|e| NativeAudioError::PermissionQuery(e.to_string()))?
    }

    async fn start(&self) -> Result<(), NativeAudioError> {
        if self.is_recording.swap(true, Ordering::SeqCst) {
            return Err(NativeAudioError::DeviceBusy);
        }
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let buffer = Arc::clone(&self.buffer);
        let is_recording = Arc::clone(&self.is_recording);
        let sample_rate = Arc::clone(&self.device_sample_rate);
        let (ready_tx, ready_rx) = oneshot::channel();

        let spawned = std::thread::Builder::new()
            .name("holdtalk-capture".into())
            .spawn(move || {
                let stream = match Self::open_stream(buffer, Arc::clone(&is_recording)) {
                    Ok((stream, rate)) => {
                        sample_rate.store(rate, Ordering::SeqCst);
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        is_recording.store(false, Ordering::SeqCst);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while is_recording.load(Ordering::SeqCst) {
                    std::thread::sleep(POLL_INTERVAL);
                }
                drop(stream);
            });

        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(NativeAudioError::StartFailed(e.to_string()));
            }
        };

        match ready_rx.await {
            Ok(Ok(rate)) => {
                debug!(sample_rate = rate, "capture stream open");
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(worker);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                self.is_recording.store(false, Ordering::SeqCst);
                Err(NativeAudioError::StartFailed("capture thread exited".into()))
            }
        }
    }

    async fn stop(&self) -> Result<Option<ArtifactRef>, NativeAudioError> {
        self.is_recording.store(false, Ordering::SeqCst);
        if let Some(worker) = self.take_worker() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| NativeAudioError::StopFailed(e.to_string()))?
                .map_err(|_| NativeAudioError::StopFailed("capture thread panicked".into()))?;
        }

        // Samples stay buffered until their artifact is written so a retried
        // stop can write them again.
        let samples = self
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if samples.is_empty() {
            debug!("stopped with no captured samples");
            return Ok(None);
        }

        let rate = self.device_sample_rate.load(Ordering::SeqCst);
        if rate == 0 {
            return Err(NativeAudioError::StopFailed("sample rate unknown".into()));
        }
        let artifact = artifact_file::write_flac(&self.recordings_dir, samples, rate).await?;
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(Some(artifact))
    }

    async fn delete(&self, artifact: &ArtifactRef) -> Result<(), NativeAudioError> {
        artifact_file::remove(artifact).await
    }
}
