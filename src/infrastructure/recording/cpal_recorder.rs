//! Cross-platform microphone recorder using cpal
//!
//! Captures the default input device as mono 16-bit PCM (16kHz when the
//! device supports it) and encodes the take to FLAC on stop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use super::flac_encoder::{encode_flac, PREFERRED_SAMPLE_RATE};
use crate::application::ports::{AudioRecorder, RecordingError};
use crate::domain::recording::{AudioClip, AudioFormat};

/// How often the capture thread checks for a stop request
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Microphone recorder backed by cpal.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated thread
/// for the duration of a take and only the sample buffer is shared.
pub struct CpalRecorder {
    /// Recorded samples (mono, i16, at device sample rate)
    audio_buffer: Arc<StdMutex<Vec<i16>>>,
    device_sample_rate: Arc<AtomicU32>,
    is_recording: Arc<AtomicBool>,
    capture_thread: StdMutex<Option<JoinHandle<()>>>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        Self {
            audio_buffer: Arc::new(StdMutex::new(Vec::new())),
            device_sample_rate: Arc::new(AtomicU32::new(0)),
            is_recording: Arc::new(AtomicBool::new(false)),
            capture_thread: StdMutex::new(None),
        }
    }

    fn get_input_device() -> Result<cpal::Device, RecordingError> {
        let host = cpal::default_host();
        host.default_input_device()
            .ok_or(RecordingError::NoAudioDevice)
    }

    /// Pick an i16 or f32 config, preferring mono and the speech rate
    fn get_input_config(
        device: &cpal::Device,
    ) -> Result<(StreamConfig, SampleFormat), RecordingError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| RecordingError::StartFailed(format!("Failed to get configs: {}", e)))?;

        let includes_preferred = |config: &cpal::SupportedStreamConfigRange| {
            config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
        };

        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;
        for config in supported_configs {
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }
            let is_better = match &best_config {
                None => true,
                Some(current) => {
                    let fewer_channels = config.channels() < current.channels();
                    let better_rate = includes_preferred(&config) && !includes_preferred(current);
                    fewer_channels || better_rate
                }
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range = best_config.ok_or(RecordingError::StartFailed(
            "No suitable input config found".into(),
        ))?;

        let sample_rate = if includes_preferred(&config_range) {
            SampleRate(PREFERRED_SAMPLE_RATE)
        } else {
            config_range.min_sample_rate()
        };

        let sample_format = config_range.sample_format();
        let config = StreamConfig {
            channels: config_range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok((config, sample_format))
    }

    /// Average interleaved channels down to mono
    fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels <= 1 {
            return samples.to_vec();
        }

        samples
            .chunks(channels as usize)
            .map(|chunk| {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                (sum / chunk.len() as i32) as i16
            })
            .collect()
    }

    fn build_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        audio_buffer: Arc<StdMutex<Vec<i16>>>,
        is_recording: Arc<AtomicBool>,
    ) -> Result<cpal::Stream, RecordingError> {
        let channels = config.channels;
        let on_error = |err: cpal::StreamError| error!(error = %err, "audio stream error");

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if is_recording.load(Ordering::SeqCst) {
                        let mono = CpalRecorder::downmix(data, channels);
                        if let Ok(mut buffer) = audio_buffer.lock() {
                            buffer.extend_from_slice(&mono);
                        }
                    }
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if is_recording.load(Ordering::SeqCst) {
                        let i16_data: Vec<i16> =
                            data.iter().map(|&s| (s * 32767.0) as i16).collect();
                        let mono = CpalRecorder::downmix(&i16_data, channels);
                        if let Ok(mut buffer) = audio_buffer.lock() {
                            buffer.extend_from_slice(&mono);
                        }
                    }
                },
                on_error,
                None,
            ),
            other => {
                return Err(RecordingError::StartFailed(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream.map_err(|e| RecordingError::StartFailed(e.to_string()))
    }

    /// Body of the capture thread. Reports the device rate (or the start
    /// failure) through `ready`, then keeps the stream alive until stopped.
    fn capture(
        audio_buffer: Arc<StdMutex<Vec<i16>>>,
        is_recording: Arc<AtomicBool>,
        ready: oneshot::Sender<Result<u32, RecordingError>>,
    ) {
        let opened = Self::get_input_device().and_then(|device| {
            let (config, sample_format) = Self::get_input_config(&device)?;
            let stream = Self::build_stream(
                &device,
                &config,
                sample_format,
                Arc::clone(&audio_buffer),
                Arc::clone(&is_recording),
            )?;
            stream
                .play()
                .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
            Ok((stream, config.sample_rate.0))
        });

        let stream = match opened {
            Ok((stream, sample_rate)) => {
                if ready.send(Ok(sample_rate)).is_err() {
                    return;
                }
                stream
            }
            Err(e) => {
                is_recording.store(false, Ordering::SeqCst);
                let _ = ready.send(Err(e));
                return;
            }
        };

        while is_recording.load(Ordering::SeqCst) {
            std::thread::sleep(POLL_INTERVAL);
        }
        drop(stream);
    }

    fn encode(samples: &[i16], sample_rate: u32) -> Result<AudioClip, RecordingError> {
        let length = Duration::from_secs_f64(samples.len() as f64 / sample_rate as f64);
        let flac = encode_flac(samples, sample_rate)
            .map_err(|e| RecordingError::EncodingFailed(e.to_string()))?;
        Ok(AudioClip::new(flac, AudioFormat::Flac, length))
    }
}

impl Default for CpalRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CpalRecorder {
    /// Release the microphone if a take is still open. The capture thread
    /// notices within one poll interval and drops the stream.
    fn drop(&mut self) {
        let was_recording = self.is_recording.swap(false, Ordering::SeqCst);
        let handle = self
            .capture_thread
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if was_recording {
                debug!("releasing microphone from an unfinished take");
            }
            if handle.join().is_err() {
                warn!("capture thread panicked");
            }
        }
    }
}

#[async_trait]
impl AudioRecorder for CpalRecorder {
    async fn start(&self) -> Result<(), RecordingError> {
        if self.is_recording.swap(true, Ordering::SeqCst) {
            return Err(RecordingError::StartFailed(
                "Recording already in progress".to_string(),
            ));
        }

        self.audio_buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let (ready_tx, ready_rx) = oneshot::channel();
        let audio_buffer = Arc::clone(&self.audio_buffer);
        let is_recording = Arc::clone(&self.is_recording);
        let handle = std::thread::Builder::new()
            .name("fieldlink-capture".into())
            .spawn(move || CpalRecorder::capture(audio_buffer, is_recording, ready_tx))
            .map_err(|e| {
                self.is_recording.store(false, Ordering::SeqCst);
                RecordingError::StartFailed(e.to_string())
            })?;

        let sample_rate = match ready_rx.await {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(RecordingError::StartFailed(
                    "capture thread exited".to_string(),
                ));
            }
        };

        self.device_sample_rate.store(sample_rate, Ordering::SeqCst);
        *self
            .capture_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        debug!(sample_rate, "microphone capture started");
        Ok(())
    }

    async fn stop(&self) -> Result<AudioClip, RecordingError> {
        if !self.is_recording.swap(false, Ordering::SeqCst) {
            return Err(RecordingError::NotRecording);
        }

        let handle = self
            .capture_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let joined = tokio::task::spawn_blocking(move || handle.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("capture thread did not shut down cleanly");
            }
        }

        let sample_rate = self.device_sample_rate.load(Ordering::SeqCst);
        let samples = std::mem::take(
            &mut *self
                .audio_buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        if samples.is_empty() {
            return Err(RecordingError::RecordingFailed(
                "No audio data captured".to_string(),
            ));
        }
        debug!(samples = samples.len(), sample_rate, "encoding take");

        tokio::task::spawn_blocking(move || Self::encode(&samples, sample_rate))
            .await
            .map_err(|e| RecordingError::EncodingFailed(format!("Encode task error: {}", e)))?
    }
}
