//! Recording port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::AudioClip;

/// Recording errors
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("Failed to start recording: {0}")]
    StartFailed(String),

    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    #[error("Failed to encode audio: {0}")]
    EncodingFailed(String),

    #[error("Not recording")]
    NotRecording,

    #[error("No audio device available")]
    NoAudioDevice,
}

/// Port for open-ended microphone recording.
///
/// The caller decides when a recording ends; the recorder only captures
/// and encodes.
#[async_trait]
pub trait AudioRecorder: Send + Sync {
    /// Begin capturing from the microphone
    async fn start(&self) -> Result<(), RecordingError>;

    /// Stop capturing and return the encoded clip
    async fn stop(&self) -> Result<AudioClip, RecordingError>;
}

/// Blanket implementation for boxed recorder types
#[async_trait]
impl AudioRecorder for Box<dyn AudioRecorder> {
    async fn start(&self) -> Result<(), RecordingError> {
        self.as_ref().start().await
    }

    async fn stop(&self) -> Result<AudioClip, RecordingError> {
        self.as_ref().stop().await
    }
}
