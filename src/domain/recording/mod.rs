//! Recording domain module

mod audio_clip;
mod session;

use std::time::Duration;

pub(crate) use audio_clip::human_readable_bytes;
pub use audio_clip::{AudioClip, AudioFormat, UnknownAudioFormat};
pub use session::{
    AlreadyRecording, RecordingSession, RecordingState, StopReason, TakeId,
};

/// Auto-stop deadline in seconds
pub const AUTO_STOP_SECS: u64 = 10;

/// Time after which an unattended recording is finalized automatically
pub const AUTO_STOP: Duration = Duration::from_secs(AUTO_STOP_SECS);
