//! Audio clip value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Container/codec of a relayed clip, written as a MIME type on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioFormat {
    #[default]
    Flac,
    Ogg,
    Wav,
    Mp4,
    Webm,
}

impl AudioFormat {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
            Self::Mp4 => "audio/mp4",
            Self::Webm => "audio/webm",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for a MIME type outside the known set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported audio format: \"{0}\"")]
pub struct UnknownAudioFormat(pub String);

impl FromStr for AudioFormat {
    type Err = UnknownAudioFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio/flac" => Ok(Self::Flac),
            "audio/ogg" => Ok(Self::Ogg),
            "audio/wav" => Ok(Self::Wav),
            "audio/mp4" => Ok(Self::Mp4),
            "audio/webm" => Ok(Self::Webm),
            _ => Err(UnknownAudioFormat(s.to_string())),
        }
    }
}

/// Encoded audio from one finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    data: Vec<u8>,
    format: AudioFormat,
    length: Duration,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, format: AudioFormat, length: Duration) -> Self {
        Self {
            data,
            format,
            length,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Recorded length (wall time between start and finalize)
    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        human_readable_bytes(self.size_bytes())
    }

    /// Encode the audio data as base64
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

pub(crate) fn human_readable_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
