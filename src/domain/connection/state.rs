//! Connection lifecycle state

use std::fmt;

/// Lifecycle of the relay connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Socket requested, transport has not reported open yet
    #[default]
    Connecting,
    Open,
    /// Local close requested, waiting for the transport to finish
    Closing,
    /// Closed locally or by the remote end
    Closed { code: Option<u16>, reason: String },
    /// Transport failure; no automatic recovery
    Errored { reason: String },
}

impl ConnectionState {
    /// Get the short state name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed { .. } => "closed",
            Self::Errored { .. } => "errored",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether frames may still be accepted (sent now or queued)
    pub fn accepts_frames(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Closed or errored: the channel will never carry traffic again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Errored { .. })
    }

    pub(crate) fn closed_locally() -> Self {
        Self::Closed {
            code: None,
            reason: "closed by client".to_string(),
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed {
                code: Some(code),
                reason,
            } if !reason.is_empty() => write!(f, "closed ({}: {})", code, reason),
            Self::Closed { code: Some(code), .. } => write!(f, "closed ({})", code),
            Self::Closed { code: None, reason } if !reason.is_empty() => {
                write!(f, "closed ({})", reason)
            }
            Self::Errored { reason } => write!(f, "errored ({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
