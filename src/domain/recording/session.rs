//! Recording session state machine

use std::fmt;
use thiserror::Error;

/// Externally visible recording states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

impl RecordingState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier of one start-to-finalize recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TakeId(u64);

impl TakeId {
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "take-{}", self.0)
    }
}

/// What ended a take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// User pressed stop
    Manual,
    /// Auto-stop deadline expired
    Deadline,
    /// Owning view went away mid-recording
    Teardown,
}

impl StopReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Deadline => "deadline",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when a take is started while another is live
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Already recording ({active})")]
pub struct AlreadyRecording {
    pub active: TakeId,
}

/// Single source of truth for an audio session.
///
/// `H` is whatever the owner needs to keep alive for the duration of a take
/// (timer handle, start instant). It is created together with the take and
/// handed back exactly once when the take finishes, so the state and the
/// resources attached to it cannot drift apart.
///
/// State machine:
///   IDLE -> RECORDING (begin_with)
///   RECORDING -> IDLE (finish / finish_take)
#[derive(Debug)]
pub struct RecordingSession<H> {
    live: Option<(TakeId, H)>,
    next_take: u64,
}

impl<H> RecordingSession<H> {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self {
            live: None,
            next_take: 1,
        }
    }

    /// Get the current state
    pub fn state(&self) -> RecordingState {
        if self.live.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.live.is_none()
    }

    pub fn is_recording(&self) -> bool {
        self.live.is_some()
    }

    /// The live take, if any
    pub fn active_take(&self) -> Option<TakeId> {
        self.live.as_ref().map(|(take, _)| *take)
    }

    /// Borrow the resources attached to the live take
    pub fn active(&self) -> Option<&H> {
        self.live.as_ref().map(|(_, handle)| handle)
    }

    /// Transition from IDLE to RECORDING.
    ///
    /// `make` receives the new take id and builds the attached resources.
    /// It is not called when a take is already live.
    pub fn begin_with<F>(&mut self, make: F) -> Result<TakeId, AlreadyRecording>
    where
        F: FnOnce(TakeId) -> H,
    {
        if let Some(active) = self.active_take() {
            return Err(AlreadyRecording { active });
        }
        let take = TakeId(self.next_take);
        self.next_take += 1;
        self.live = Some((take, make(take)));
        Ok(take)
    }

    /// Transition from RECORDING to IDLE, whatever take is live.
    /// Returns `None` when already idle.
    pub fn finish(&mut self) -> Option<(TakeId, H)> {
        self.live.take()
    }

    /// Transition from RECORDING to IDLE only if `take` is still the live
    /// take. A stale id (already finished, or superseded) leaves the session
    /// untouched.
    pub fn finish_take(&mut self, take: TakeId) -> Option<H> {
        match &self.live {
            Some((live, _)) if *live == take => self.live.take().map(|(_, handle)| handle),
            _ => None,
        }
    }
}

impl<H> Default for RecordingSession<H> {
    fn default() -> Self {
        Self::new()
    }
}
