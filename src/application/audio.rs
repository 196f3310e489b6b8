//! Audio recording use case with auto-stop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::recording::{
    AlreadyRecording, AudioClip, RecordingSession, RecordingState, StopReason, TakeId, AUTO_STOP,
};

use super::ports::{AudioRecorder, Capability, PermissionGate, PermissionStatus, RecordingError};

/// Errors from starting a recording
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error(transparent)]
    AlreadyRecording(#[from] AlreadyRecording),

    #[error(transparent)]
    Recorder(#[from] RecordingError),
}

/// How a take ended
#[derive(Debug, Clone)]
pub enum RecordingOutcome {
    Finished {
        take: TakeId,
        clip: AudioClip,
        reason: StopReason,
    },
    Failed {
        take: TakeId,
        error: RecordingError,
        reason: StopReason,
    },
}

impl RecordingOutcome {
    pub fn take(&self) -> TakeId {
        match self {
            Self::Finished { take, .. } | Self::Failed { take, .. } => *take,
        }
    }

    pub fn reason(&self) -> StopReason {
        match self {
            Self::Finished { reason, .. } | Self::Failed { reason, .. } => *reason,
        }
    }
}

/// Result of a manual stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopResult {
    Finalized(TakeId),
    AlreadyIdle,
}

/// Receives the outcome of every finalized take
pub type OutcomeHandoff = Arc<dyn Fn(RecordingOutcome) + Send + Sync>;

struct LiveTake {
    deadline: JoinHandle<()>,
    started_at: Instant,
}

struct Inner<R, P> {
    recorder: R,
    permissions: P,
    granted: AtomicBool,
    session: Mutex<RecordingSession<LiveTake>>,
    on_outcome: Option<OutcomeHandoff>,
}

impl<R, P> Inner<R, P>
where
    R: AudioRecorder,
    P: PermissionGate,
{
    async fn ensure_permission(&self) -> PermissionStatus {
        if self.granted.load(Ordering::SeqCst) {
            return PermissionStatus::Granted;
        }
        let status = self.permissions.request(Capability::Microphone).await;
        if status.is_granted() {
            self.granted.store(true, Ordering::SeqCst);
        }
        status
    }

    /// Stop the recorder for a take already removed from the session.
    /// Called with the session lock held.
    async fn finalize(&self, take: TakeId, started_at: Instant, reason: StopReason) {
        let outcome = match self.recorder.stop().await {
            Ok(clip) => {
                info!(
                    %take,
                    %reason,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    size = %clip.human_readable_size(),
                    "recording finalized"
                );
                RecordingOutcome::Finished { take, clip, reason }
            }
            Err(error) => {
                warn!(%take, %reason, error = %error, "recording failed to finalize");
                RecordingOutcome::Failed {
                    take,
                    error,
                    reason,
                }
            }
        };
        if let Some(handoff) = &self.on_outcome {
            handoff(outcome);
        }
    }

    /// Cancel the deadline and stop any live take, discarding the clip
    async fn teardown(&self) {
        let mut session = self.session.lock().await;
        let Some((take, live)) = session.finish() else {
            return;
        };
        live.deadline.abort();
        let reason = StopReason::Teardown;
        match self.recorder.stop().await {
            Ok(clip) => debug!(%take, %reason, size = clip.size_bytes(), "discarded clip"),
            Err(e) => warn!(%take, %reason, error = %e, "failed to stop recorder"),
        }
    }
}

impl<R, P> Drop for Inner<R, P> {
    fn drop(&mut self) {
        // Only reached with a live take when no runtime could run teardown.
        // The recorder drops right after and releases the device itself.
        if let Some((take, live)) = self.session.get_mut().finish() {
            live.deadline.abort();
            warn!(%take, reason = %StopReason::Teardown, "recording abandoned");
        }
    }
}

/// Microphone permission state plus at most one in-flight recording.
///
/// Every take ends exactly once: by `stop`, by the auto-stop deadline, or
/// by `shutdown` (which dropping the session also runs). Whichever removes
/// the take from the session first runs the finalize; the others find
/// nothing to do.
pub struct AudioSession<R, P>
where
    R: AudioRecorder + 'static,
    P: PermissionGate + 'static,
{
    inner: Arc<Inner<R, P>>,
}

impl<R, P> AudioSession<R, P>
where
    R: AudioRecorder + 'static,
    P: PermissionGate + 'static,
{
    pub fn new(recorder: R, permissions: P) -> Self {
        Self::build(recorder, permissions, None)
    }

    /// Report every finalized take to `handoff`
    pub fn with_handoff(recorder: R, permissions: P, handoff: OutcomeHandoff) -> Self {
        Self::build(recorder, permissions, Some(handoff))
    }

    fn build(recorder: R, permissions: P, on_outcome: Option<OutcomeHandoff>) -> Self {
        Self {
            inner: Arc::new(Inner {
                recorder,
                permissions,
                granted: AtomicBool::new(false),
                session: Mutex::new(RecordingSession::new()),
                on_outcome,
            }),
        }
    }

    pub async fn state(&self) -> RecordingState {
        self.inner.session.lock().await.state()
    }

    pub async fn is_recording(&self) -> bool {
        self.inner.session.lock().await.is_recording()
    }

    /// Time since the live take started
    pub async fn elapsed(&self) -> Option<Duration> {
        self.inner
            .session
            .lock()
            .await
            .active()
            .map(|live| live.started_at.elapsed())
    }

    /// Start a new take and arm the auto-stop deadline.
    ///
    /// Requests microphone permission first if it has not been granted.
    /// On any failure the session stays idle.
    pub async fn start(&self) -> Result<TakeId, AudioError> {
        let mut session = self.inner.session.lock().await;
        if let Some(active) = session.active_take() {
            return Err(AlreadyRecording { active }.into());
        }

        if !self.inner.ensure_permission().await.is_granted() {
            debug!("microphone permission denied");
            return Err(AudioError::PermissionDenied);
        }

        self.inner.recorder.start().await?;

        let inner = Arc::downgrade(&self.inner);
        let take = session.begin_with(|take| LiveTake {
            deadline: tokio::spawn(auto_stop(inner, take)),
            started_at: Instant::now(),
        })?;
        info!(%take, deadline_secs = AUTO_STOP.as_secs(), "recording started");
        Ok(take)
    }

    /// Finalize the live take now
    pub async fn stop(&self) -> StopResult {
        let mut session = self.inner.session.lock().await;
        let Some((take, live)) = session.finish() else {
            debug!("stop requested while idle");
            return StopResult::AlreadyIdle;
        };
        live.deadline.abort();
        self.inner
            .finalize(take, live.started_at, StopReason::Manual)
            .await;
        StopResult::Finalized(take)
    }

    /// Tear down: cancel the deadline and stop any live take, discarding
    /// the clip. A recorder failure here is logged, not reported.
    pub async fn shutdown(&self) {
        self.inner.teardown().await;
    }
}

impl<R, P> Drop for AudioSession<R, P>
where
    R: AudioRecorder + 'static,
    P: PermissionGate + 'static,
{
    fn drop(&mut self) {
        let idle = self
            .inner
            .session
            .try_lock()
            .is_ok_and(|session| session.is_idle());
        if idle {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            runtime.spawn(async move { inner.teardown().await });
        }
    }
}

async fn auto_stop<R, P>(inner: Weak<Inner<R, P>>, take: TakeId)
where
    R: AudioRecorder,
    P: PermissionGate,
{
    tokio::time::sleep(AUTO_STOP).await;

    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut session = inner.session.lock().await;
    // The take may already have been stopped manually or replaced.
    let Some(live) = session.finish_take(take) else {
        return;
    };
    inner
        .finalize(take, live.started_at, StopReason::Deadline)
        .await;
}
