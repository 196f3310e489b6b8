//! Relay coordinator use case

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::capture::CaptureArtifact;
use crate::domain::connection::ConnectionState;
use crate::domain::envelope::{DecodeError, DisplayLog, Envelope};
use crate::domain::recording::AudioClip;

use super::channel::{ChannelError, ChannelEvent, ConnectionChannel};
use super::hub::ChannelLease;

/// Errors from relaying user input
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Nothing to send: message is empty")]
    EmptyText,

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// What happened on the inbound side
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Appended to the display log
    Received(Envelope),
    Malformed { raw: String, error: DecodeError },
    Status(ConnectionState),
    TransportError(String),
}

/// Cloneable send-side of the relay, for capture and audio handoffs
#[derive(Clone)]
pub struct RelayOutbox {
    channel: Arc<ConnectionChannel>,
}

impl RelayOutbox {
    pub fn send(&self, envelope: &Envelope) -> Result<(), RelayError> {
        self.channel.send(envelope)?;
        Ok(())
    }

    /// Send free text; blank input is rejected
    pub fn send_text(&self, text: &str) -> Result<(), RelayError> {
        if text.trim().is_empty() {
            return Err(RelayError::EmptyText);
        }
        self.send(&Envelope::text(text))
    }

    pub fn send_artifact(&self, artifact: CaptureArtifact) -> Result<(), RelayError> {
        self.send(&Envelope::photo(artifact))
    }

    pub fn send_clip(&self, clip: &AudioClip) -> Result<(), RelayError> {
        self.send(&Envelope::audio(clip))
    }
}

/// Joins the input modalities to the connection and keeps the display log.
///
/// Holds a lease on the shared channel for as long as it lives.
pub struct RelayCoordinator {
    lease: ChannelLease,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    log: DisplayLog,
}

impl RelayCoordinator {
    pub fn new(lease: ChannelLease) -> Self {
        let events = lease.subscribe();
        Self {
            lease,
            events,
            log: DisplayLog::new(),
        }
    }

    pub fn outbox(&self) -> RelayOutbox {
        RelayOutbox {
            channel: Arc::clone(self.lease.channel()),
        }
    }

    pub fn send_text(&self, text: &str) -> Result<(), RelayError> {
        self.outbox().send_text(text)
    }

    pub fn send_artifact(&self, artifact: CaptureArtifact) -> Result<(), RelayError> {
        self.outbox().send_artifact(artifact)
    }

    pub fn send_clip(&self, clip: &AudioClip) -> Result<(), RelayError> {
        self.outbox().send_clip(clip)
    }

    pub fn state(&self) -> ConnectionState {
        self.lease.state()
    }

    pub fn display_log(&self) -> &DisplayLog {
        &self.log
    }

    /// Wait for the next inbound event.
    ///
    /// Well-formed envelopes are appended to the display log before they
    /// are returned. `None` once the channel is gone.
    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        let event = match self.events.recv().await? {
            ChannelEvent::Message(envelope) => {
                self.log.append(envelope.clone());
                debug!(entries = self.log.len(), "display log updated");
                RelayEvent::Received(envelope)
            }
            ChannelEvent::Malformed { raw, error } => RelayEvent::Malformed { raw, error },
            ChannelEvent::Status(state) => RelayEvent::Status(state),
            ChannelEvent::TransportError(reason) => RelayEvent::TransportError(reason),
        };
        Some(event)
    }
}
