//! Process-wide owner of the relay connection

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::connection::{ConnectionState, Endpoint};
use crate::domain::envelope::Envelope;

use super::channel::{ChannelError, ChannelEvent, ConnectionChannel};
use super::ports::Connector;

#[derive(Default)]
struct Shared {
    channel: Option<Arc<ConnectionChannel>>,
    holders: usize,
}

/// Hands out leases on a single shared [`ConnectionChannel`].
///
/// The first lease opens the channel, the last one to go closes it. A lease
/// taken after the channel closed or failed gets a fresh connection.
pub struct ChannelHub {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    shared: Mutex<Shared>,
}

impl ChannelHub {
    pub fn new(endpoint: Endpoint, connector: Arc<dyn Connector>) -> Arc<Self> {
        Arc::new(Self {
            endpoint,
            connector,
            shared: Mutex::new(Shared::default()),
        })
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a lease, opening a connection if none is usable.
    ///
    /// Must be called from within a tokio runtime.
    pub fn acquire(self: &Arc<Self>) -> ChannelLease {
        let mut shared = self.shared();
        let channel = match &shared.channel {
            Some(channel) if !channel.state().is_terminal() => Arc::clone(channel),
            _ => {
                let channel = Arc::new(ConnectionChannel::new(
                    self.endpoint.clone(),
                    Arc::clone(&self.connector),
                ));
                channel.open();
                shared.channel = Some(Arc::clone(&channel));
                channel
            }
        };
        shared.holders += 1;
        debug!(holders = shared.holders, "channel lease acquired");
        ChannelLease {
            hub: Arc::clone(self),
            channel,
        }
    }

    /// Number of live leases
    pub fn holders(&self) -> usize {
        self.shared().holders
    }

    /// The shared channel, if one has been opened and not yet released
    pub fn current(&self) -> Option<Arc<ConnectionChannel>> {
        self.shared().channel.clone()
    }

    fn release(&self) {
        let mut shared = self.shared();
        shared.holders = shared.holders.saturating_sub(1);
        debug!(holders = shared.holders, "channel lease released");
        if shared.holders == 0 {
            if let Some(channel) = shared.channel.take() {
                drop(shared);
                channel.close();
            }
        }
    }
}

/// Shared access to the hub's channel; releasing happens on drop.
///
/// A lease can send and observe but not close: only the hub closes the
/// channel, once the last lease is gone.
pub struct ChannelLease {
    hub: Arc<ChannelHub>,
    channel: Arc<ConnectionChannel>,
}

impl ChannelLease {
    pub fn send(&self, envelope: &Envelope) -> Result<(), ChannelError> {
        self.channel.send(envelope)
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChannelEvent> {
        self.channel.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Frames queued until the channel opens
    pub fn pending(&self) -> usize {
        self.channel.pending()
    }

    pub(crate) fn channel(&self) -> &Arc<ConnectionChannel> {
        &self.channel
    }
}

impl Drop for ChannelLease {
    fn drop(&mut self) {
        self.hub.release();
    }
}
