//! Connection channel: the single live socket to the relay service

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::connection::{ConnectionState, Endpoint};
use crate::domain::envelope::{DecodeError, EncodeError, Envelope};

use super::ports::{Connector, OutboundFrame, TransportEvent, TransportLink};

/// Errors from sending on the channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Not connected (connection is {0})")]
    NotConnected(ConnectionState),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Something subscribers need to know about
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(Envelope),
    Malformed { raw: String, error: DecodeError },
    Status(ConnectionState),
    TransportError(String),
}

#[derive(Default)]
struct Core {
    state: ConnectionState,
    pending: VecDeque<String>,
    outbound: Option<mpsc::UnboundedSender<OutboundFrame>>,
    subscribers: Vec<mpsc::UnboundedSender<ChannelEvent>>,
}

impl Core {
    fn emit(&mut self, event: ChannelEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "connection state changed");
        self.state = state.clone();
        self.emit(ChannelEvent::Status(state));
    }

    fn discard_pending(&mut self) {
        let discarded = self.pending.len();
        if discarded > 0 {
            warn!(discarded, "dropping frames queued before the connection opened");
            self.pending.clear();
        }
    }
}

fn lock(core: &Mutex<Core>) -> MutexGuard<'_, Core> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One socket, its lifecycle, and the frames sent before it opened.
///
/// State transitions:
///   connecting -> open -> closing -> closed
///   connecting | open | closing -> errored
///   connecting -> closed (closed before the handshake finished)
pub struct ConnectionChannel {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    core: Arc<Mutex<Core>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionChannel {
    pub fn new(endpoint: Endpoint, connector: Arc<dyn Connector>) -> Self {
        Self {
            endpoint,
            connector,
            core: Arc::new(Mutex::new(Core::default())),
            driver: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.core).state.clone()
    }

    /// Frames waiting for the connection to open
    pub fn pending(&self) -> usize {
        lock(&self.core).pending.len()
    }

    /// Start connecting in the background. Calling it again is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self) {
        let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        if driver.is_some() || !matches!(self.state(), ConnectionState::Connecting) {
            return;
        }
        info!(endpoint = %self.endpoint, "connecting");
        *driver = Some(tokio::spawn(drive(
            Arc::clone(&self.connector),
            self.endpoint.clone(),
            Arc::clone(&self.core),
        )));
    }

    /// Receive every event from now on.
    ///
    /// The first event is always the current state.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChannelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut core = lock(&self.core);
        // Cannot fail: we hold the receiver.
        let _ = tx.send(ChannelEvent::Status(core.state.clone()));
        core.subscribers.push(tx);
        rx
    }

    /// Serialize and transmit one envelope.
    ///
    /// While connecting the frame is queued and flushed in order on open.
    pub fn send(&self, envelope: &Envelope) -> Result<(), ChannelError> {
        let frame = envelope.encode()?;
        let mut core = lock(&self.core);
        if !core.state.accepts_frames() {
            return Err(ChannelError::NotConnected(core.state.clone()));
        }
        if !core.state.is_open() {
            core.pending.push_back(frame);
            debug!(
                kind = %envelope.kind(),
                queued = core.pending.len(),
                "frame queued until open"
            );
            return Ok(());
        }

        let writer_gone = || ChannelError::Transport("socket writer is gone".to_string());
        core.outbound
            .as_ref()
            .ok_or_else(writer_gone)?
            .send(OutboundFrame::Text(frame))
            .map_err(|_| writer_gone())?;
        debug!(kind = %envelope.kind(), "frame sent");
        Ok(())
    }

    /// Tear the socket down. Idempotent.
    pub fn close(&self) {
        let mut core = lock(&self.core);
        match core.state {
            ConnectionState::Connecting => {
                core.discard_pending();
                core.set_state(ConnectionState::closed_locally());
                drop(core);
                if let Some(driver) = self
                    .driver
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
                {
                    driver.abort();
                }
            }
            ConnectionState::Open => {
                if let Some(outbound) = core.outbound.take() {
                    let _ = outbound.send(OutboundFrame::Close);
                }
                core.set_state(ConnectionState::Closing);
            }
            _ => {}
        }
    }
}

impl Drop for ConnectionChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn drive(connector: Arc<dyn Connector>, endpoint: Endpoint, core: Arc<Mutex<Core>>) {
    let TransportLink {
        outbound,
        mut inbound,
    } = match connector.connect(&endpoint).await {
        Ok(link) => link,
        Err(e) => {
            warn!(endpoint = %endpoint, error = %e, "connection failed");
            let mut core = lock(&core);
            core.discard_pending();
            core.emit(ChannelEvent::TransportError(e.to_string()));
            core.set_state(ConnectionState::Errored {
                reason: e.to_string(),
            });
            return;
        }
    };

    {
        let mut core = lock(&core);
        if !matches!(core.state, ConnectionState::Connecting) {
            // Closed while the handshake was in flight.
            let _ = outbound.send(OutboundFrame::Close);
            return;
        }
        let flushed = core.pending.len();
        while let Some(frame) = core.pending.pop_front() {
            if outbound.send(OutboundFrame::Text(frame)).is_err() {
                break;
            }
        }
        core.outbound = Some(outbound);
        core.set_state(ConnectionState::Open);
        info!(endpoint = %endpoint, flushed, "connection open");
    }

    while let Some(event) = inbound.recv().await {
        let mut core = lock(&core);
        match event {
            TransportEvent::Frame(raw) => match Envelope::decode(&raw) {
                Ok(envelope) => {
                    debug!(kind = %envelope.kind(), "frame received");
                    core.emit(ChannelEvent::Message(envelope));
                }
                Err(error) => {
                    warn!(raw_len = raw.len(), error = %error, "dropping malformed frame");
                    core.emit(ChannelEvent::Malformed { raw, error });
                }
            },
            TransportEvent::Closed { code, reason } => {
                info!(?code, reason = %reason, "connection closed");
                core.outbound = None;
                core.set_state(ConnectionState::Closed { code, reason });
                return;
            }
            TransportEvent::Error(reason) => {
                warn!(error = %reason, "transport error");
                core.outbound = None;
                core.emit(ChannelEvent::TransportError(reason.clone()));
                core.set_state(ConnectionState::Errored { reason });
                return;
            }
        }
    }

    let mut core = lock(&core);
    core.outbound = None;
    if !core.state.is_terminal() {
        core.set_state(ConnectionState::Closed {
            code: None,
            reason: "transport ended".to_string(),
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::ports::TransportError;
    use async_trait::async_trait;
    use tokio::sync::oneshot;

    /// Remote end of a mock link, handed to the test
    pub(crate) struct RemoteEnd {
        pub frames: mpsc::UnboundedReceiver<OutboundFrame>,
        pub events: mpsc::UnboundedSender<TransportEvent>,
    }

    impl RemoteEnd {
        pub async fn next_text(&mut self) -> Option<String> {
            match self.frames.recv().await? {
                OutboundFrame::Text(text) => Some(text),
                OutboundFrame::Close => None,
            }
        }
    }

    /// Connector whose handshake completes when the test says so
    pub(crate) struct MockConnector {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<(), TransportError>>>>,
        remotes: mpsc::UnboundedSender<RemoteEnd>,
    }

    pub(crate) struct ConnectorControl {
        gates: Vec<oneshot::Sender<Result<(), TransportError>>>,
        pub remotes: mpsc::UnboundedReceiver<RemoteEnd>,
    }

    impl ConnectorControl {
        /// Finish the next pending handshake
        pub fn complete(&mut self, result: Result<(), TransportError>) {
            let gate = self.gates.remove(0);
            let _ = gate.send(result);
        }
    }

    impl MockConnector {
        /// Connector that can serve `connections` handshakes
        pub fn new(connections: usize) -> (Arc<Self>, ConnectorControl) {
            let mut senders = Vec::new();
            let mut receivers = VecDeque::new();
            for _ in 0..connections {
                let (tx, rx) = oneshot::channel();
                senders.push(tx);
                receivers.push_back(rx);
            }
            let (remote_tx, remote_rx) = mpsc::unbounded_channel();
            let connector = Arc::new(Self {
                gates: Mutex::new(receivers),
                remotes: remote_tx,
            });
            let control = ConnectorControl {
                gates: senders,
                remotes: remote_rx,
            };
            (connector, control)
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, endpoint: &Endpoint) -> Result<TransportLink, TransportError> {
            let gate = self.gates.lock().unwrap().pop_front();
            let refused = || TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: "refused".to_string(),
            };
            match gate {
                Some(gate) => gate.await.map_err(|_| refused())??,
                None => return Err(refused()),
            }
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            let _ = self.remotes.send(RemoteEnd {
                frames: out_rx,
                events: in_tx,
            });
            Ok(TransportLink {
                outbound: out_tx,
                inbound: in_rx,
            })
        }
    }

    fn channel(connector: Arc<MockConnector>) -> ConnectionChannel {
        ConnectionChannel::new(Endpoint::default(), connector)
    }

    async fn wait_for_state(
        events: &mut mpsc::UnboundedReceiver<ChannelEvent>,
        wanted: fn(&ConnectionState) -> bool,
    ) -> ConnectionState {
        loop {
            match events.recv().await {
                Some(ChannelEvent::Status(state)) if wanted(&state) => return state,
                Some(_) => continue,
                None => panic!("event stream ended"),
            }
        }
    }

    #[tokio::test]
    async fn subscribe_starts_with_current_state() {
        let (connector, _control) = MockConnector::new(1);
        let channel = channel(connector);
        let mut events = channel.subscribe();
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::Status(ConnectionState::Connecting))
        );
    }

    #[tokio::test]
    async fn sends_before_open_are_flushed_in_order() {
        let (connector, mut control) = MockConnector::new(1);
        let channel = channel(connector);
        let mut events = channel.subscribe();
        channel.open();

        channel.send(&Envelope::text("one")).unwrap();
        channel.send(&Envelope::text("two")).unwrap();
        assert_eq!(channel.pending(), 2);

        control.complete(Ok(()));
        wait_for_state(&mut events, ConnectionState::is_open).await;
        channel.send(&Envelope::text("three")).unwrap();

        let mut remote = control.remotes.recv().await.unwrap();
        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(remote.next_text().await.unwrap());
        }
        assert_eq!(
            received,
            vec![
                r#"{"type":"text","data":"one"}"#,
                r#"{"type":"text","data":"two"}"#,
                r#"{"type":"text","data":"three"}"#,
            ]
        );
        assert_eq!(channel.pending(), 0);
    }

    #[tokio::test]
    async fn inbound_frames_arrive_in_order_and_malformed_are_flagged() {
        let (connector, mut control) = MockConnector::new(1);
        let channel = channel(connector);
        let mut events = channel.subscribe();
        channel.open();
        control.complete(Ok(()));
        wait_for_state(&mut events, ConnectionState::is_open).await;

        let remote = control.remotes.recv().await.unwrap();
        for raw in [
            r#"{"type":"text","data":"a"}"#,
            "not json",
            r#"{"type":"bogus","data":1}"#,
            r#"{"type":"text","data":"b"}"#,
        ] {
            remote.events.send(TransportEvent::Frame(raw.into())).unwrap();
        }

        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::Message(Envelope::text("a")))
        );
        assert!(matches!(
            events.recv().await,
            Some(ChannelEvent::Malformed {
                ref raw,
                error: DecodeError::InvalidJson(_),
            }) if raw == "not json"
        ));
        assert!(matches!(
            events.recv().await,
            Some(ChannelEvent::Malformed {
                error: DecodeError::UnknownType(_),
                ..
            })
        ));
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::Message(Envelope::text("b")))
        );
        assert!(channel.state().is_open());
    }

    #[tokio::test]
    async fn remote_close_carries_code_and_reason() {
        let (connector, mut control) = MockConnector::new(1);
        let channel = channel(connector);
        let mut events = channel.subscribe();
        channel.open();
        control.complete(Ok(()));
        wait_for_state(&mut events, ConnectionState::is_open).await;

        let remote = control.remotes.recv().await.unwrap();
        remote
            .events
            .send(TransportEvent::Closed {
                code: Some(1001),
                reason: "going away".into(),
            })
            .unwrap();

        let state = wait_for_state(&mut events, ConnectionState::is_terminal).await;
        assert_eq!(
            state,
            ConnectionState::Closed {
                code: Some(1001),
                reason: "going away".into()
            }
        );
        assert!(matches!(
            channel.send(&Envelope::text("late")),
            Err(ChannelError::NotConnected(_))
        ));
    }

    #[tokio::test]
    async fn connect_failure_discards_queue_and_errors() {
        let (connector, mut control) = MockConnector::new(1);
        let channel = channel(connector);
        let mut events = channel.subscribe();
        channel.open();
        channel.send(&Envelope::text("lost")).unwrap();

        control.complete(Err(TransportError::ConnectFailed {
            endpoint: "ws://localhost:8765".into(),
            reason: "refused".into(),
        }));

        let state = wait_for_state(&mut events, ConnectionState::is_terminal).await;
        assert!(matches!(state, ConnectionState::Errored { .. }));
        assert_eq!(channel.pending(), 0);
        assert!(matches!(
            channel.send(&Envelope::text("x")),
            Err(ChannelError::NotConnected(ConnectionState::Errored { .. }))
        ));
    }

    #[tokio::test]
    async fn transport_error_moves_to_errored() {
        let (connector, mut control) = MockConnector::new(1);
        let channel = channel(connector);
        let mut events = channel.subscribe();
        channel.open();
        control.complete(Ok(()));
        wait_for_state(&mut events, ConnectionState::is_open).await;

        let remote = control.remotes.recv().await.unwrap();
        remote
            .events
            .send(TransportEvent::Error("connection reset".into()))
            .unwrap();

        loop {
            if let Some(ChannelEvent::TransportError(reason)) = events.recv().await {
                assert_eq!(reason, "connection reset");
                break;
            }
        }
        let state = wait_for_state(&mut events, ConnectionState::is_terminal).await;
        assert!(matches!(state, ConnectionState::Errored { .. }));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (connector, mut control) = MockConnector::new(1);
        let channel = channel(connector);
        let mut events = channel.subscribe();
        channel.open();
        control.complete(Ok(()));
        wait_for_state(&mut events, ConnectionState::is_open).await;

        channel.close();
        channel.close();
        assert_eq!(channel.state(), ConnectionState::Closing);
        assert!(matches!(
            channel.send(&Envelope::text("x")),
            Err(ChannelError::NotConnected(ConnectionState::Closing))
        ));

        let mut remote = control.remotes.recv().await.unwrap();
        assert_eq!(remote.frames.recv().await, Some(OutboundFrame::Close));
        remote
            .events
            .send(TransportEvent::Closed {
                code: Some(1000),
                reason: String::new(),
            })
            .unwrap();
        wait_for_state(&mut events, ConnectionState::is_terminal).await;
        channel.close();
        assert!(channel.state().is_terminal());
    }

    #[tokio::test]
    async fn close_while_connecting() {
        let (connector, _control) = MockConnector::new(1);
        let channel = channel(connector);
        channel.open();
        channel.send(&Envelope::text("queued")).unwrap();

        channel.close();

        assert_eq!(channel.state(), ConnectionState::closed_locally());
        assert_eq!(channel.pending(), 0);
    }

    #[tokio::test]
    async fn open_twice_connects_once() {
        let (connector, mut control) = MockConnector::new(2);
        let channel = channel(connector);
        let mut events = channel.subscribe();
        channel.open();
        channel.open();
        control.complete(Ok(()));
        wait_for_state(&mut events, ConnectionState::is_open).await;

        control.remotes.recv().await.unwrap();
        assert!(control.remotes.try_recv().is_err());
    }
}
