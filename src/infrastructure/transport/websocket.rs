//! WebSocket transport adapter using tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace, warn};

use crate::application::ports::{
    Connector, OutboundFrame, TransportError, TransportEvent, TransportLink,
};
use crate::domain::connection::Endpoint;

/// Close code reported when the socket ends without a close frame
const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported for a close frame that carries no status
const NO_STATUS_RECEIVED: u16 = 1005;

/// Terminal event for a close frame from the peer
fn closed_by_peer(frame: Option<CloseFrame<'_>>) -> TransportEvent {
    match frame {
        Some(frame) => TransportEvent::Closed {
            code: Some(u16::from(frame.code)),
            reason: frame.reason.into_owned(),
        },
        None => TransportEvent::Closed {
            code: Some(NO_STATUS_RECEIVED),
            reason: String::new(),
        },
    }
}

/// Opens one WebSocket per `connect` call.
///
/// Each link runs a writer task draining the outbound queue and a reader
/// task forwarding frames until the socket closes.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<TransportLink, TransportError> {
        let (socket, response) =
            connect_async(endpoint.as_str())
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
        debug!(endpoint = %endpoint, status = %response.status(), "websocket handshake complete");

        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();

        let writer_errors = inbound_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let message = match frame {
                    OutboundFrame::Text(text) => Message::Text(text),
                    OutboundFrame::Close => break,
                };
                if let Err(e) = sink.send(message).await {
                    warn!(error = %e, "websocket write failed");
                    let _ = writer_errors.send(TransportEvent::Error(e.to_string()));
                    return;
                }
            }
            // Close requested, or every sender is gone.
            let close = Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            }));
            if let Err(e) = sink.send(close).await {
                debug!(error = %e, "close frame not sent");
            }
        });

        tokio::spawn(async move {
            let terminal = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "text frame");
                        if inbound_tx.send(TransportEvent::Frame(text)).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        // Forwarded so the decoder can report it.
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        if inbound_tx.send(TransportEvent::Frame(text)).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => break closed_by_peer(frame),
                    Some(Ok(_)) => {}
                    Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                        break TransportEvent::Closed {
                            code: Some(ABNORMAL_CLOSURE),
                            reason: "connection dropped".to_string(),
                        };
                    }
                    Some(Err(e)) => break TransportEvent::Error(e.to_string()),
                }
            };
            let _ = inbound_tx.send(terminal);
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
