//! Transport port interface

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::connection::Endpoint;

/// Transport errors
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Failed to connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },
}

/// Instruction for the socket writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Start the closing handshake
    Close,
}

/// Something the socket reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Frame(String),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// An open, full-duplex link.
///
/// Dropping `outbound` closes the writer; `inbound` ends after the
/// terminal `Closed` or `Error` event.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Port for opening the relay socket
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and complete the handshake. Returning `Ok` means the
    /// transport is open.
    async fn connect(&self, endpoint: &Endpoint) -> Result<TransportLink, TransportError>;
}
