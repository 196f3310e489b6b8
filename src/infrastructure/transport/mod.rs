//! Transport infrastructure module

mod websocket;

pub use websocket::WebSocketConnector;
