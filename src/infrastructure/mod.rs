//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like the microphone, a camera
//! command, and the WebSocket relay.

pub mod camera;
pub mod config;
pub mod location;
pub mod permissions;
pub mod recording;
pub mod transport;

// Re-export adapters
pub use camera::{CommandCamera, FileCamera};
pub use config::XdgConfigStore;
pub use location::FixedGeolocator;
pub use permissions::ConfiguredPermissions;
pub use recording::CpalRecorder;
pub use transport::WebSocketConnector;
