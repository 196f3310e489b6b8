//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod camera;
pub mod config;
pub mod geolocation;
pub mod permissions;
pub mod recorder;
pub mod transport;

// Re-export common types
pub use camera::{Camera, CameraError};
pub use config::ConfigStore;
pub use geolocation::{GeolocationError, Geolocator};
pub use permissions::{Capability, PermissionGate, PermissionStatus};
pub use recorder::{AudioRecorder, RecordingError};
pub use transport::{Connector, OutboundFrame, TransportError, TransportEvent, TransportLink};
