//! Application layer - Use cases and port interfaces
//!
//! Contains the components that coordinate capture, recording and
//! relaying, plus the port traits they depend on.

pub mod audio;
pub mod capture;
pub mod channel;
pub mod hub;
pub mod location;
pub mod ports;
pub mod relay;

pub use audio::{AudioError, AudioSession, OutcomeHandoff, RecordingOutcome, StopResult};
pub use capture::{ArtifactHandoff, CaptureError, CaptureSession};
pub use channel::{ChannelError, ChannelEvent, ConnectionChannel};
pub use hub::{ChannelHub, ChannelLease};
pub use location::LocationProvider;
pub use relay::{RelayCoordinator, RelayError, RelayEvent, RelayOutbox};
