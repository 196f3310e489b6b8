//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod capture;
pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod recording;

// Re-export common types
pub use capture::{CaptureArtifact, CapturedImage, Location};
pub use config::AppConfig;
pub use connection::{ConnectionState, Endpoint};
pub use envelope::{DecodeError, DisplayLog, Envelope, EnvelopeKind};
pub use error::*;
pub use recording::{AudioClip, AudioFormat, RecordingSession, RecordingState, StopReason, TakeId};
