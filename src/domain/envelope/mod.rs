//! Relay envelope domain module

mod display_log;
#[allow(clippy::module_inception)]
mod envelope;

pub use display_log::DisplayLog;
pub use envelope::{
    AudioPayload, DecodeError, EncodeError, Envelope, EnvelopeKind, PhotoPayload,
};
