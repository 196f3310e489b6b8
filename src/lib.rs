//! fieldlink - capture-and-relay client for a remote assistant
//!
//! Takes geotagged photos, short voice clips and typed questions, and
//! relays them as JSON envelopes over one WebSocket connection. Replies
//! land in a display log.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Envelopes, locations, audio clips, connection state, config
//! - **Application**: Sessions, the connection channel and hub, the relay
//!   coordinator, and the port traits they depend on
//! - **Infrastructure**: Adapters (cpal microphone, camera command,
//!   WebSocket transport, XDG config store)
//! - **CLI**: Argument parsing, presenter, and the session runners

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
