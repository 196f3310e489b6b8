//! Connection domain module

mod endpoint;
mod state;

pub use endpoint::{Endpoint, DEFAULT_ENDPOINT};
pub use state::ConnectionState;
