//! Endpoint value object

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidEndpoint;

/// Default relay endpoint
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8765";

/// Address of the remote assistant service.
/// Validated on creation: must be a `ws://` or `wss://` URL with a host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    url: String,
}

impl Endpoint {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Whether the connection is TLS-protected
    pub fn is_secure(&self) -> bool {
        self.url.starts_with("wss://")
    }
}

impl FromStr for Endpoint {
    type Err = InvalidEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = s.trim();
        let invalid = || InvalidEndpoint {
            input: s.to_string(),
        };

        let rest = url
            .strip_prefix("ws://")
            .or_else(|| url.strip_prefix("wss://"))
            .ok_or_else(invalid)?;

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || host.starts_with(':') || rest.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self {
            url: url.to_string(),
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
        }
    }
}
