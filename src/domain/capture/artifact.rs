//! Captured image and capture artifact value objects

use super::location::Location;

/// Raw result of a still capture as reported by a camera adapter.
///
/// A camera may hand back a reference (file path / URI), an inline base64
/// payload, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedImage {
    pub uri: Option<String>,
    pub base64: Option<String>,
}

impl CapturedImage {
    /// Image known only by reference
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            base64: None,
        }
    }

    /// Image carried inline, encoded from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        use base64::Engine;
        Self {
            uri: None,
            base64: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }

    /// Attach a reference to an inline image
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// The string relayed on the wire: the inline payload when present,
    /// otherwise the reference. `None` when the capture produced nothing.
    pub fn image_ref(&self) -> Option<&str> {
        self.base64
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.uri.as_deref().filter(|s| !s.is_empty()))
    }
}

/// A photo paired with the location sampled after the shutter completed
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureArtifact {
    image: String,
    location: Option<Location>,
}

impl CaptureArtifact {
    pub fn new(image: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            image: image.into(),
            location,
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn into_parts(self) -> (String, Option<Location>) {
        (self.image, self.location)
    }
}
