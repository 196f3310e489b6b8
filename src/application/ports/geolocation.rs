//! Geolocation port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::capture::Location;

/// Geolocation errors
#[derive(Debug, Clone, Error)]
pub enum GeolocationError {
    #[error("No position source available")]
    Unavailable,

    #[error("Failed to get current position: {0}")]
    Failed(String),
}

/// Port for one-shot position queries
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Get a fresh, high-accuracy position fix
    async fn current_position(&self) -> Result<Location, GeolocationError>;
}

/// Blanket implementation for boxed geolocator types
#[async_trait]
impl Geolocator for Box<dyn Geolocator> {
    async fn current_position(&self) -> Result<Location, GeolocationError> {
        self.as_ref().current_position().await
    }
}
