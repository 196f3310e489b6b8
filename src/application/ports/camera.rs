//! Camera port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::capture::CapturedImage;

/// Camera errors
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to take picture: {0}")]
    CaptureFailed(String),
}

/// Port for still-image capture
#[async_trait]
pub trait Camera: Send + Sync {
    /// Trigger the shutter and wait for the picture.
    ///
    /// # Returns
    /// The captured image, `None` if the device completed without data,
    /// or an error
    async fn take_picture(&self) -> Result<Option<CapturedImage>, CameraError>;
}

/// Blanket implementation for boxed camera types
#[async_trait]
impl Camera for Box<dyn Camera> {
    async fn take_picture(&self) -> Result<Option<CapturedImage>, CameraError> {
        self.as_ref().take_picture().await
    }
}
