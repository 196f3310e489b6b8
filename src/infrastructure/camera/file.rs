//! Image-file camera adapter

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::{Camera, CameraError};
use crate::domain::capture::CapturedImage;

/// Camera that re-reads one image file on every capture.
///
/// Useful on hosts without a camera, and for replaying a fixed scene.
#[derive(Debug, Clone)]
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Camera for FileCamera {
    async fn take_picture(&self) -> Result<Option<CapturedImage>, CameraError> {
        let bytes = fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CameraError::Unavailable(format!("{} does not exist", self.path.display()))
            } else {
                CameraError::CaptureFailed(format!("{}: {}", self.path.display(), e))
            }
        })?;

        if bytes.is_empty() {
            return Ok(None);
        }

        let uri = match fs::canonicalize(&self.path).await {
            Ok(abs) => format!("file://{}", abs.display()),
            Err(_) => format!("file://{}", self.path.display()),
        };
        Ok(Some(CapturedImage::from_bytes(&bytes).with_uri(uri)))
    }
}
