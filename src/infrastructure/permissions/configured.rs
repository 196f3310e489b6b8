//! Configuration-driven permission gate

use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::{Capability, PermissionGate, PermissionStatus};
use crate::domain::config::AppConfig;

/// Grants or denies each capability from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredPermissions {
    camera: bool,
    microphone: bool,
    location: bool,
}

impl ConfiguredPermissions {
    /// Grant everything
    pub fn allow_all() -> Self {
        Self {
            camera: true,
            microphone: true,
            location: true,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            camera: config.camera_allowed_or_default(),
            microphone: config.microphone_allowed_or_default(),
            location: config.location_allowed_or_default(),
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Camera => self.camera,
            Capability::Microphone => self.microphone,
            Capability::Location => self.location,
        }
    }
}

impl Default for ConfiguredPermissions {
    fn default() -> Self {
        Self::allow_all()
    }
}

#[async_trait]
impl PermissionGate for ConfiguredPermissions {
    async fn request(&self, capability: Capability) -> PermissionStatus {
        let status = if self.allows(capability) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        debug!(%capability, ?status, "permission request");
        status
    }
}
