//! Permission port interface

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Device capabilities guarded by a user grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
    Microphone,
    Location,
}

impl Capability {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Answer to a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Port for asking the user (or policy) for device access.
///
/// Requests never fail: anything short of a grant is a denial.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request(&self, capability: Capability) -> PermissionStatus;
}

/// Shared gates: one grant source serves every session
#[async_trait]
impl<T: PermissionGate + ?Sized> PermissionGate for Arc<T> {
    async fn request(&self, capability: Capability) -> PermissionStatus {
        self.as_ref().request(capability).await
    }
}

/// Blanket implementation for boxed gate types
#[async_trait]
impl PermissionGate for Box<dyn PermissionGate> {
    async fn request(&self, capability: Capability) -> PermissionStatus {
        self.as_ref().request(capability).await
    }
}
