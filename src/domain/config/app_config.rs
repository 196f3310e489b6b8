//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::capture::Location;
use crate::domain::connection::Endpoint;
use crate::domain::error::{ConfigError, InvalidEndpoint, LocationError};

/// Every dotted key a config file may hold
pub const CONFIG_KEYS: &[&str] = &[
    "endpoint",
    "camera_command",
    "permissions.camera",
    "permissions.microphone",
    "permissions.location",
    "location.latitude",
    "location.longitude",
    "location.accuracy",
];

/// Per-capability grants used by the configured permission gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    pub camera: Option<bool>,
    pub microphone: Option<bool>,
    pub location: Option<bool>,
}

/// Fixed position reported on hosts without a positioning device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub endpoint: Option<String>,
    pub camera_command: Option<String>,
    pub permissions: Option<PermissionsConfig>,
    pub location: Option<LocationConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            endpoint: Some(Endpoint::default().to_string()),
            camera_command: None,
            permissions: Some(PermissionsConfig {
                camera: Some(true),
                microphone: Some(true),
                location: Some(true),
            }),
            location: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            endpoint: other.endpoint.or(self.endpoint),
            camera_command: other.camera_command.or(self.camera_command),
            permissions: Self::merge_permissions(self.permissions, other.permissions),
            location: Self::merge_location(self.location, other.location),
        }
    }

    fn merge_permissions(
        base: Option<PermissionsConfig>,
        other: Option<PermissionsConfig>,
    ) -> Option<PermissionsConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(PermissionsConfig {
                camera: o.camera.or(b.camera),
                microphone: o.microphone.or(b.microphone),
                location: o.location.or(b.location),
            }),
        }
    }

    fn merge_location(
        base: Option<LocationConfig>,
        other: Option<LocationConfig>,
    ) -> Option<LocationConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(LocationConfig {
                latitude: o.latitude.or(b.latitude),
                longitude: o.longitude.or(b.longitude),
                accuracy: o.accuracy.or(b.accuracy),
            }),
        }
    }

    /// Parsed endpoint; the default endpoint when unset.
    ///
    /// Unlike the other accessors an invalid value is an error rather
    /// than silently replaced, so a typo never connects somewhere else.
    pub fn endpoint_or_default(&self) -> Result<Endpoint, InvalidEndpoint> {
        match &self.endpoint {
            Some(url) => url.parse(),
            None => Ok(Endpoint::default()),
        }
    }

    /// Custom camera command, if one is configured
    pub fn camera_command(&self) -> Option<&str> {
        self.camera_command
            .as_deref()
            .filter(|cmd| !cmd.trim().is_empty())
    }

    /// Get camera grant, or true if not set
    pub fn camera_allowed_or_default(&self) -> bool {
        self.permissions
            .as_ref()
            .and_then(|p| p.camera)
            .unwrap_or(true)
    }

    /// Get microphone grant, or true if not set
    pub fn microphone_allowed_or_default(&self) -> bool {
        self.permissions
            .as_ref()
            .and_then(|p| p.microphone)
            .unwrap_or(true)
    }

    /// Get location grant, or true if not set
    pub fn location_allowed_or_default(&self) -> bool {
        self.permissions
            .as_ref()
            .and_then(|p| p.location)
            .unwrap_or(true)
    }

    /// Reject values that deserialize but cannot be used. The error names
    /// the dotted key at fault.
    ///
    /// A lone latitude or longitude passes: `config set` writes one
    /// coordinate at a time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::ValidationError {
            key: key.to_string(),
            message,
        };

        self.endpoint_or_default()
            .map_err(|e| invalid("endpoint", e.to_string()))?;
        if matches!(&self.camera_command, Some(cmd) if cmd.trim().is_empty()) {
            return Err(invalid("camera_command", "Command must not be empty".to_string()));
        }
        self.fixed_location().map_err(|e| {
            let key = match e {
                LocationError::LatitudeOutOfRange(_) => "location.latitude",
                LocationError::LongitudeOutOfRange(_) => "location.longitude",
                LocationError::InvalidAccuracy(_) => "location.accuracy",
            };
            invalid(key, e.to_string())
        })?;
        Ok(())
    }

    /// Configured fixed position. `None` unless both coordinates are set.
    pub fn fixed_location(&self) -> Result<Option<Location>, LocationError> {
        let Some(cfg) = &self.location else {
            return Ok(None);
        };
        let (Some(latitude), Some(longitude)) = (cfg.latitude, cfg.longitude) else {
            return Ok(None);
        };
        let location = Location::new(latitude, longitude)?;
        match cfg.accuracy {
            Some(accuracy) => location.with_accuracy(accuracy).map(Some),
            None => Ok(Some(location)),
        }
    }
}
