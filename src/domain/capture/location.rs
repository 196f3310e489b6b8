//! Location value object

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::LocationError;

/// A single position fix.
///
/// Produced fresh for every capture and never cached. Optional fields are
/// omitted from the wire form when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Location {
    /// Create a validated location without accuracy or timestamp
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        let location = Self {
            latitude,
            longitude,
            accuracy: None,
            timestamp: None,
        };
        location.validate()?;
        Ok(location)
    }

    /// Attach a horizontal accuracy in meters
    pub fn with_accuracy(mut self, accuracy: f64) -> Result<Self, LocationError> {
        if !accuracy.is_finite() || accuracy < 0.0 {
            return Err(LocationError::InvalidAccuracy(accuracy));
        }
        self.accuracy = Some(accuracy);
        Ok(self)
    }

    /// Attach the fix time in milliseconds since the Unix epoch
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Check coordinate ranges
    pub fn validate(&self) -> Result<(), LocationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(LocationError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(LocationError::LongitudeOutOfRange(self.longitude));
        }
        if let Some(accuracy) = self.accuracy {
            if !accuracy.is_finite() || accuracy < 0.0 {
                return Err(LocationError::InvalidAccuracy(accuracy));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)?;
        if let Some(accuracy) = self.accuracy {
            write!(f, " (±{:.0}m)", accuracy)?;
        }
        Ok(())
    }
}
