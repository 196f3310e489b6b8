//! Fixed-position geolocator adapter

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::application::ports::{GeolocationError, Geolocator};
use crate::domain::capture::Location;

/// Reports a configured position; desktop hosts have no GPS.
///
/// Each fix is stamped with the time of the query.
#[derive(Debug, Clone, Default)]
pub struct FixedGeolocator {
    fix: Option<Location>,
}

impl FixedGeolocator {
    pub fn new(fix: Location) -> Self {
        Self { fix: Some(fix) }
    }

    /// Geolocator that always reports unavailable
    pub fn unavailable() -> Self {
        Self { fix: None }
    }

    pub fn from_config(fix: Option<Location>) -> Self {
        Self { fix }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Location, GeolocationError> {
        let fix = self.fix.ok_or(GeolocationError::Unavailable)?;
        Ok(fix.with_timestamp(now_millis()))
    }
}
