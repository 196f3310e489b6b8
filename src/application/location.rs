//! Location provider use case

use tracing::{debug, warn};

use crate::domain::capture::Location;

use super::ports::{Capability, Geolocator, PermissionGate};

/// One-shot position lookup behind a permission check.
///
/// Never fails: a denial or any lookup error resolves to `None`.
pub struct LocationProvider<G, P>
where
    G: Geolocator,
    P: PermissionGate,
{
    geolocator: G,
    permissions: P,
}

impl<G, P> LocationProvider<G, P>
where
    G: Geolocator,
    P: PermissionGate,
{
    pub fn new(geolocator: G, permissions: P) -> Self {
        Self {
            geolocator,
            permissions,
        }
    }

    /// Fresh position fix, or `None` when unavailable
    pub async fn current_location(&self) -> Option<Location> {
        if !self
            .permissions
            .request(Capability::Location)
            .await
            .is_granted()
        {
            debug!("location permission denied");
            return None;
        }

        match self.geolocator.current_position().await {
            Ok(location) => match location.validate() {
                Ok(()) => Some(location),
                Err(e) => {
                    warn!(error = %e, "discarding invalid position fix");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "location lookup failed");
                None
            }
        }
    }
}
