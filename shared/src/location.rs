//! Best-effort address for the report draft.
//!
//! Resolution never fails: every error along the way degrades to one of the location
//! sentinels, because an address is convenience metadata and never blocks submission.
//! The resolver itself performs no I/O. The coordinator feeds it shell answers one at a
//! time and it names the next request.

use tracing::{debug, info, warn};

use crate::capabilities::{
    GeocodeOutput, GeocodeResult, LocationOutput, LocationRequest, LocationResult,
};
use crate::config::{GeocodingConfig, LocationConfig};
use crate::model::LatLon;
use crate::{LOCATION_PERMISSION_DENIED, LOCATION_UNAVAILABLE, LOCATION_UNKNOWN};

/// What the resolution needs next.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationStep {
    /// Resolution is over; this is the location text.
    Settled(String),
    /// Ask the shell for its cached position.
    LastKnown,
    /// Ask for exactly one live update.
    LiveFix(LocationRequest),
    /// Reverse-geocode this position.
    Describe(LatLon),
}

#[derive(Debug, Clone, Default)]
pub struct LocationResolver {
    location: LocationConfig,
    geocoding: GeocodingConfig,
}

impl LocationResolver {
    #[must_use]
    pub fn new(location: &LocationConfig, geocoding: &GeocodingConfig) -> Self {
        Self {
            location: location.clone(),
            geocoding: geocoding.clone(),
        }
    }

    #[must_use]
    pub fn begin(&self, permission_granted: bool) -> LocationStep {
        if permission_granted {
            LocationStep::LastKnown
        } else {
            info!("location permission denied");
            LocationStep::Settled(LOCATION_PERMISSION_DENIED.to_string())
        }
    }

    /// Cached position first; anything short of a usable one means a live request.
    #[must_use]
    pub fn on_last_known(&self, result: LocationResult) -> LocationStep {
        match result {
            Ok(LocationOutput::LastKnown(Some(fix))) => match revalidate(fix) {
                Some(fix) => {
                    debug!("using last known position");
                    LocationStep::Describe(fix)
                }
                None => {
                    warn!(lat = fix.lat, lon = fix.lon, "cached position out of range");
                    self.live_fix()
                }
            },
            Ok(LocationOutput::LastKnown(None)) => {
                debug!("no cached position, requesting live fix");
                self.live_fix()
            }
            Ok(other) => {
                warn!(?other, "unexpected answer to last known request");
                self.live_fix()
            }
            Err(e) => {
                warn!(error = %e, "last known position failed, requesting live fix");
                self.live_fix()
            }
        }
    }

    #[must_use]
    pub fn on_live_fix(&self, result: LocationResult) -> LocationStep {
        let fix = match result {
            Ok(LocationOutput::Fix(fix)) => revalidate(fix),
            Ok(other) => {
                warn!(?other, "unexpected answer to live fix request");
                None
            }
            Err(e) => {
                warn!(error = %e, "no location fix");
                None
            }
        };

        match fix {
            Some(fix) => LocationStep::Describe(fix),
            None => LocationStep::Settled(LOCATION_UNAVAILABLE.to_string()),
        }
    }

    /// The best candidate's display line, or the unknown sentinel.
    #[must_use]
    pub fn describe(&self, result: &GeocodeResult) -> String {
        let candidates = match result {
            Ok(GeocodeOutput::Addresses(candidates)) => candidates,
            Ok(GeocodeOutput::Coordinates(_)) => {
                warn!("reverse geocoding answered with coordinates");
                return LOCATION_UNKNOWN.to_string();
            }
            Err(e) => {
                warn!(error = %e, "reverse geocoding failed");
                return LOCATION_UNKNOWN.to_string();
            }
        };

        candidates
            .first()
            .and_then(|a| a.display_line(self.geocoding.max_address_parts))
            .unwrap_or_else(|| LOCATION_UNKNOWN.to_string())
    }

    fn live_fix(&self) -> LocationStep {
        LocationStep::LiveFix(LocationRequest::single_fix(&self.location))
    }
}

/// Shell-supplied coordinates bypass `LatLon::new` on deserialization.
fn revalidate(fix: LatLon) -> Option<LatLon> {
    LatLon::new(fix.lat, fix.lon)
}
