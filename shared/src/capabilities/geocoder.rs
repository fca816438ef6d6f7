use crux_core::capability::{Capability, CapabilityContext, Operation};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use thiserror::Error;

use crate::config::{GeocodingConfig, DEFAULT_GEOCODE_CACHE_CAPACITY};
use crate::model::LatLon;

/// One reverse-geocoding candidate, fields ordered from most to least specific.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Address {
    pub feature_name: Option<String>,
    pub thoroughfare: Option<String>,
    pub locality: Option<String>,
    pub admin_area: Option<String>,
}

impl Address {
    /// Joins up to `max_parts` non-blank components with `", "`.
    #[must_use]
    pub fn display_line(&self, max_parts: usize) -> Option<String> {
        let parts: Vec<&str> = [
            &self.feature_name,
            &self.thoroughfare,
            &self.locality,
            &self.admin_area,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref().map(str::trim))
        .filter(|p| !p.is_empty())
        .take(max_parts)
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum GeocodeOperation {
    Reverse {
        at: LatLon,
        max_results: usize,
        timeout_ms: u64,
    },
    Forward {
        query: String,
        max_results: usize,
        timeout_ms: u64,
    },
}

impl Operation for GeocodeOperation {
    type Output = GeocodeResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum GeocodeOutput {
    Addresses(Vec<Address>),
    Coordinates(Vec<LatLon>),
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("geocoder unavailable")]
    Unavailable,

    #[error("geocoder I/O failure: {0}")]
    Io(String),

    #[error("geocoding timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

pub type GeocodeResult = Result<GeocodeOutput, GeocodeError>;

#[derive(Clone)]
pub struct Geocode<E> {
    context: CapabilityContext<GeocodeOperation, E>,
}

impl<Ev> Capability<Ev> for Geocode<Ev> {
    type Operation = GeocodeOperation;
    type MappedSelf<MappedEv> = Geocode<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geocode::new(self.context.map_event(f))
    }
}

impl<E> Geocode<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<GeocodeOperation, E>) -> Self {
        Self { context }
    }
}

impl<E> Geocode<E>
where
    E: Send + 'static,
{
    /// Single best candidate for `at`.
    pub fn reverse<F>(&self, at: LatLon, config: &GeocodingConfig, callback: F)
    where
        F: FnOnce(GeocodeResult) -> E + Send + 'static,
    {
        self.request(
            GeocodeOperation::Reverse {
                at,
                max_results: 1,
                timeout_ms: config.timeout_ms,
            },
            callback,
        );
    }

    /// Single best candidate for a free-text address.
    pub fn forward<F>(&self, query: String, config: &GeocodingConfig, callback: F)
    where
        F: FnOnce(GeocodeResult) -> E + Send + 'static,
    {
        self.request(
            GeocodeOperation::Forward {
                query,
                max_results: 1,
                timeout_ms: config.timeout_ms,
            },
            callback,
        );
    }

    fn request<F>(&self, operation: GeocodeOperation, callback: F)
    where
        F: FnOnce(GeocodeResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}

type CoordKey = (i64, i64);

/// ~11 m at the equator.
const COORD_KEY_SCALE: f64 = 10_000.0;

#[allow(clippy::cast_possible_truncation)]
fn coord_key(at: LatLon) -> CoordKey {
    (
        (at.lat * COORD_KEY_SCALE).round() as i64,
        (at.lon * COORD_KEY_SCALE).round() as i64,
    )
}

fn query_key(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Memoizes successful geocoder answers so a repeated lookup skips the shell round trip.
/// Failures are never cached.
pub struct GeocodeCache {
    reverse: LruCache<CoordKey, Vec<Address>>,
    forward: LruCache<String, Vec<LatLon>>,
}

impl GeocodeCache {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            reverse: LruCache::new(capacity),
            forward: LruCache::new(capacity),
        }
    }

    pub fn reverse(&mut self, at: LatLon) -> Option<GeocodeResult> {
        self.reverse
            .get(&coord_key(at))
            .map(|hit| Ok(GeocodeOutput::Addresses(hit.clone())))
    }

    pub fn forward(&mut self, query: &str) -> Option<GeocodeResult> {
        self.forward
            .get(&query_key(query))
            .map(|hit| Ok(GeocodeOutput::Coordinates(hit.clone())))
    }

    pub fn remember_reverse(&mut self, at: LatLon, result: &GeocodeResult) {
        if let Ok(GeocodeOutput::Addresses(found)) = result {
            self.reverse.put(coord_key(at), found.clone());
        }
    }

    pub fn remember_forward(&mut self, query: &str, result: &GeocodeResult) {
        if let Ok(GeocodeOutput::Coordinates(found)) = result {
            self.forward.put(query_key(query), found.clone());
        }
    }
}

impl Default for GeocodeCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_GEOCODE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
