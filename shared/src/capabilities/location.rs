use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LocationConfig;
use crate::model::LatLon;

/// Identifies one live-fix request so the core can retract it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationPriority {
    #[default]
    HighAccuracy,
    Balanced,
    LowPower,
}

/// Parameters for a live location request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRequest {
    pub priority: LocationPriority,
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,
    pub max_updates: u32,
    /// The shell answers with `LocationError::TimedOut` once this elapses without a fix.
    pub timeout_ms: u64,
}

impl LocationRequest {
    /// A request capped at exactly one update.
    #[must_use]
    pub fn single_fix(config: &LocationConfig) -> Self {
        Self {
            priority: config.priority,
            interval_ms: config.interval_ms,
            fastest_interval_ms: config.fastest_interval_ms,
            max_updates: 1,
            timeout_ms: config.fix_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LocationOperation {
    RequestPermission,
    LastKnown,
    SingleFix {
        subscription: SubscriptionId,
        request: LocationRequest,
    },
    /// Fire and forget. The shell drops any update still in flight for `subscription`.
    Cancel { subscription: SubscriptionId },
}

impl Operation for LocationOperation {
    type Output = LocationResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LocationOutput {
    Permission { granted: bool },
    LastKnown(Option<LatLon>),
    Fix(LatLon),
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationError {
    #[error("location services disabled")]
    ServicesDisabled,

    #[error("location provider failed: {0}")]
    Provider(String),

    #[error("no location fix within {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

pub type LocationResult = Result<LocationOutput, LocationError>;

#[derive(Clone)]
pub struct Location<E> {
    context: CapabilityContext<LocationOperation, E>,
}

impl<Ev> Capability<Ev> for Location<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Location<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Location::new(self.context.map_event(f))
    }
}

impl<E> Location<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, E>) -> Self {
        Self { context }
    }
}

impl<E> Location<E>
where
    E: Send + 'static,
{
    /// Anything but an explicit grant counts as denied.
    pub fn request_permission<F>(&self, callback: F)
    where
        F: FnOnce(bool) -> E + Send + 'static,
    {
        self.request(LocationOperation::RequestPermission, move |result| {
            callback(matches!(
                result,
                Ok(LocationOutput::Permission { granted: true })
            ))
        });
    }

    pub fn last_known<F>(&self, callback: F)
    where
        F: FnOnce(LocationResult) -> E + Send + 'static,
    {
        self.request(LocationOperation::LastKnown, callback);
    }

    pub fn single_fix<F>(&self, subscription: SubscriptionId, request: LocationRequest, callback: F)
    where
        F: FnOnce(LocationResult) -> E + Send + 'static,
    {
        self.request(
            LocationOperation::SingleFix {
                subscription,
                request,
            },
            callback,
        );
    }

    pub fn cancel(&self, subscription: SubscriptionId) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context
                .notify_shell(LocationOperation::Cancel { subscription })
                .await;
        });
    }

    fn request<F>(&self, operation: LocationOperation, callback: F)
    where
        F: FnOnce(LocationResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}
