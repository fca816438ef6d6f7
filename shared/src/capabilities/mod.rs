//! Shell-side capabilities.
//!
//! Each capability is an operation enum the native shell answers: location fixes,
//! geocoding, the audio recorder and the report sink. The core only describes requests;
//! the shell performs them and the answer comes back as an [`Event`].

mod geocoder;
mod location;
mod recorder;
mod sink;

pub use self::geocoder::{
    Address, Geocode, GeocodeCache, GeocodeError, GeocodeOperation, GeocodeOutput, GeocodeResult,
};
pub use self::location::{
    Location, LocationError, LocationOperation, LocationOutput, LocationPriority,
    LocationRequest, LocationResult, SubscriptionId,
};
pub use self::recorder::{
    AudioCodec, AudioSource, ContainerFormat, Recorder, RecorderError, RecorderOperation,
    RecorderOutput, RecorderResult, RecorderSettings,
};
pub use self::sink::{ReportSink, SinkError, SinkOperation, SinkResult};

pub use crux_core::render::Render;

// The Effect derive wires capabilities to the app named `App`.
use crate::coordinator::SubmissionCoordinator as App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub location: Location<Event>,
    pub geocode: Geocode<Event>,
    pub recorder: Recorder<Event>,
    pub sink: ReportSink<Event>,
}
