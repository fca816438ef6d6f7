use crate::capabilities::{GeocodeResult, LocationResult, RecorderResult, SinkError};
use crate::config::PipelineConfig;
use crate::model::{Department, LatLon, MediaRef, ReportId};

/// Monotonic id of one location resolution. Only the latest ticket may write the address.
pub type ResolutionTicket = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Configure(Box<PipelineConfig>),

    ScreenEntered,
    LocationPermissionResult {
        granted: bool,
    },
    LastKnownLocation {
        ticket: ResolutionTicket,
        result: LocationResult,
    },
    LiveLocationFix {
        ticket: ResolutionTicket,
        result: LocationResult,
    },
    AddressLookedUp {
        ticket: ResolutionTicket,
        at: LatLon,
        result: GeocodeResult,
    },

    TitleChanged(String),
    DescriptionChanged(String),
    CategorySelected(Option<Department>),
    ImagePicked(Option<MediaRef>),

    MicToggled,
    RecorderStarted(RecorderResult),
    RecorderStopped(RecorderResult),

    SubmitRequested,
    SubmissionGeocoded {
        query: String,
        result: GeocodeResult,
    },
    ReportStored {
        id: ReportId,
    },
    ReportStoreFailed {
        id: ReportId,
        error: SinkError,
    },

    DismissError,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::ScreenEntered => "screen_entered",
            Self::LocationPermissionResult { .. } => "location_permission_result",
            Self::LastKnownLocation { .. } => "last_known_location",
            Self::LiveLocationFix { .. } => "live_location_fix",
            Self::AddressLookedUp { .. } => "address_looked_up",
            Self::TitleChanged(_) => "title_changed",
            Self::DescriptionChanged(_) => "description_changed",
            Self::CategorySelected(_) => "category_selected",
            Self::ImagePicked(_) => "image_picked",
            Self::MicToggled => "mic_toggled",
            Self::RecorderStarted(_) => "recorder_started",
            Self::RecorderStopped(_) => "recorder_stopped",
            Self::SubmitRequested => "submit_requested",
            Self::SubmissionGeocoded { .. } => "submission_geocoded",
            Self::ReportStored { .. } => "report_stored",
            Self::ReportStoreFailed { .. } => "report_store_failed",
            Self::DismissError => "dismiss_error",
        }
    }

    /// Events the user caused directly, as opposed to shell answers.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::TitleChanged(_)
                | Self::DescriptionChanged(_)
                | Self::CategorySelected(_)
                | Self::ImagePicked(_)
                | Self::MicToggled
                | Self::SubmitRequested
                | Self::DismissError
        )
    }
}
