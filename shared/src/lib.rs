//! Report capture core for CivilQ.
//!
//! The native shells own rendering, navigation, auth and remote sync. This crate owns the
//! part in between: turning location fixes, voice notes, picked photos and typed text into
//! one validated, immutable [`Report`].

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

#[cfg(target_arch = "wasm32")]
compile_error!("civilq_shared is native-only: voice notes are device files and the outbox is SQLite");

pub mod assembler;
pub mod capabilities;
pub mod config;
pub mod coordinator;
pub mod event;
pub mod location;
pub mod model;
pub mod outbox;
pub mod recording;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use assembler::{ReportAssembler, ValidationError};
pub use capabilities::{Capabilities, Effect};
pub use config::{ConfigError, PipelineConfig};
pub use coordinator::{Model, SubmissionCoordinator};
pub use event::{Event, ResolutionTicket};
pub use location::{LocationResolver, LocationStep};
pub use model::{
    Department, FormState, LatLon, MediaRef, RecordingState, Report, ReportId, ReportStatus,
    UnixTimeMs, VoiceNote,
};
pub use outbox::{SqliteReportStore, StoreError};
pub use recording::{AudioRecordingSession, RecordingError, SessionState};
pub use view::{UserFacingError, ViewModel};

pub const LOCATION_PENDING: &str = "Detecting location...";
pub const LOCATION_PERMISSION_DENIED: &str = "Location permission denied";
pub const LOCATION_UNKNOWN: &str = "Unknown location";
pub const LOCATION_UNAVAILABLE: &str = "Location unavailable";

pub const NOT_ASSIGNED: &str = "Not Assigned";
pub const PHONE_NOT_ASSIGNED: &str = "N/A";

/// Largest integer a JSON consumer can hold without losing precision.
pub const MAX_REPORT_ID: u64 = (1 << 53) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    RecorderPrepare,
    Recorder,
    Validation,
    Persistence,
    Configuration,
    InvalidState,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::RecorderPrepare => "RECORDER_PREPARE_FAILED",
            Self::Recorder => "RECORDER_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Persistence => "PERSISTENCE_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::RecorderPrepare | Self::Recorder | Self::Persistence => {
                ErrorSeverity::Transient
            }

            Self::Validation | Self::Configuration | Self::InvalidState => {
                ErrorSeverity::Permanent
            }
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self.default_severity(), ErrorSeverity::Transient)
    }
}

/// Crate-wide error carried to the view layer.
///
/// Component errors stay precise (`RecordingError`, `SinkError`, ...); this type is what
/// the coordinator stores once a failure needs to be shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub context: HashMap<String, String>,
}

impl PipelineError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::RecorderPrepare => {
                "Couldn't start the voice note. Check microphone access and try again.".into()
            }
            ErrorKind::Recorder => "The voice note couldn't be saved. Please record it again.".into(),
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::Persistence => "Your report couldn't be saved. Please try again.".into(),
            ErrorKind::Configuration | ErrorKind::InvalidState => {
                "Something went wrong. Please restart the app.".into()
            }
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

impl std::error::Error for PipelineError {}

impl From<RecordingError> for PipelineError {
    fn from(e: RecordingError) -> Self {
        let kind = match &e {
            RecordingError::Prepare { .. } => ErrorKind::RecorderPrepare,
            RecordingError::Stop { .. } | RecordingError::Media { .. } => ErrorKind::Recorder,
            RecordingError::NotIdle
            | RecordingError::NotRecording
            | RecordingError::OutOfOrder(_) => ErrorKind::InvalidState,
        };
        PipelineError::new(kind, e.to_string())
    }
}

impl From<ValidationError> for PipelineError {
    fn from(e: ValidationError) -> Self {
        PipelineError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<capabilities::SinkError> for PipelineError {
    fn from(e: capabilities::SinkError) -> Self {
        PipelineError::new(ErrorKind::Persistence, e.to_string())
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::new(ErrorKind::Configuration, e.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_prepare_failures_are_retryable() {
        let err = PipelineError::from(RecordingError::Prepare {
            path: "/nope/a.m4a".into(),
            source: capabilities::RecorderError::PermissionDenied,
        });
        assert_eq!(err.kind, ErrorKind::RecorderPrepare);
        assert_eq!(err.code(), "RECORDER_PREPARE_FAILED");
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_errors_surface_their_message() {
        let err = PipelineError::from(ValidationError::MissingTitle);
        assert!(!err.is_retryable());
        assert_eq!(err.user_facing_message(), ValidationError::MissingTitle.to_string());
    }

    #[test]
    fn display_includes_code() {
        let err = PipelineError::new(ErrorKind::Persistence, "disk full")
            .with_context("report_id", "42");
        assert_eq!(err.to_string(), "[PERSISTENCE_ERROR] disk full");
        assert_eq!(err.context.get("report_id").map(String::as_str), Some("42"));
    }
}
