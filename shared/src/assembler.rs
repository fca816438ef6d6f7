//! Draft to finalized report.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Write};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::capabilities::{GeocodeOutput, GeocodeResult};
use crate::config::{ReportConfig, DEFAULT_CREATED_AT_FORMAT};
use crate::model::{
    is_location_sentinel, FormState, LatLon, Report, ReportId, ReportParts, UnixTimeMs,
};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Please add a title for the report.")]
    MissingTitle,

    #[error("Please choose a department for the report.")]
    MissingCategory,
}

#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    report: ReportConfig,
}

impl ReportAssembler {
    #[must_use]
    pub fn new(report: &ReportConfig) -> Self {
        Self {
            report: report.clone(),
        }
    }

    /// Title and category are the only required fields.
    pub fn validate(state: &FormState) -> Result<(), ValidationError> {
        if state.title().trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if state.category().is_none() {
            return Err(ValidationError::MissingCategory);
        }
        Ok(())
    }

    /// Address worth a forward lookup. Sentinels and blanks have none.
    #[must_use]
    pub fn geocode_query(state: &FormState) -> Option<&str> {
        let location = state.location().trim();
        if location.is_empty() || is_location_sentinel(location) {
            debug!("no address to geocode");
            return None;
        }
        Some(location)
    }

    /// First forward candidate, if it is a real coordinate. Failures only blank the
    /// coordinates; they never fail assembly.
    #[must_use]
    pub fn coordinates(result: &GeocodeResult) -> Option<LatLon> {
        match result {
            Ok(GeocodeOutput::Coordinates(candidates)) => {
                let found = candidates.first().and_then(|c| LatLon::new(c.lat, c.lon));
                if found.is_none() && !candidates.is_empty() {
                    warn!("forward geocoding returned out-of-range coordinates");
                }
                found
            }
            Ok(GeocodeOutput::Addresses(_)) => {
                warn!("forward geocoding answered with addresses");
                None
            }
            Err(e) => {
                warn!(error = %e, "forward geocoding failed");
                None
            }
        }
    }

    /// Builds a new `Active` report from a draft snapshot.
    ///
    /// `now` is the moment the user asked to submit, taken before any lookup ran.
    #[instrument(skip(self, state, now), fields(category = ?state.category()))]
    pub fn try_assemble<Tz>(
        &self,
        state: &FormState,
        coordinates: Option<LatLon>,
        now: &DateTime<Tz>,
    ) -> Result<Report, ValidationError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self::validate(state)?;
        let Some(category) = state.category() else {
            return Err(ValidationError::MissingCategory);
        };

        let created_at = self.format_timestamp(now);
        let created_at_ms = UnixTimeMs(u64::try_from(now.timestamp_millis()).unwrap_or(0));

        let report = Report::new_active(ReportParts {
            id: ReportId::generate(),
            title: state.title().to_string(),
            category,
            description: state.description().to_string(),
            location: state.location().to_string(),
            coordinates,
            image_ref: state.image().cloned(),
            audio_ref: state.audio().cloned(),
            created_at,
            created_at_ms,
        });

        info!(
            report_id = %report.id(),
            has_coordinates = coordinates.is_some(),
            has_image = report.image_ref().is_some(),
            has_audio = report.audio_ref().is_some(),
            "report assembled"
        );
        Ok(report)
    }

    fn format_timestamp<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.report.created_at_format)).is_ok() {
            return out;
        }

        warn!(format = %self.report.created_at_format, "invalid timestamp format, using default");
        out.clear();
        if write!(out, "{}", now.format(DEFAULT_CREATED_AT_FORMAT)).is_err() {
            out = now.to_rfc3339();
        }
        out
    }
}
