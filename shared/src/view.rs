use serde::{Deserialize, Serialize};

use crate::model::{Department, FormState, RecordingState};
use crate::{ErrorSeverity, PipelineError};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&PipelineError> for UserFacingError {
    fn from(e: &PipelineError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

/// Everything the report screen renders.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub title: String,
    pub description: String,
    pub category: Option<Department>,
    pub categories: Vec<Department>,
    pub location: String,
    pub location_is_placeholder: bool,
    pub recording_state: RecordingState,
    pub has_image: bool,
    pub has_voice_note: bool,
    pub is_submitting: bool,
    pub can_submit: bool,
    /// The report reached the sink; the shell closes the screen.
    pub submitted: bool,
    pub error: Option<UserFacingError>,
}

impl ViewModel {
    #[must_use]
    pub fn new(
        form: &FormState,
        is_submitting: bool,
        error: Option<&PipelineError>,
        submitted: bool,
    ) -> Self {
        Self {
            title: form.title().to_string(),
            description: form.description().to_string(),
            category: form.category(),
            categories: Department::ALL.to_vec(),
            location: form.location().to_string(),
            location_is_placeholder: form.location_is_placeholder(),
            recording_state: form.recording_state(),
            has_image: form.image().is_some(),
            has_voice_note: form.audio().is_some(),
            is_submitting,
            can_submit: form.is_submittable() && !is_submitting && !submitted,
            submitted,
            error: error.map(UserFacingError::from),
        }
    }
}
