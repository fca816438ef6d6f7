use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::{LOCATION_PENDING, LOCATION_PERMISSION_DENIED, LOCATION_UNAVAILABLE, LOCATION_UNKNOWN};

/// Explicit timestamp unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0),
        )
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

/// Validated lat/lon
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        if !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon })
    }
}

// --- Departments ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    Fire,
    Road,
    Potholes,
    Sanitation,
    Traffic,
    Administration,
    #[serde(rename = "Urban Planning")]
    UrbanPlanning,
    #[serde(rename = "Water Supply")]
    WaterSupply,
    Electricity,
    Others,
}

impl Department {
    pub const ALL: [Department; 10] = [
        Self::Fire,
        Self::Road,
        Self::Potholes,
        Self::Sanitation,
        Self::Traffic,
        Self::Administration,
        Self::UrbanPlanning,
        Self::WaterSupply,
        Self::Electricity,
        Self::Others,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Road => "Road",
            Self::Potholes => "Potholes",
            Self::Sanitation => "Sanitation",
            Self::Traffic => "Traffic",
            Self::Administration => "Administration",
            Self::UrbanPlanning => "Urban Planning",
            Self::WaterSupply => "Water Supply",
            Self::Electricity => "Electricity",
            Self::Others => "Others",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown department: {0:?}")]
pub struct UnknownDepartment(pub String);

impl FromStr for Department {
    type Err = UnknownDepartment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownDepartment(s.to_string()))
    }
}

// --- Media references ---

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaRefError {
    #[error("media reference is empty")]
    Empty,
    #[error("relative paths are not media references: {0}")]
    Relative(String),
    #[error("invalid media reference {raw}: {reason}")]
    Invalid { raw: String, reason: String },
    #[error("scheme not allowed for media: {0}")]
    DisallowedScheme(String),
}

/// Don't store media bytes. Store a handle/URI/path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    uri: String,
    size_bytes: Option<u64>,
    blake3_hex: Option<String>,
}

impl MediaRef {
    /// Accepts a URI (`content://`, `file://`, `https://`, ...) or an absolute path.
    pub fn parse(raw: &str) -> Result<Self, MediaRefError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MediaRefError::Empty);
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            return Self::from_path(path);
        }

        let url = Url::parse(raw).map_err(|e| match e {
            url::ParseError::RelativeUrlWithoutBase => MediaRefError::Relative(raw.to_string()),
            other => MediaRefError::Invalid {
                raw: raw.to_string(),
                reason: other.to_string(),
            },
        })?;

        if matches!(url.scheme(), "javascript" | "data") {
            return Err(MediaRefError::DisallowedScheme(url.scheme().to_string()));
        }

        Ok(Self {
            uri: url.into(),
            size_bytes: None,
            blake3_hex: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, MediaRefError> {
        let url = Url::from_file_path(path).map_err(|()| {
            if path.is_absolute() {
                MediaRefError::Invalid {
                    raw: path.display().to_string(),
                    reason: "not representable as a file URI".into(),
                }
            } else {
                MediaRefError::Relative(path.display().to_string())
            }
        })?;

        Ok(Self {
            uri: url.into(),
            size_bytes: None,
            blake3_hex: None,
        })
    }

    /// Reference to a finished recording, with size and digest when the file is readable.
    /// The file is streamed through the hasher, never loaded whole.
    pub fn from_recorded_file(path: &Path) -> Result<Self, MediaRefError> {
        let mut media = Self::from_path(path)?;
        match digest_file(path) {
            Ok((size, hex)) => {
                media.size_bytes = Some(size);
                media.blake3_hex = Some(hex);
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "recorded file unreadable, digest skipped");
            }
        }
        Ok(media)
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    #[must_use]
    pub fn blake3_hex(&self) -> Option<&str> {
        self.blake3_hex.as_deref()
    }

    /// Local path for `file://` references.
    #[must_use]
    pub fn to_file_path(&self) -> Option<PathBuf> {
        let url = Url::parse(&self.uri).ok()?;
        if url.scheme() != "file" {
            return None;
        }
        url.to_file_path().ok()
    }
}

fn digest_file(path: &Path) -> std::io::Result<(u64, String)> {
    let mut file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok((size, hasher.finalize().to_hex().to_string()))
}

// --- Voice note ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Recorded,
}

/// Recording progress and its output in one value, so a recorded file can only exist in
/// the `Recorded` state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VoiceNote {
    #[default]
    Idle,
    Recording,
    Recorded(MediaRef),
}

impl VoiceNote {
    #[must_use]
    pub const fn state(&self) -> RecordingState {
        match self {
            Self::Idle => RecordingState::Idle,
            Self::Recording => RecordingState::Recording,
            Self::Recorded(_) => RecordingState::Recorded,
        }
    }

    #[must_use]
    pub const fn audio(&self) -> Option<&MediaRef> {
        match self {
            Self::Recorded(media) => Some(media),
            Self::Idle | Self::Recording => None,
        }
    }
}

// --- Form state ---

/// Snapshot of a report draft. Every edit consumes the snapshot and returns a new one.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    title: String,
    description: String,
    category: Option<Department>,
    location: String,
    image: Option<MediaRef>,
    voice_note: VoiceNote,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: None,
            location: LOCATION_PENDING.to_string(),
            image: None,
            voice_note: VoiceNote::Idle,
        }
    }
}

impl FormState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_category(self, category: Option<Department>) -> Self {
        Self { category, ..self }
    }

    #[must_use]
    pub fn with_location(self, location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_image(self, image: Option<MediaRef>) -> Self {
        Self { image, ..self }
    }

    #[must_use]
    pub fn with_recording_started(self) -> Self {
        Self {
            voice_note: VoiceNote::Recording,
            ..self
        }
    }

    #[must_use]
    pub fn with_voice_note(self, audio: MediaRef) -> Self {
        Self {
            voice_note: VoiceNote::Recorded(audio),
            ..self
        }
    }

    #[must_use]
    pub fn with_recording_discarded(self) -> Self {
        Self {
            voice_note: VoiceNote::Idle,
            ..self
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn category(&self) -> Option<Department> {
        self.category
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn image(&self) -> Option<&MediaRef> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn voice_note(&self) -> &VoiceNote {
        &self.voice_note
    }

    #[must_use]
    pub fn recording_state(&self) -> RecordingState {
        self.voice_note.state()
    }

    #[must_use]
    pub fn audio(&self) -> Option<&MediaRef> {
        self.voice_note.audio()
    }

    /// The only two hard gates on submission.
    #[must_use]
    pub fn is_submittable(&self) -> bool {
        !self.title.trim().is_empty() && self.category.is_some()
    }

    /// True while the location field still holds a placeholder rather than an address.
    #[must_use]
    pub fn location_is_placeholder(&self) -> bool {
        is_location_sentinel(&self.location)
    }
}

// Redact debug output because this holds user-provided text.
impl fmt::Debug for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormState")
            .field("title_len", &self.title.len())
            .field("description_len", &self.description.len())
            .field("category", &self.category)
            .field("location_is_placeholder", &self.location_is_placeholder())
            .field("image_present", &self.image.is_some())
            .field("recording_state", &self.recording_state())
            .finish()
    }
}

#[must_use]
pub fn is_location_sentinel(location: &str) -> bool {
    let location = location.trim();
    location.is_empty()
        || [
            LOCATION_PENDING,
            LOCATION_PERMISSION_DENIED,
            LOCATION_UNKNOWN,
            LOCATION_UNAVAILABLE,
        ]
        .contains(&location)
}

// --- Report ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub u64);

impl ReportId {
    /// Random id in `1..=MAX_REPORT_ID`.
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen_range(1..=crate::MAX_REPORT_ID))
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReportStatus {
    #[default]
    Active,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

/// A finalized civic-issue record. Never mutated after construction; status changes and
/// worker assignment belong to whoever manages submitted reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    id: ReportId,
    title: String,
    category: Department,
    description: String,
    status: ReportStatus,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    image_ref: Option<MediaRef>,
    audio_ref: Option<MediaRef>,
    upvotes: u32,
    created_at: String,
    created_at_ms: UnixTimeMs,
    department_head_name: String,
    worker_name: String,
    worker_phone: String,
}

/// Inputs the assembler has already validated.
pub(crate) struct ReportParts {
    pub id: ReportId,
    pub title: String,
    pub category: Department,
    pub description: String,
    pub location: String,
    pub coordinates: Option<LatLon>,
    pub image_ref: Option<MediaRef>,
    pub audio_ref: Option<MediaRef>,
    pub created_at: String,
    pub created_at_ms: UnixTimeMs,
}

impl Report {
    pub(crate) fn new_active(parts: ReportParts) -> Self {
        Self {
            id: parts.id,
            title: parts.title,
            category: parts.category,
            description: parts.description,
            status: ReportStatus::Active,
            location: parts.location,
            latitude: parts.coordinates.map(|c| c.lat),
            longitude: parts.coordinates.map(|c| c.lon),
            image_ref: parts.image_ref,
            audio_ref: parts.audio_ref,
            upvotes: 0,
            created_at: parts.created_at,
            created_at_ms: parts.created_at_ms,
            department_head_name: crate::NOT_ASSIGNED.to_string(),
            worker_name: crate::NOT_ASSIGNED.to_string(),
            worker_phone: crate::PHONE_NOT_ASSIGNED.to_string(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ReportId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn category(&self) -> Department {
        self.category
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn status(&self) -> ReportStatus {
        self.status
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    #[must_use]
    pub fn coordinates(&self) -> Option<LatLon> {
        LatLon::new(self.latitude?, self.longitude?)
    }

    #[must_use]
    pub fn image_ref(&self) -> Option<&MediaRef> {
        self.image_ref.as_ref()
    }

    #[must_use]
    pub fn audio_ref(&self) -> Option<&MediaRef> {
        self.audio_ref.as_ref()
    }

    #[must_use]
    pub fn upvotes(&self) -> u32 {
        self.upvotes
    }

    #[must_use]
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    #[must_use]
    pub fn created_at_ms(&self) -> UnixTimeMs {
        self.created_at_ms
    }

    #[must_use]
    pub fn department_head_name(&self) -> &str {
        &self.department_head_name
    }

    #[must_use]
    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    #[must_use]
    pub fn worker_phone(&self) -> &str {
        &self.worker_phone
    }
}
