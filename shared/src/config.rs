use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use thiserror::Error;

use crate::capabilities::{
    AudioCodec, AudioSource, ContainerFormat, LocationPriority, RecorderSettings,
};

pub const DEFAULT_LOCATION_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_LOCATION_FASTEST_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_FIX_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_GEOCODE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_GEOCODE_CACHE_CAPACITY: usize = 64;
pub const DEFAULT_MAX_ADDRESS_PARTS: usize = 3;
pub const DEFAULT_AUDIO_FILE_PREFIX: &str = "report_audio_";
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;
pub const DEFAULT_BIT_RATE_BPS: u32 = 128_000;
pub const DEFAULT_CREATED_AT_FORMAT: &str = "%d %b %Y, %H:%M";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("fastest interval {fastest_ms}ms exceeds interval {interval_ms}ms")]
    InvertedIntervals { interval_ms: u64, fastest_ms: u64 },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub priority: LocationPriority,
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,
    /// Upper bound the shell puts on a live fix when no cached position exists.
    pub fix_timeout_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            priority: LocationPriority::HighAccuracy,
            interval_ms: DEFAULT_LOCATION_INTERVAL_MS,
            fastest_interval_ms: DEFAULT_LOCATION_FASTEST_INTERVAL_MS,
            fix_timeout_ms: DEFAULT_FIX_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub timeout_ms: u64,
    pub cache_capacity: usize,
    pub max_address_parts: usize,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_GEOCODE_TIMEOUT_MS,
            cache_capacity: DEFAULT_GEOCODE_CACHE_CAPACITY,
            max_address_parts: DEFAULT_MAX_ADDRESS_PARTS,
        }
    }
}

impl GeocodingConfig {
    #[must_use]
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Transient storage for voice notes, typically the app cache directory.
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub source: AudioSource,
    pub container: ContainerFormat,
    pub codec: AudioCodec,
    pub sample_rate_hz: u32,
    pub bit_rate_bps: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir(),
            file_prefix: DEFAULT_AUDIO_FILE_PREFIX.to_string(),
            source: AudioSource::Microphone,
            container: ContainerFormat::Mpeg4,
            codec: AudioCodec::Aac,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            bit_rate_bps: DEFAULT_BIT_RATE_BPS,
        }
    }
}

impl RecordingConfig {
    #[must_use]
    pub fn recorder_settings(&self) -> RecorderSettings {
        RecorderSettings {
            source: self.source,
            container: self.container,
            codec: self.codec,
            sample_rate_hz: self.sample_rate_hz,
            bit_rate_bps: self.bit_rate_bps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// chrono format string for the display timestamp.
    pub created_at_format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            created_at_format: DEFAULT_CREATED_AT_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub location: LocationConfig,
    pub geocoding: GeocodingConfig,
    pub recording: RecordingConfig,
    pub report: ReportConfig,
}

impl PipelineConfig {
    /// Parses and validates. Missing sections and fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let location = &self.location;
        if location.interval_ms == 0 {
            return Err(ConfigError::Zero { field: "location.interval_ms" });
        }
        if location.fastest_interval_ms == 0 {
            return Err(ConfigError::Zero { field: "location.fastest_interval_ms" });
        }
        if location.fastest_interval_ms > location.interval_ms {
            return Err(ConfigError::InvertedIntervals {
                interval_ms: location.interval_ms,
                fastest_ms: location.fastest_interval_ms,
            });
        }
        if location.fix_timeout_ms == 0 {
            return Err(ConfigError::Zero { field: "location.fix_timeout_ms" });
        }

        let geocoding = &self.geocoding;
        if geocoding.timeout_ms == 0 {
            return Err(ConfigError::Zero { field: "geocoding.timeout_ms" });
        }
        if geocoding.cache_capacity == 0 {
            return Err(ConfigError::Zero { field: "geocoding.cache_capacity" });
        }
        if geocoding.max_address_parts == 0 {
            return Err(ConfigError::Zero { field: "geocoding.max_address_parts" });
        }

        let recording = &self.recording;
        if recording.file_prefix.trim().is_empty() {
            return Err(ConfigError::Empty { field: "recording.file_prefix" });
        }
        if recording.sample_rate_hz == 0 {
            return Err(ConfigError::Zero { field: "recording.sample_rate_hz" });
        }
        if recording.bit_rate_bps == 0 {
            return Err(ConfigError::Zero { field: "recording.bit_rate_bps" });
        }

        if self.report.created_at_format.trim().is_empty() {
            return Err(ConfigError::Empty { field: "report.created_at_format" });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = PipelineConfig::from_json(
            r#"{ "location": { "fix_timeout_ms": 12000 }, "recording": { "container": "ogg", "codec": "opus" } }"#,
        )
        .unwrap();

        assert_eq!(config.location.fix_timeout_ms, 12_000);
        assert_eq!(config.location.interval_ms, DEFAULT_LOCATION_INTERVAL_MS);
        assert_eq!(config.recording.container, ContainerFormat::Ogg);
        assert_eq!(config.recording.codec, AudioCodec::Opus);
        assert_eq!(config.geocoding, GeocodingConfig::default());
    }

    #[test]
    fn rejects_inverted_intervals() {
        let err = PipelineConfig::from_json(
            r#"{ "location": { "interval_ms": 1000, "fastest_interval_ms": 5000 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedIntervals { .. }));
    }

    #[test]
    fn rejects_zero_timeouts_and_empty_strings() {
        let mut config = PipelineConfig::default();
        config.geocoding.timeout_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero { field: "geocoding.timeout_ms" })
        );

        let mut config = PipelineConfig::default();
        config.recording.file_prefix = " ".into();
        assert_eq!(
            config.validate(),
            Err(ConfigError::Empty { field: "recording.file_prefix" })
        );
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            PipelineConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PipelineConfig::from_json(&json).unwrap(), config);
    }
}
