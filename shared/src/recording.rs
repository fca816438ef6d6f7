//! One voice-note recording, start to stop.
//!
//! The native recorder lives in the shell; a session tracks what was asked of it and owns
//! the target file until that file becomes a voice note. A session is never reused:
//! recording again means building a new session with a new path.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capabilities::{RecorderError, RecorderOutput, RecorderResult, RecorderSettings};
use crate::config::RecordingConfig;
use crate::model::{MediaRef, MediaRefError, UnixTimeMs};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordingError {
    #[error("recorder could not be prepared for {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: RecorderError,
    },

    #[error("recorder failed to stop cleanly for {path}: {source}")]
    Stop {
        path: PathBuf,
        #[source]
        source: RecorderError,
    },

    #[error("recorded file {path} is not a usable media reference: {source}")]
    Media {
        path: PathBuf,
        #[source]
        source: MediaRefError,
    },

    #[error("session already started")]
    NotIdle,

    #[error("session is not recording")]
    NotRecording,

    #[error("recorder reply arrived while the session was {0:?}")]
    OutOfOrder(SessionState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Recording,
    Stopping,
    Stopped,
}

impl SessionState {
    /// A native recorder may be writing to the target.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Recording | Self::Stopping)
    }
}

pub struct AudioRecordingSession {
    settings: RecorderSettings,
    output_dir: PathBuf,
    file_prefix: String,
    state: SessionState,
    target: Option<PathBuf>,
}

impl AudioRecordingSession {
    #[must_use]
    pub fn new(config: &RecordingConfig) -> Self {
        Self {
            settings: config.recorder_settings(),
            output_dir: config.output_dir.clone(),
            file_prefix: config.file_prefix.clone(),
            state: SessionState::Idle,
            target: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Path allocated by the last `start`, if any.
    #[must_use]
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// Allocates a fresh target and returns it for the recorder to write to.
    pub fn start(&mut self) -> Result<PathBuf, RecordingError> {
        if self.state != SessionState::Idle {
            return Err(RecordingError::NotIdle);
        }

        let path = self.allocate_target();
        debug!(path = %path.display(), "voice note requested");
        self.target = Some(path.clone());
        self.state = SessionState::Starting;
        Ok(path)
    }

    /// Applies the recorder's answer to `start`.
    ///
    /// On failure the partial file is removed and the session is back to `Idle`; the
    /// caller never sees a recording state.
    pub fn started(&mut self, result: RecorderResult) -> Result<(), RecordingError> {
        if self.state != SessionState::Starting {
            return Err(RecordingError::OutOfOrder(self.state));
        }
        let Some(path) = self.target.clone() else {
            return Err(RecordingError::OutOfOrder(self.state));
        };

        match expect_output(result, RecorderOutput::Started) {
            Ok(()) => {
                info!(path = %path.display(), "voice note recording started");
                self.state = SessionState::Recording;
                Ok(())
            }
            Err(source) => {
                warn!(error = %source, path = %path.display(), "voice note recorder failed to start");
                remove_partial(&path);
                self.target = None;
                self.state = SessionState::Idle;
                Err(RecordingError::Prepare { path, source })
            }
        }
    }

    pub fn stop(&mut self) -> Result<(), RecordingError> {
        if self.state != SessionState::Recording {
            debug!(state = ?self.state, "stop ignored, session not recording");
            return Err(RecordingError::NotRecording);
        }
        self.state = SessionState::Stopping;
        Ok(())
    }

    /// Applies the recorder's answer to `stop` and returns the recorded file.
    pub fn stopped(&mut self, result: RecorderResult) -> Result<MediaRef, RecordingError> {
        if self.state != SessionState::Stopping {
            return Err(RecordingError::OutOfOrder(self.state));
        }
        let Some(path) = self.target.clone() else {
            return Err(RecordingError::OutOfOrder(self.state));
        };
        self.state = SessionState::Stopped;

        if let Err(source) = expect_output(result, RecorderOutput::Stopped) {
            warn!(error = %source, path = %path.display(), "voice note recorder failed to stop");
            remove_partial(&path);
            return Err(RecordingError::Stop { path, source });
        }

        match MediaRef::from_recorded_file(&path) {
            Ok(media) => {
                info!(path = %path.display(), size_bytes = ?media.size_bytes(), "voice note recording stopped");
                Ok(media)
            }
            Err(source) => {
                remove_partial(&path);
                Err(RecordingError::Media { path, source })
            }
        }
    }

    /// Ends a session that will never produce a voice note. Returns the target the shell
    /// must stop writing to, if a recorder may still be live.
    pub fn abandon(&mut self) -> Option<PathBuf> {
        if !self.state.is_live() {
            return None;
        }
        debug!(state = ?self.state, "voice note session abandoned");
        self.state = SessionState::Stopped;
        let path = self.target.clone()?;
        remove_partial(&path);
        Some(path)
    }

    /// `<dir>/<prefix><millis>.<ext>`, suffixed when a file already sits at that path.
    fn allocate_target(&self) -> PathBuf {
        let stamp = UnixTimeMs::now().as_millis();
        let ext = self.settings.container.extension();
        let mut path = self
            .output_dir
            .join(format!("{}{stamp}.{ext}", self.file_prefix));
        let mut n = 1u32;
        while path.exists() {
            path = self
                .output_dir
                .join(format!("{}{stamp}-{n}.{ext}", self.file_prefix));
            n += 1;
        }
        path
    }
}

impl Drop for AudioRecordingSession {
    fn drop(&mut self) {
        if self.state.is_live() {
            if let Some(path) = &self.target {
                debug!(state = ?self.state, "voice note session dropped while live");
                remove_partial(path);
            }
        }
    }
}

fn expect_output(result: RecorderResult, expected: RecorderOutput) -> Result<(), RecorderError> {
    match result {
        Ok(output) if output == expected => Ok(()),
        Ok(other) => Err(RecorderError::Failed(format!(
            "expected {expected:?}, recorder answered {other:?}"
        ))),
        Err(e) => Err(e),
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial recording"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, path = %path.display(), "could not remove partial recording"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_recording;

    fn config_in(dir: &Path) -> RecordingConfig {
        RecordingConfig {
            output_dir: dir.to_path_buf(),
            ..RecordingConfig::default()
        }
    }

    /// Starts a session the way the shell would: the recorder creates the file.
    fn recording(dir: &Path) -> (AudioRecordingSession, PathBuf) {
        let mut session = AudioRecordingSession::new(&config_in(dir));
        let target = session.start().unwrap();
        write_recording(&target);
        session.started(Ok(RecorderOutput::Started)).unwrap();
        (session, target)
    }

    #[test]
    fn start_then_stop_yields_recorded_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = AudioRecordingSession::new(&config_in(dir.path()));

        let target = session.start().unwrap();
        assert_eq!(session.state(), SessionState::Starting);
        assert!(target.starts_with(dir.path()));
        assert!(target.to_string_lossy().ends_with(".m4a"));
        assert!(target
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("report_audio_"));

        write_recording(&target);
        session.started(Ok(RecorderOutput::Started)).unwrap();
        assert_eq!(session.state(), SessionState::Recording);

        session.stop().unwrap();
        let media = session.stopped(Ok(RecorderOutput::Stopped)).unwrap();
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(media.to_file_path(), Some(target));
        assert!(media.size_bytes().unwrap() > 0);
        assert!(media.blake3_hex().is_some());
    }

    #[test]
    fn failed_start_cleans_up_and_stays_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = AudioRecordingSession::new(&config_in(dir.path()));
        let target = session.start().unwrap();
        write_recording(&target);

        let err = session
            .started(Err(RecorderError::Failed("prepare failed".into())))
            .unwrap_err();

        assert!(matches!(err, RecordingError::Prepare { .. }));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.target(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unwritable_target_leaves_session_idle() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let mut session = AudioRecordingSession::new(&config_in(&missing));
        session.start().unwrap();

        // The shell cannot open a file in a directory that does not exist.
        let result = session.started(Err(RecorderError::Failed("ENOENT".into())));

        assert!(result.is_err());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn stop_when_not_recording_is_rejected_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = AudioRecordingSession::new(&config_in(dir.path()));

        assert_eq!(session.stop(), Err(RecordingError::NotRecording));
        assert_eq!(session.state(), SessionState::Idle);

        session.start().unwrap();
        assert_eq!(session.stop(), Err(RecordingError::NotRecording));
        assert_eq!(session.state(), SessionState::Starting);
    }

    #[test]
    fn session_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = recording(dir.path());
        session.stop().unwrap();
        session.stopped(Ok(RecorderOutput::Stopped)).unwrap();

        assert_eq!(session.start(), Err(RecordingError::NotIdle));
        assert_eq!(session.stop(), Err(RecordingError::NotRecording));
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn replies_out_of_order_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = AudioRecordingSession::new(&config_in(dir.path()));

        assert_eq!(
            session.started(Ok(RecorderOutput::Started)),
            Err(RecordingError::OutOfOrder(SessionState::Idle))
        );
        assert!(matches!(
            session.stopped(Ok(RecorderOutput::Stopped)),
            Err(RecordingError::OutOfOrder(SessionState::Idle))
        ));
    }

    #[test]
    fn mismatched_reply_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = AudioRecordingSession::new(&config_in(dir.path()));
        session.start().unwrap();

        let err = session.started(Ok(RecorderOutput::Stopped)).unwrap_err();

        assert!(matches!(
            err,
            RecordingError::Prepare { source: RecorderError::Failed(_), .. }
        ));
    }

    #[test]
    fn consecutive_sessions_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();

        let (mut first, first_target) = recording(dir.path());
        first.stop().unwrap();
        first.stopped(Ok(RecorderOutput::Stopped)).unwrap();

        let (_second, second_target) = recording(dir.path());

        assert_ne!(first_target, second_target);
    }

    #[test]
    fn stop_failure_discards_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, target) = recording(dir.path());
        session.stop().unwrap();

        let err = session.stopped(Err(RecorderError::Busy)).unwrap_err();

        assert!(matches!(err, RecordingError::Stop { .. }));
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(!target.exists());
    }

    #[test]
    fn abandoning_a_live_session_removes_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, target) = recording(dir.path());

        assert_eq!(session.abandon(), Some(target.clone()));
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(!target.exists());
        assert_eq!(session.abandon(), None);
    }

    #[test]
    fn dropping_a_live_session_removes_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = {
            let (_session, target) = recording(dir.path());
            target
        };
        assert!(!target.exists());
    }

    #[test]
    fn dropping_a_finished_session_keeps_the_voice_note() {
        let dir = tempfile::tempdir().unwrap();
        let media = {
            let (mut session, _) = recording(dir.path());
            session.stop().unwrap();
            session.stopped(Ok(RecorderOutput::Stopped)).unwrap()
        };
        assert!(media.to_file_path().unwrap().exists());
    }

    #[test]
    fn recorder_receives_configured_settings() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let session = AudioRecordingSession::new(&config);

        assert_eq!(session.settings(), &config.recorder_settings());
    }
}
