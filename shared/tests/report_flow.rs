mod common;

use civilq_shared::capabilities::{SinkError, SubscriptionId};
use civilq_shared::{
    Department, Event, MediaRef, RecordingState, Report, ReportStatus,
    LOCATION_PERMISSION_DENIED, NOT_ASSIGNED, PHONE_NOT_ASSIGNED,
};

use common::{Shell, PUNE, SHANIWAR_WADA};

#[test]
fn full_report_lands_in_outbox() {
    let mut shell = Shell::new();

    shell.dispatch(Event::ScreenEntered);
    assert_eq!(shell.model.form().location(), SHANIWAR_WADA);
    assert_eq!(shell.cancelled, vec![SubscriptionId(1)]);

    shell.dispatch(Event::TitleChanged("Overflowing garbage bin".into()));
    shell.dispatch(Event::DescriptionChanged("Not collected for a week".into()));
    shell.dispatch(Event::CategorySelected(Some(Department::Sanitation)));
    shell.dispatch(Event::ImagePicked(
        MediaRef::parse("content://media/external/images/88").ok(),
    ));

    shell.dispatch(Event::MicToggled);
    shell.dispatch(Event::MicToggled);
    assert_eq!(shell.model.form().recording_state(), RecordingState::Recorded);

    shell.dispatch(Event::SubmitRequested);
    assert!(shell.model.is_completed());
    assert!(shell.view().submitted);

    let pending = shell.store.pending(10).unwrap();
    assert_eq!(pending.len(), 1);
    let report = &pending[0];
    assert_eq!(report.title(), "Overflowing garbage bin");
    assert_eq!(report.description(), "Not collected for a week");
    assert_eq!(report.category(), Department::Sanitation);
    assert_eq!(report.status(), ReportStatus::Active);
    assert_eq!(report.upvotes(), 0);
    assert_eq!(report.location(), SHANIWAR_WADA);
    assert_eq!(report.latitude(), Some(PUNE.0));
    assert_eq!(report.longitude(), Some(PUNE.1));
    assert!(report.image_ref().is_some());

    let audio = report.audio_ref().unwrap();
    let audio_path = audio.to_file_path().unwrap();
    assert!(audio_path.starts_with(shell.dir.path()));
    assert!(audio_path.exists());
    assert_eq!(audio.blake3_hex().map(str::len), Some(64));
    assert!(shell.abandoned.is_empty());
}

#[test]
fn report_serializes_for_hand_off() {
    let mut shell = Shell::new();
    shell.dispatch(Event::TitleChanged("Pothole".into()));
    shell.dispatch(Event::CategorySelected(Some(Department::Potholes)));
    shell.dispatch(Event::SubmitRequested);

    let report = shell.store.pending(1).unwrap().remove(0);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], "Active");
    assert_eq!(json["category"], "Potholes");
    assert_eq!(json["departmentHeadName"], NOT_ASSIGNED);
    assert_eq!(json["workerName"], NOT_ASSIGNED);
    assert_eq!(json["workerPhone"], PHONE_NOT_ASSIGNED);
    assert!(json["id"].as_u64().unwrap() >= 1);

    let back: Report = serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn denied_location_still_submits_without_coordinates() {
    let mut shell = Shell::new();
    shell.grant_location = false;

    shell.dispatch(Event::ScreenEntered);
    shell.dispatch(Event::TitleChanged("Broken light".into()));
    shell.dispatch(Event::CategorySelected(Some(Department::Electricity)));
    shell.dispatch(Event::SubmitRequested);

    let report = shell.store.pending(1).unwrap().remove(0);
    assert_eq!(report.location(), LOCATION_PERMISSION_DENIED);
    assert_eq!(report.coordinates(), None);
    assert!(shell.cancelled.is_empty());
}

#[test]
fn incomplete_draft_never_reaches_outbox() {
    let mut shell = Shell::new();
    let renders = shell.renders;

    shell.dispatch(Event::CategorySelected(Some(Department::Road)));
    shell.dispatch(Event::SubmitRequested);

    assert_eq!(shell.renders, renders + 1);
    assert!(!shell.model.is_submitting());
    assert!(shell.store.pending(10).unwrap().is_empty());
}

#[test]
fn sink_failure_surfaces_retryable_error() {
    let mut shell = Shell::new();
    shell.sink_failure = Some(SinkError::Unavailable("disk full".into()));
    shell.dispatch(Event::TitleChanged("Leaking pipe".into()));
    shell.dispatch(Event::CategorySelected(Some(Department::WaterSupply)));

    shell.dispatch(Event::SubmitRequested);

    assert!(!shell.model.is_completed());
    let view = shell.view();
    assert!(view.can_submit);
    assert!(!view.submitted);
    let error = view.error.unwrap();
    assert_eq!(error.error_code, "PERSISTENCE_ERROR");
    assert!(error.is_retryable);

    shell.sink_failure = None;
    shell.dispatch(Event::SubmitRequested);
    assert!(shell.model.is_completed());
    assert_eq!(shell.store.pending(10).unwrap().len(), 1);
}

#[test]
fn unfinished_voice_note_is_abandoned_on_submit() {
    let mut shell = Shell::new();
    shell.dispatch(Event::TitleChanged("Signal not working".into()));
    shell.dispatch(Event::CategorySelected(Some(Department::Traffic)));
    shell.dispatch(Event::MicToggled);
    assert_eq!(shell.model.form().recording_state(), RecordingState::Recording);

    shell.dispatch(Event::SubmitRequested);

    assert!(shell.model.is_completed());
    assert_eq!(shell.abandoned.len(), 1);
    assert!(!shell.abandoned[0].exists());
    let report = shell.store.pending(1).unwrap().remove(0);
    assert!(report.audio_ref().is_none());
}
