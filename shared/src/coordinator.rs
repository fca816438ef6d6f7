//! The report screen's state owner.
//!
//! [`SubmissionCoordinator`] is the Crux app. The shell feeds it [`Event`]s, carries out the
//! capability requests it makes and renders [`ViewModel`]s. All state lives in [`Model`],
//! which only `update` mutates.

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assembler::ReportAssembler;
use crate::capabilities::{Capabilities, GeocodeCache, SubscriptionId};
use crate::config::PipelineConfig;
use crate::event::{Event, ResolutionTicket};
use crate::location::{LocationResolver, LocationStep};
use crate::model::{FormState, LatLon, RecordingState};
use crate::recording::{AudioRecordingSession, RecordingError, SessionState};
use crate::view::ViewModel;
use crate::{ErrorKind, PipelineError};

#[derive(Default)]
pub struct SubmissionCoordinator;

/// A submit that is waiting on the forward geocode.
struct PendingSubmission {
    snapshot: FormState,
    requested_at: DateTime<Local>,
}

pub struct Model {
    config: PipelineConfig,
    resolver: LocationResolver,
    assembler: ReportAssembler,
    geocode_cache: GeocodeCache,

    draft_id: Uuid,
    form: FormState,
    ticket: ResolutionTicket,
    live_fix: Option<SubscriptionId>,
    session: Option<AudioRecordingSession>,
    submission: Option<PendingSubmission>,
    is_submitting: bool,
    completed: bool,
    last_error: Option<PipelineError>,
}

impl Default for Model {
    fn default() -> Self {
        let config = PipelineConfig::default();
        let draft_id = Uuid::new_v4();
        info!(%draft_id, "report draft opened");

        Self {
            resolver: LocationResolver::new(&config.location, &config.geocoding),
            assembler: ReportAssembler::new(&config.report),
            geocode_cache: GeocodeCache::new(config.geocoding.cache_capacity()),
            config,
            draft_id,
            form: FormState::new(),
            ticket: 0,
            live_fix: None,
            session: None,
            submission: None,
            is_submitting: false,
            completed: false,
            last_error: None,
        }
    }
}

impl Model {
    #[must_use]
    pub fn form(&self) -> &FormState {
        &self.form
    }

    #[must_use]
    pub fn draft_id(&self) -> Uuid {
        self.draft_id
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn session_state(&self) -> Option<SessionState> {
        self.session.as_ref().map(AudioRecordingSession::state)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&PipelineError> {
        self.last_error.as_ref()
    }

    fn apply_config(&mut self, config: PipelineConfig) {
        self.resolver = LocationResolver::new(&config.location, &config.geocoding);
        self.assembler = ReportAssembler::new(&config.report);
        self.geocode_cache = GeocodeCache::new(config.geocoding.cache_capacity());
        self.config = config;
    }

    fn replace_form(&mut self, edit: impl FnOnce(FormState) -> FormState) {
        self.form = edit(std::mem::take(&mut self.form));
    }

    fn is_current(&self, ticket: ResolutionTicket) -> bool {
        if ticket == self.ticket {
            return true;
        }
        debug!(ticket, latest = self.ticket, "stale location answer ignored");
        false
    }
}

impl crux_core::App for SubmissionCoordinator {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        if event.is_user_initiated() {
            info!(event = event_name, draft_id = %model.draft_id, "user action");
        } else {
            debug!(event = event_name, draft_id = %model.draft_id, "shell answer");
        }

        if model.completed {
            debug!(event = event_name, "draft already submitted, event ignored");
            return;
        }

        match event {
            Event::Configure(config) => {
                match config.validate() {
                    Ok(()) => {
                        info!("pipeline configured");
                        model.apply_config(*config);
                    }
                    Err(e) => {
                        warn!(error = %e, "configuration rejected, keeping previous");
                        model.last_error = Some(e.into());
                    }
                }
                caps.render.render();
            }

            Event::ScreenEntered => {
                caps.location
                    .request_permission(|granted| Event::LocationPermissionResult { granted });
            }

            Event::LocationPermissionResult { granted } => {
                model.ticket += 1;
                Self::cancel_live_fix(model, caps);
                let step = model.resolver.begin(granted);
                Self::advance_location(model.ticket, step, model, caps);
            }

            Event::LastKnownLocation { ticket, result } => {
                if model.is_current(ticket) {
                    let step = model.resolver.on_last_known(result);
                    Self::advance_location(ticket, step, model, caps);
                }
            }

            Event::LiveLocationFix { ticket, result } => {
                if !model.is_current(ticket) || model.live_fix != Some(SubscriptionId(ticket)) {
                    debug!(ticket, "live fix without an open subscription ignored");
                    return;
                }
                Self::cancel_live_fix(model, caps);
                let step = model.resolver.on_live_fix(result);
                Self::advance_location(ticket, step, model, caps);
            }

            Event::AddressLookedUp { ticket, at, result } => {
                model.geocode_cache.remember_reverse(at, &result);
                if model.is_current(ticket) {
                    let address = model.resolver.describe(&result);
                    Self::settle_location(address, model, caps);
                }
            }

            Event::TitleChanged(title) => {
                model.replace_form(|f| f.with_title(title));
                caps.render.render();
            }
            Event::DescriptionChanged(text) => {
                model.replace_form(|f| f.with_description(text));
                caps.render.render();
            }
            Event::CategorySelected(category) => {
                model.replace_form(|f| f.with_category(category));
                caps.render.render();
            }
            Event::ImagePicked(image) => {
                model.replace_form(|f| f.with_image(image));
                caps.render.render();
            }

            Event::MicToggled => {
                if matches!(
                    model.session_state(),
                    Some(SessionState::Starting | SessionState::Stopping)
                ) {
                    debug!("recorder busy, toggle ignored");
                    return;
                }
                match model.form.recording_state() {
                    RecordingState::Idle | RecordingState::Recorded => {
                        Self::start_recording(model, caps);
                    }
                    RecordingState::Recording => Self::stop_recording(model, caps),
                }
                caps.render.render();
            }

            Event::RecorderStarted(result) => {
                let Some(session) = model.session.as_mut() else {
                    debug!("recorder answer without a session ignored");
                    return;
                };
                match session.started(result) {
                    Ok(()) => {
                        model.last_error = None;
                        model.replace_form(FormState::with_recording_started);
                    }
                    Err(RecordingError::OutOfOrder(state)) => {
                        debug!(?state, "late recorder start ignored");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "voice note not started");
                        model.session = None;
                        model.last_error = Some(e.into());
                    }
                }
                caps.render.render();
            }

            Event::RecorderStopped(result) => {
                let Some(session) = model.session.as_mut() else {
                    debug!("recorder answer without a session ignored");
                    return;
                };
                match session.stopped(result) {
                    Ok(audio) => {
                        model.last_error = None;
                        model.replace_form(|f| f.with_voice_note(audio));
                    }
                    Err(RecordingError::OutOfOrder(state)) => {
                        debug!(?state, "late recorder stop ignored");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "voice note discarded");
                        model.last_error = Some(e.into());
                        model.replace_form(FormState::with_recording_discarded);
                    }
                }
                model.session = None;
                caps.render.render();
            }

            Event::SubmitRequested => Self::submit(model, caps),

            Event::SubmissionGeocoded { query, result } => {
                model.geocode_cache.remember_forward(&query, &result);
                let Some(submission) = model.submission.take() else {
                    debug!("forward geocode without a pending submission ignored");
                    return;
                };
                let coordinates = ReportAssembler::coordinates(&result);
                Self::finish_submission(submission, coordinates, model, caps);
                caps.render.render();
            }

            Event::ReportStored { id } => {
                info!(report_id = %id, draft_id = %model.draft_id, "report stored");
                model.is_submitting = false;
                model.completed = true;
                model.last_error = None;
                if let Some(mut session) = model.session.take() {
                    if let Some(target) = session.abandon() {
                        caps.recorder.abandon(target);
                    }
                }
                Self::cancel_live_fix(model, caps);
                caps.render.render();
            }

            Event::ReportStoreFailed { id, error } => {
                warn!(report_id = %id, error = %error, "report could not be stored, draft kept");
                model.is_submitting = false;
                model.last_error =
                    Some(PipelineError::from(error).with_context("report_id", id.to_string()));
                caps.render.render();
            }

            Event::DismissError => {
                model.last_error = None;
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::new(
            &model.form,
            model.is_submitting,
            model.last_error.as_ref(),
            model.completed,
        )
    }
}

impl SubmissionCoordinator {
    fn advance_location(
        ticket: ResolutionTicket,
        step: LocationStep,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        match step {
            LocationStep::Settled(address) => Self::settle_location(address, model, caps),

            LocationStep::LastKnown => {
                caps.location
                    .last_known(move |result| Event::LastKnownLocation { ticket, result });
            }

            LocationStep::LiveFix(request) => {
                let subscription = SubscriptionId(ticket);
                model.live_fix = Some(subscription);
                caps.location.single_fix(subscription, request, move |result| {
                    Event::LiveLocationFix { ticket, result }
                });
            }

            LocationStep::Describe(at) => {
                if let Some(cached) = model.geocode_cache.reverse(at) {
                    debug!("reverse geocode served from cache");
                    let address = model.resolver.describe(&cached);
                    Self::settle_location(address, model, caps);
                } else {
                    Self::lookup_address(ticket, at, model, caps);
                }
            }
        }
    }

    fn lookup_address(ticket: ResolutionTicket, at: LatLon, model: &Model, caps: &Capabilities) {
        caps.geocode
            .reverse(at, &model.config.geocoding, move |result| Event::AddressLookedUp {
                ticket,
                at,
                result,
            });
    }

    fn settle_location(address: String, model: &mut Model, caps: &Capabilities) {
        debug!(%address, "location settled");
        model.replace_form(|f| f.with_location(address));
        caps.render.render();
    }

    /// Retracts the open live request so no update can arrive after this point.
    fn cancel_live_fix(model: &mut Model, caps: &Capabilities) {
        if let Some(subscription) = model.live_fix.take() {
            debug!(subscription = subscription.0, "live location request cancelled");
            caps.location.cancel(subscription);
        }
    }

    fn start_recording(model: &mut Model, caps: &Capabilities) {
        let mut session = AudioRecordingSession::new(&model.config.recording);
        match session.start() {
            Ok(target) => {
                caps.recorder
                    .start(target, session.settings().clone(), Event::RecorderStarted);
                model.session = Some(session);
            }
            Err(e) => {
                warn!(error = %e, "voice note not started");
                model.last_error = Some(e.into());
            }
        }
    }

    fn stop_recording(model: &mut Model, caps: &Capabilities) {
        let Some(session) = model.session.as_mut() else {
            warn!("recording flagged without a live session, discarding");
            model.replace_form(FormState::with_recording_discarded);
            model.last_error = Some(PipelineError::new(
                ErrorKind::InvalidState,
                "no active recording session",
            ));
            return;
        };

        match session.stop() {
            Ok(()) => caps.recorder.stop(Event::RecorderStopped),
            Err(e) => {
                warn!(error = %e, "voice note stop rejected");
                model.last_error = Some(e.into());
            }
        }
    }

    fn submit(model: &mut Model, caps: &Capabilities) {
        if model.is_submitting {
            debug!("submission already in flight");
            return;
        }
        if let Err(reason) = ReportAssembler::validate(&model.form) {
            debug!(%reason, "submission withheld");
            return;
        }

        model.is_submitting = true;
        let submission = PendingSubmission {
            snapshot: model.form.clone(),
            requested_at: Local::now(),
        };

        match ReportAssembler::geocode_query(&submission.snapshot).map(str::to_owned) {
            Some(query) => {
                if let Some(cached) = model.geocode_cache.forward(&query) {
                    debug!("forward geocode served from cache");
                    let coordinates = ReportAssembler::coordinates(&cached);
                    Self::finish_submission(submission, coordinates, model, caps);
                } else {
                    caps.geocode.forward(
                        query.clone(),
                        &model.config.geocoding,
                        move |result| Event::SubmissionGeocoded { query, result },
                    );
                    model.submission = Some(submission);
                }
            }
            None => Self::finish_submission(submission, None, model, caps),
        }

        caps.render.render();
    }

    fn finish_submission(
        submission: PendingSubmission,
        coordinates: Option<LatLon>,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let assembled = model.assembler.try_assemble(
            &submission.snapshot,
            coordinates,
            &submission.requested_at,
        );

        match assembled {
            Ok(report) => {
                let id = report.id();
                info!(report_id = %id, draft_id = %model.draft_id, "handing report to sink");
                caps.sink.add_report(report, move |result| match result {
                    Ok(()) => Event::ReportStored { id },
                    Err(error) => Event::ReportStoreFailed { id, error },
                });
            }
            Err(reason) => {
                debug!(%reason, "submission withheld");
                model.is_submitting = false;
            }
        }
    }
}
