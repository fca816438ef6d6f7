#![allow(dead_code)]

use std::path::PathBuf;

use crux_core::capability::Operation;
use crux_core::testing::{AppTester, Update};
use crux_core::Request;

use civilq_shared::capabilities::{
    Address, GeocodeOperation, GeocodeOutput, LocationOperation, LocationOutput,
    RecorderOperation, RecorderOutput, SinkError, SinkOperation, SubscriptionId,
};
use civilq_shared::{
    Effect, Event, LatLon, Model, PipelineConfig, SqliteReportStore, SubmissionCoordinator,
    ViewModel,
};

pub const PUNE: (f64, f64) = (18.5204, 73.8567);
pub const SHANIWAR_WADA: &str = "Shaniwar Wada, Bajirao Road, Pune";

/// Stands in for the native app: answers every capability request on the spot.
///
/// The device has no cached position, so every resolution goes through a live fix.
pub struct Shell {
    app: AppTester<SubmissionCoordinator, Effect>,
    pub model: Model,
    pub store: SqliteReportStore,
    pub dir: tempfile::TempDir,
    pub grant_location: bool,
    pub sink_failure: Option<SinkError>,
    pub renders: usize,
    pub cancelled: Vec<SubscriptionId>,
    pub abandoned: Vec<PathBuf>,
}

impl Shell {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.recording.output_dir = dir.path().join("audio");
        std::fs::create_dir_all(&config.recording.output_dir).unwrap();

        let mut shell = Self {
            app: AppTester::default(),
            model: Model::default(),
            store: SqliteReportStore::open(&dir.path().join("reports.db")).unwrap(),
            dir,
            grant_location: true,
            sink_failure: None,
            renders: 0,
            cancelled: Vec::new(),
            abandoned: Vec::new(),
        };
        shell.dispatch(Event::Configure(Box::new(config)));
        shell
    }

    pub fn dispatch(&mut self, event: Event) {
        let update = self.app.update(event, &mut self.model);
        self.process(update);
    }

    pub fn view(&self) -> ViewModel {
        self.app.view(&self.model)
    }

    fn process(&mut self, update: Update<Effect, Event>) {
        for event in update.events {
            self.dispatch(event);
        }
        for effect in update.effects {
            self.handle(effect);
        }
    }

    fn handle(&mut self, effect: Effect) {
        match effect {
            Effect::Render(_) => self.renders += 1,

            Effect::Location(mut request) => {
                let output = match &request.operation {
                    LocationOperation::RequestPermission => Ok(LocationOutput::Permission {
                        granted: self.grant_location,
                    }),
                    LocationOperation::LastKnown => Ok(LocationOutput::LastKnown(None)),
                    LocationOperation::SingleFix { .. } => Ok(LocationOutput::Fix(pune())),
                    LocationOperation::Cancel { subscription } => {
                        self.cancelled.push(*subscription);
                        return;
                    }
                };
                self.answer(&mut request, output);
            }

            Effect::Geocode(mut request) => {
                let output = match &request.operation {
                    GeocodeOperation::Reverse { .. } => {
                        Ok(GeocodeOutput::Addresses(vec![shaniwar_wada()]))
                    }
                    GeocodeOperation::Forward { query, .. } if query == SHANIWAR_WADA => {
                        Ok(GeocodeOutput::Coordinates(vec![pune()]))
                    }
                    GeocodeOperation::Forward { .. } => Ok(GeocodeOutput::Coordinates(vec![])),
                };
                self.answer(&mut request, output);
            }

            Effect::Recorder(mut request) => {
                let output = match &request.operation {
                    RecorderOperation::Start { target, .. } => {
                        std::fs::write(target, b"\x00\x00\x00\x18ftypM4A voice").unwrap();
                        Ok(RecorderOutput::Started)
                    }
                    RecorderOperation::Stop => Ok(RecorderOutput::Stopped),
                    RecorderOperation::Abandon { target } => {
                        self.abandoned.push(target.clone());
                        return;
                    }
                };
                self.answer(&mut request, output);
            }

            Effect::ReportSink(mut request) => {
                let SinkOperation::AddReport { report } = &request.operation;
                let output = match &self.sink_failure {
                    Some(error) => Err(error.clone()),
                    None => self.store.add_report(report),
                };
                self.answer(&mut request, output);
            }
        }
    }

    fn answer<Op: Operation>(&mut self, request: &mut Request<Op>, output: Op::Output) {
        let update = self
            .app
            .resolve(request, output)
            .expect("request should resolve");
        self.process(update);
    }
}

pub fn pune() -> LatLon {
    LatLon::new(PUNE.0, PUNE.1).unwrap()
}

pub fn shaniwar_wada() -> Address {
    Address {
        feature_name: Some("Shaniwar Wada".into()),
        thoroughfare: Some("Bajirao Road".into()),
        locality: Some("Pune".into()),
        admin_area: Some("Maharashtra".into()),
    }
}
