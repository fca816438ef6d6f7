use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Report, ReportId};

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum SinkError {
    #[error("report {0} was already stored")]
    Duplicate(ReportId),

    #[error("report store unavailable: {0}")]
    Unavailable(String),

    #[error("report rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SinkOperation {
    AddReport { report: Box<Report> },
}

impl Operation for SinkOperation {
    type Output = SinkResult;
}

pub type SinkResult = Result<(), SinkError>;

/// Hands finalized reports to the shell. Delivery onward is the shell's responsibility.
#[derive(Clone)]
pub struct ReportSink<E> {
    context: CapabilityContext<SinkOperation, E>,
}

impl<Ev> Capability<Ev> for ReportSink<Ev> {
    type Operation = SinkOperation;
    type MappedSelf<MappedEv> = ReportSink<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        ReportSink::new(self.context.map_event(f))
    }
}

impl<E> ReportSink<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<SinkOperation, E>) -> Self {
        Self { context }
    }
}

impl<E> ReportSink<E>
where
    E: Send + 'static,
{
    pub fn add_report<F>(&self, report: Report, callback: F)
    where
        F: FnOnce(SinkResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(SinkOperation::AddReport {
                    report: Box::new(report),
                })
                .await;
            context.update_app(callback(result));
        });
    }
}
