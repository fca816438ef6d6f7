use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    #[default]
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    #[default]
    Mpeg4,
    ThreeGpp,
    Ogg,
}

impl ContainerFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mpeg4 => "m4a",
            Self::ThreeGpp => "3gp",
            Self::Ogg => "ogg",
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Mpeg4 => "audio/mp4",
            Self::ThreeGpp => "audio/3gpp",
            Self::Ogg => "audio/ogg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    #[default]
    Aac,
    AmrNb,
    Opus,
}

/// Everything the native recorder needs before `prepare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderSettings {
    pub source: AudioSource,
    pub container: ContainerFormat,
    pub codec: AudioCodec,
    pub sample_rate_hz: u32,
    pub bit_rate_bps: u32,
}

/// The shell holds at most one native recorder. `Start` creates, prepares and starts it;
/// `Stop` stops and releases it; `Abandon` stops and releases without a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecorderOperation {
    Start {
        target: PathBuf,
        settings: RecorderSettings,
    },
    Stop,
    Abandon {
        target: PathBuf,
    },
}

impl Operation for RecorderOperation {
    type Output = RecorderResult;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecorderOutput {
    Started,
    Stopped,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecorderError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("microphone busy")]
    Busy,

    #[error("recorder failed: {0}")]
    Failed(String),
}

pub type RecorderResult = Result<RecorderOutput, RecorderError>;

#[derive(Clone)]
pub struct Recorder<E> {
    context: CapabilityContext<RecorderOperation, E>,
}

impl<Ev> Capability<Ev> for Recorder<Ev> {
    type Operation = RecorderOperation;
    type MappedSelf<MappedEv> = Recorder<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Recorder::new(self.context.map_event(f))
    }
}

impl<E> Recorder<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<RecorderOperation, E>) -> Self {
        Self { context }
    }
}

impl<E> Recorder<E>
where
    E: Send + 'static,
{
    pub fn start<F>(&self, target: PathBuf, settings: RecorderSettings, callback: F)
    where
        F: FnOnce(RecorderResult) -> E + Send + 'static,
    {
        self.request(RecorderOperation::Start { target, settings }, callback);
    }

    pub fn stop<F>(&self, callback: F)
    where
        F: FnOnce(RecorderResult) -> E + Send + 'static,
    {
        self.request(RecorderOperation::Stop, callback);
    }

    pub fn abandon(&self, target: PathBuf) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context
                .notify_shell(RecorderOperation::Abandon { target })
                .await;
        });
    }

    fn request<F>(&self, operation: RecorderOperation, callback: F)
    where
        F: FnOnce(RecorderResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}
