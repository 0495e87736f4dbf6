//! Encoding engine interface.

use tokio::sync::mpsc;

use crate::command::EncoderCommand;
use crate::lifecycle::Signal;
use crate::model::FrameReader;

/// Destination the encoded output is written into.
pub type OutputHandle = tokio::fs::File;

/// Everything an engine needs to run one job.
pub struct EngineInvocation {
    pub command: EncoderCommand,
    pub frames: FrameReader,
    pub output: OutputHandle,

    /// Seconds of frame-source content, when known. Used to derive a percentage.
    pub expected_duration_secs: Option<f64>,
}

/// Progress reported by a running engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineProgress {
    /// Frames written so far.
    pub frame: u64,

    /// Output timestamp reached, in seconds.
    pub out_time_secs: f64,

    /// Encoding speed relative to realtime.
    pub speed: Option<f64>,

    /// Completion percentage, when the engine can tell.
    pub percent: Option<f64>,
}

/// Lifecycle events emitted by an engine.
#[derive(Debug)]
pub enum EngineEvent {
    Start { command_line: String },
    Progress(EngineProgress),
    /// The output is complete; the handle is given back.
    End(OutputHandle),
    Error(String),
}

impl EngineEvent {
    pub fn signal(&self) -> Signal {
        match self {
            Self::Start { .. } => Signal::Start,
            Self::Progress(_) => Signal::Progress,
            Self::End(_) => Signal::End,
            Self::Error(_) => Signal::Error,
        }
    }
}

/// An external encoder driven through start/progress/end/error events.
pub trait EncodingEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Check if this engine can run on the system.
    fn is_available(&self) -> bool;

    /// Start encoding. Must be called within a tokio runtime.
    ///
    /// Events arrive on the returned channel, which closes once the engine
    /// has nothing more to report.
    fn execute(&self, invocation: EngineInvocation) -> mpsc::UnboundedReceiver<EngineEvent>;
}
