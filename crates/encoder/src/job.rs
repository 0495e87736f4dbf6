//! Encode job driver.
//!
//! [`Encoder::run`] returns a [`JobHandle`] immediately; the job itself runs
//! on a spawned task:
//!
//! ```text
//! JobSpec ── validate ── ensure output dir ── open output ── build command
//!                                                               │
//!            JobHandle ◄── settle ◄── start/progress/end/error ◄─┘ engine
//! ```
//!
//! Validation and directory failures settle the job and stop it before the
//! output is opened or the engine is invoked.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use frameforge_common::config::{AppConfig, OutputEncoding};
use frameforge_common::error::{FrameforgeError, FrameforgeResult};
use tokio::sync::oneshot;

use crate::command::build_command;
use crate::engine::{EncodingEngine, EngineEvent, EngineInvocation};
use crate::ffmpeg::FfmpegEngine;
use crate::lifecycle::Lifecycle;
use crate::model::{JobConfig, JobResult, JobSpec};
use crate::output_dir::{ensure_output_dir, Filesystem, StdFilesystem};
use crate::progress::{progress_percent, DisplayFactory, ProgressDisplay, TerminalProgress};
use crate::settle::Settlement;
use crate::validate::validate;

/// Runs encode jobs against an engine.
///
/// Cheap to clone; every call to [`Encoder::run`] is independent.
#[derive(Clone)]
pub struct Encoder {
    engine: Arc<dyn EncodingEngine>,
    filesystem: Arc<dyn Filesystem>,
    encoding: OutputEncoding,
    display_factory: DisplayFactory,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(FfmpegEngine::default())
    }
}

impl Encoder {
    pub fn new(engine: impl EncodingEngine + 'static) -> Self {
        Self {
            engine: Arc::new(engine),
            filesystem: Arc::new(StdFilesystem),
            encoding: OutputEncoding::default(),
            display_factory: TerminalProgress::factory(),
        }
    }

    /// An ffmpeg-backed encoder using the given application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(FfmpegEngine::new(config.ffmpeg.clone())).with_encoding(config.encoding.clone())
    }

    pub fn with_filesystem(mut self, filesystem: impl Filesystem + 'static) -> Self {
        self.filesystem = Arc::new(filesystem);
        self
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_display_factory(mut self, factory: DisplayFactory) -> Self {
        self.display_factory = factory;
        self
    }

    pub fn engine(&self) -> &dyn EncodingEngine {
        self.engine.as_ref()
    }

    /// Start a job. Must be called within a tokio runtime.
    pub fn run(&self, spec: impl Into<JobSpec>) -> JobHandle {
        let spec = spec.into();
        let (settlement, rx) = Settlement::new();
        tokio::spawn(drive(self.clone(), spec, settlement));
        JobHandle { rx }
    }
}

/// Resolves once the job it belongs to is settled.
#[derive(Debug)]
pub struct JobHandle {
    rx: oneshot::Receiver<FrameforgeResult<JobResult>>,
}

impl Future for JobHandle {
    type Output = FrameforgeResult<JobResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(FrameforgeError::encoding(
                    "encoding job ended without a result",
                ))
            })
        })
    }
}

async fn drive(encoder: Encoder, spec: JobSpec, settlement: Settlement<JobResult>) {
    let silent = spec.is_silent();

    let Some(config) = validate(spec, &settlement) else {
        return;
    };
    if !ensure_output_dir(encoder.filesystem.as_ref(), &config.output, silent, &settlement) {
        return;
    }

    let output = match tokio::fs::File::create(&config.output).await {
        Ok(file) => file,
        Err(e) => {
            if !silent {
                tracing::warn!(output = %config.output.display(), error = %e, "Could not open output file");
            }
            settlement.reject(FrameforgeError::Io(e));
            return;
        }
    };

    let command = build_command(&config, &encoder.encoding);
    let expected_duration_secs = config.expected_duration_secs();
    let JobConfig {
        frame_source,
        output: path,
        ..
    } = config;

    tracing::debug!(
        output = %path.display(),
        inputs = command.inputs().len(),
        overlay = command.filter_graph().is_some(),
        engine = encoder.engine.name(),
        "Starting encode job"
    );

    let events = encoder.engine.execute(EngineInvocation {
        command,
        frames: frame_source,
        output,
        expected_duration_secs,
    });

    let display = if silent {
        None
    } else {
        Some((encoder.display_factory)())
    };
    pump_events(events, path, display, silent, &settlement).await;
}

async fn pump_events(
    mut events: tokio::sync::mpsc::UnboundedReceiver<EngineEvent>,
    path: PathBuf,
    mut display: Option<Box<dyn ProgressDisplay>>,
    silent: bool,
    settlement: &Settlement<JobResult>,
) {
    let mut lifecycle = Lifecycle::new();

    while let Some(event) = events.recv().await {
        if !lifecycle.apply(event.signal()) {
            continue;
        }

        match event {
            EngineEvent::Start { command_line } => {
                tracing::debug!(%command_line, "Encoder started");
                if let Some(display) = display.as_mut() {
                    display.start(100.0, 0.0);
                }
            }
            EngineEvent::Progress(progress) => {
                tracing::trace!(
                    frame = progress.frame,
                    out_time_secs = progress.out_time_secs,
                    percent = ?progress.percent,
                    "Encoder progress"
                );
                if let Some(display) = display.as_mut() {
                    display.update(progress_percent(progress.percent));
                }
            }
            EngineEvent::End(output) => {
                if let Some(display) = display.as_mut() {
                    display.stop();
                }
                if !silent {
                    tracing::info!(output = %path.display(), "Processing complete");
                }
                settlement.resolve(JobResult {
                    path: path.clone(),
                    output,
                });
            }
            EngineEvent::Error(message) => {
                if let Some(display) = display.as_mut() {
                    display.stop();
                }
                if !silent {
                    tracing::warn!(error = %message, "An error occurred while processing");
                }
                settlement.reject(FrameforgeError::encoding(message));
            }
        }
    }

    if !lifecycle.state().is_terminal() {
        settlement.reject(FrameforgeError::encoding(
            "encoder stopped without reporting completion",
        ));
    }
}

/// Start a job with the default ffmpeg-backed [`Encoder`].
pub fn encode(spec: impl Into<JobSpec>) -> JobHandle {
    Encoder::default().run(spec)
}
