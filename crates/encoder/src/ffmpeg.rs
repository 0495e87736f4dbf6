//! [`EncodingEngine`] backed by the ffmpeg binary.

use std::collections::VecDeque;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use frameforge_common::config::FfmpegSettings;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::engine::{EncodingEngine, EngineEvent, EngineInvocation, EngineProgress, OutputHandle};

/// Stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// How long the frame feeder may take to finish once ffmpeg has exited.
const FEED_GRACE: Duration = Duration::from_millis(500);

/// Runs ffmpeg with frames on stdin, encoded output on stdout, and
/// `-progress` reports on stderr.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    settings: FfmpegSettings,
}

impl FfmpegEngine {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FfmpegSettings {
        &self.settings
    }
}

impl EncodingEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.settings.binary)
    }

    fn execute(&self, invocation: EngineInvocation) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let settings = self.settings.clone();

        tokio::spawn(async move {
            let event = match run_ffmpeg(&settings, invocation, &tx).await {
                Ok(output) => EngineEvent::End(output),
                Err(message) => EngineEvent::Error(message),
            };
            let _ = tx.send(event);
        });

        rx
    }
}

async fn run_ffmpeg(
    settings: &FfmpegSettings,
    invocation: EngineInvocation,
    events: &mpsc::UnboundedSender<EngineEvent>,
) -> Result<OutputHandle, String> {
    let EngineInvocation {
        command,
        mut frames,
        mut output,
        expected_duration_secs,
    } = invocation;

    let args = command.to_args(&settings.log_level);
    tracing::debug!(args = ?args, "Running ffmpeg");

    let mut child = Command::new(&settings.binary)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start ffmpeg: {e}"))?;

    tracing::info!(pid = child.id(), args_len = args.len(), "ffmpeg process started");
    let _ = events.send(EngineEvent::Start {
        command_line: format!("{} {}", settings.binary, args.join(" ")),
    });

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| "Failed to open ffmpeg stdin".to_string())?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| "Failed to capture ffmpeg stdout".to_string())?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| "Failed to capture ffmpeg stderr".to_string())?;

    let mut feed_task = tokio::spawn(async move {
        let copied = tokio::io::copy(&mut frames, &mut stdin).await;
        let _ = stdin.shutdown().await;
        copied
    });

    let sink_task = tokio::spawn(async move {
        tokio::io::copy(&mut stdout, &mut output).await?;
        output.flush().await?;
        Ok::<_, io::Error>(output)
    });

    let progress_events = events.clone();
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut state = ProgressState::default();
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match progress_pair(trimmed) {
                Some((key, value)) => {
                    if state.update(key, value) {
                        let _ = progress_events
                            .send(EngineEvent::Progress(state.report(expected_duration_secs)));
                    }
                }
                None => {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(trimmed.to_string());
                }
            }
        }

        tail.into_iter().collect::<Vec<_>>().join("\n")
    });

    let status = child
        .wait()
        .await
        .map_err(|e| format!("Failed to wait on ffmpeg: {e}"))?;

    // The feeder may be parked on a frame source that never ends; ffmpeg is gone either way.
    let fed = match tokio::time::timeout(FEED_GRACE, &mut feed_task).await {
        Ok(joined) => Some(joined.map_err(|e| format!("Frame feeder task failed: {e}"))?),
        Err(_) => {
            feed_task.abort();
            None
        }
    };
    let stderr_output = stderr_task
        .await
        .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
    let written = sink_task
        .await
        .map_err(|e| format!("Output writer task failed: {e}"))?;

    if !status.success() {
        return Err(exit_message(status.code(), &stderr_output));
    }

    match fed {
        Some(Ok(bytes)) => tracing::debug!(bytes, "Frame source drained"),
        // ffmpeg may stop reading before the source is exhausted.
        Some(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("ffmpeg closed stdin before the frame source ended")
        }
        Some(Err(e)) => return Err(format!("Failed to feed frames to ffmpeg: {e}")),
        None => tracing::debug!("ffmpeg finished before the frame source ended"),
    }

    written.map_err(|e| format!("Failed to write encoded output: {e}"))
}

fn exit_message(code: Option<i32>, stderr_output: &str) -> String {
    let status = match code {
        Some(code) => code.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    };
    format!("ffmpeg exited with status {status}: {}", stderr_output.trim())
}

/// Split a `-progress` line into key and value.
fn progress_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let is_key = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    is_key.then_some((key, value.trim()))
}

#[derive(Debug, Default)]
struct ProgressState {
    frame: u64,
    out_time_secs: f64,
    speed: Option<f64>,
    complete: bool,
}

impl ProgressState {
    /// Fold one key into the state. Returns `true` at the end of a report block.
    fn update(&mut self, key: &str, value: &str) -> bool {
        match key {
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.frame = frame;
                }
            }
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = (us / 1_000_000.0).max(0.0);
                }
            }
            "speed" => {
                self.speed = value
                    .strip_suffix('x')
                    .and_then(|s| s.trim().parse().ok());
            }
            "progress" => {
                self.complete = value == "end";
                return true;
            }
            _ => {}
        }
        false
    }

    fn report(&self, expected_duration_secs: Option<f64>) -> EngineProgress {
        let percent = if self.complete {
            Some(100.0)
        } else {
            expected_duration_secs
                .filter(|d| *d > 0.0)
                .map(|d| (self.out_time_secs / d * 100.0).clamp(0.0, 100.0))
        };

        EngineProgress {
            frame: self.frame,
            out_time_secs: self.out_time_secs,
            speed: self.speed,
            percent,
        }
    }
}

fn command_exists(binary: &str) -> bool {
    std::process::Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
