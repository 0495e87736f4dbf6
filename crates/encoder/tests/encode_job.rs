use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use frameforge_common::error::FrameforgeError;
use frameforge_encoder::{
    BackgroundVideo, DisplayFactory, Encoder, EncoderCommand, EncodingEngine, EngineEvent,
    EngineInvocation, EngineProgress, Filesystem, FrameFormat, FrameSource, Fps, InputSource,
    JobConfig, JobSpec, ProgressDisplay,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

const FRAME_BYTES: usize = 64 * 48 * 4;

#[derive(Debug, Clone)]
enum Step {
    Start,
    Progress(Option<f64>),
    End,
    Error(&'static str),
}

/// What the scripted engine saw.
#[derive(Debug, Default)]
struct Seen {
    commands: Vec<EncoderCommand>,
    frame_bytes: usize,
    expected_duration_secs: Option<f64>,
}

/// Engine that drains the frames, writes a fixed payload, then replays a script.
#[derive(Clone)]
struct ScriptedEngine {
    script: Vec<Step>,
    seen: Arc<Mutex<Seen>>,
}

impl ScriptedEngine {
    fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            seen: Arc::default(),
        }
    }

    fn invocations(&self) -> usize {
        self.seen.lock().unwrap().commands.len()
    }
}

impl EncodingEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn execute(&self, invocation: EngineInvocation) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let script = self.script.clone();
        let seen = Arc::clone(&self.seen);

        tokio::spawn(async move {
            let EngineInvocation {
                command,
                mut frames,
                mut output,
                expected_duration_secs,
            } = invocation;

            let mut buf = Vec::new();
            frames.read_to_end(&mut buf).await.unwrap();
            output.write_all(b"fake-mp4").await.unwrap();
            output.flush().await.unwrap();

            {
                let mut seen = seen.lock().unwrap();
                seen.commands.push(command);
                seen.frame_bytes = buf.len();
                seen.expected_duration_secs = expected_duration_secs;
            }

            for step in script {
                let event = match step {
                    Step::Start => EngineEvent::Start {
                        command_line: "scripted".to_string(),
                    },
                    Step::Progress(percent) => EngineEvent::Progress(EngineProgress {
                        percent,
                        ..Default::default()
                    }),
                    Step::End => EngineEvent::End(output.try_clone().await.unwrap()),
                    Step::Error(message) => EngineEvent::Error(message.to_string()),
                };
                let _ = tx.send(event);
            }
        });

        rx
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DisplayCall {
    Start(f64, f64),
    Update(f64),
    Stop,
}

#[derive(Default, Clone)]
struct DisplayLog {
    calls: Arc<Mutex<Vec<DisplayCall>>>,
    created: Arc<Mutex<usize>>,
}

impl DisplayLog {
    fn factory(&self) -> DisplayFactory {
        let log = self.clone();
        Arc::new(move || {
            *log.created.lock().unwrap() += 1;
            Box::new(RecordingDisplay {
                calls: Arc::clone(&log.calls),
            })
        })
    }

    fn calls(&self) -> Vec<DisplayCall> {
        self.calls.lock().unwrap().clone()
    }

    fn created(&self) -> usize {
        *self.created.lock().unwrap()
    }
}

struct RecordingDisplay {
    calls: Arc<Mutex<Vec<DisplayCall>>>,
}

impl ProgressDisplay for RecordingDisplay {
    fn start(&mut self, max: f64, initial: f64) {
        self.calls.lock().unwrap().push(DisplayCall::Start(max, initial));
    }

    fn update(&mut self, value: f64) {
        self.calls.lock().unwrap().push(DisplayCall::Update(value));
    }

    fn stop(&mut self) {
        self.calls.lock().unwrap().push(DisplayCall::Stop);
    }
}

struct DeniedFilesystem;

impl Filesystem for DeniedFilesystem {
    fn exists(&self, _path: &Path) -> bool {
        false
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        ))
    }
}

fn ten_frames() -> &'static [u8] {
    static FRAMES: [u8; FRAME_BYTES * 10] = [7u8; FRAME_BYTES * 10];
    &FRAMES
}

fn job(output: &Path) -> JobConfig {
    JobConfig::new(ten_frames(), output, Fps::new(10.0, 30.0))
}

#[tokio::test]
async fn test_silent_job_resolves_and_creates_directory() {
    let root = tempfile::tempdir().unwrap();
    let output = root.path().join("out").join("video.mp4");
    let engine = ScriptedEngine::new(vec![Step::Start, Step::Progress(Some(50.0)), Step::End]);
    let display = DisplayLog::default();
    let encoder = Encoder::new(engine.clone()).with_display_factory(display.factory());

    let result = encoder.run(job(&output)).await.unwrap();

    assert_eq!(result.path, output);
    assert!(root.path().join("out").is_dir());
    let metadata = result.output.metadata().await.unwrap();
    assert_eq!(metadata.len(), b"fake-mp4".len() as u64);
    assert_eq!(display.created(), 0);

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen.frame_bytes, FRAME_BYTES * 10);
    let command = &seen.commands[0];
    assert_eq!(command.inputs().len(), 1);
    assert_eq!(command.inputs()[0].source, InputSource::FrameStream);
    assert!(command.filter_graph().is_none());
}

#[tokio::test]
async fn test_background_video_builds_overlay_graph() {
    let root = tempfile::tempdir().unwrap();
    let output = root.path().join("video.mp4");
    let engine = ScriptedEngine::new(vec![Step::Start, Step::End]);
    let encoder = Encoder::new(engine.clone());

    let config = job(&output).with_background_video(BackgroundVideo {
        video_path: PathBuf::from("bg.mp4"),
        in_seconds: 2.0,
        out_seconds: 5.0,
    });
    encoder.run(config).await.unwrap();

    let seen = engine.seen.lock().unwrap();
    let command = &seen.commands[0];
    assert_eq!(command.inputs().len(), 2);
    assert_eq!(
        command.inputs()[0].source,
        InputSource::Path(PathBuf::from("bg.mp4"))
    );

    let graph = command.filter_graph().unwrap();
    assert!(graph.stages[0].to_string().contains("PTS+2/TB"));
    assert_eq!(graph.stages[1].named("enable"), Some("between(t,2,5)"));
    assert_eq!(command.map(), Some("[tmp]"));
}

#[tokio::test]
async fn test_plain_object_frame_source_is_rejected_before_engine_runs() {
    let root = tempfile::tempdir().unwrap();
    let output = root.path().join("video.mp4");
    let engine = ScriptedEngine::new(vec![Step::Start, Step::End]);
    let encoder = Encoder::new(engine.clone());

    let spec = JobSpec::from_json(&json!({
        "frameSource": {},
        "output": output.to_string_lossy(),
        "fps": {"input": 10, "output": 30},
    }))
    .unwrap();
    let err = encoder.run(spec).await.unwrap_err();

    match err {
        FrameforgeError::TypeMismatch {
            field, expected, ..
        } => {
            assert_eq!(field, "frameSource");
            assert_eq!(expected, "Readable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.invocations(), 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_missing_fps_is_rejected() {
    let engine = ScriptedEngine::new(vec![Step::Start, Step::End]);
    let encoder = Encoder::new(engine.clone());

    let spec = JobSpec::from_json(&json!({"output": "/tmp/never/video.mp4"}))
        .unwrap()
        .with_frame_source(FrameSource::stream(ten_frames()));
    let err = encoder.run(spec).await.unwrap_err();

    assert!(matches!(
        err,
        FrameforgeError::MissingOrInvalidField { field: "fps" }
    ));
    assert_eq!(engine.invocations(), 0);
}

#[tokio::test]
async fn test_directory_permission_error_is_directory_unavailable() {
    let engine = ScriptedEngine::new(vec![Step::Start, Step::End]);
    let encoder = Encoder::new(engine.clone()).with_filesystem(DeniedFilesystem);

    let err = encoder
        .run(job(Path::new("/protected/out/video.mp4")).with_silent(false))
        .await
        .unwrap_err();

    assert!(matches!(err, FrameforgeError::DirectoryUnavailable { .. }));
    assert_eq!(engine.invocations(), 0);
}

#[tokio::test]
async fn test_engine_error_rejects_with_its_message() {
    let root = tempfile::tempdir().unwrap();
    let engine = ScriptedEngine::new(vec![Step::Start, Step::Error("Conversion failed!")]);
    let display = DisplayLog::default();
    let encoder = Encoder::new(engine).with_display_factory(display.factory());

    let err = encoder
        .run(job(&root.path().join("video.mp4")).with_silent(false))
        .await
        .unwrap_err();

    assert!(matches!(err, FrameforgeError::EncodingFailure { .. }));
    assert_eq!(err.to_string(), "Conversion failed!");
    assert_eq!(
        display.calls(),
        vec![DisplayCall::Start(100.0, 0.0), DisplayCall::Stop]
    );
}

#[tokio::test]
async fn test_events_after_settlement_have_no_effect() {
    let root = tempfile::tempdir().unwrap();
    let engine = ScriptedEngine::new(vec![
        Step::Start,
        Step::End,
        Step::Error("late failure"),
        Step::Progress(Some(10.0)),
        Step::End,
    ]);
    let display = DisplayLog::default();
    let encoder = Encoder::new(engine).with_display_factory(display.factory());

    let result = encoder
        .run(job(&root.path().join("video.mp4")).with_silent(false))
        .await;

    assert!(result.is_ok());
    assert_eq!(
        display.calls(),
        vec![DisplayCall::Start(100.0, 0.0), DisplayCall::Stop]
    );
}

#[tokio::test]
async fn test_progress_values_are_mapped_for_display() {
    let root = tempfile::tempdir().unwrap();
    let engine = ScriptedEngine::new(vec![
        Step::Progress(Some(5.0)),
        Step::Start,
        Step::Progress(Some(12.3456)),
        Step::Progress(None),
        Step::Progress(Some(150.0)),
        Step::End,
    ]);
    let display = DisplayLog::default();
    let encoder = Encoder::new(engine).with_display_factory(display.factory());

    encoder
        .run(job(&root.path().join("video.mp4")).with_silent(false))
        .await
        .unwrap();

    assert_eq!(display.created(), 1);
    assert_eq!(
        display.calls(),
        vec![
            DisplayCall::Start(100.0, 0.0),
            DisplayCall::Update(12.35),
            DisplayCall::Update(0.0),
            DisplayCall::Update(100.0),
            DisplayCall::Stop,
        ]
    );
}

#[tokio::test]
async fn test_engine_without_terminal_event_is_a_failure() {
    let root = tempfile::tempdir().unwrap();
    let engine = ScriptedEngine::new(vec![Step::Start, Step::Progress(Some(40.0))]);
    let encoder = Encoder::new(engine);

    let err = encoder
        .run(job(&root.path().join("video.mp4")))
        .await
        .unwrap_err();

    assert!(matches!(err, FrameforgeError::EncodingFailure { .. }));
}

#[tokio::test]
async fn test_frame_count_sets_expected_duration() {
    let root = tempfile::tempdir().unwrap();
    let engine = ScriptedEngine::new(vec![Step::Start, Step::End]);
    let encoder = Encoder::new(engine.clone());

    encoder
        .run(job(&root.path().join("video.mp4")).with_frame_count(25))
        .await
        .unwrap();

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen.expected_duration_secs, Some(2.5));
}

#[tokio::test]
async fn test_jobs_are_independent() {
    let root = tempfile::tempdir().unwrap();
    let engine = ScriptedEngine::new(vec![Step::Start, Step::End]);
    let encoder = Encoder::new(engine.clone());

    let first = encoder.run(job(&root.path().join("a").join("one.mp4")));
    let second = encoder.run(job(&root.path().join("b").join("two.mp4")));
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap().path, root.path().join("a").join("one.mp4"));
    assert_eq!(second.unwrap().path, root.path().join("b").join("two.mp4"));
    assert_eq!(engine.invocations(), 2);
}

#[tokio::test]
async fn test_ffmpeg_encodes_raw_frames_when_available() {
    let encoder = Encoder::default();
    if !encoder.engine().is_available() {
        eprintln!("ffmpeg not on PATH; skipping");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let output = root.path().join("out").join("video.mp4");
    let config = job(&output)
        .with_frame_format(FrameFormat::RawVideo {
            width: 64,
            height: 48,
            pixel_format: "rgba".to_string(),
        })
        .with_frame_count(10);

    let result = encoder.run(config).await.unwrap();
    assert_eq!(result.path, output);
    assert!(std::fs::metadata(&output).unwrap().len() > 0);
}

#[tokio::test]
async fn test_ffmpeg_reports_missing_background() {
    let encoder = Encoder::default();
    if !encoder.engine().is_available() {
        eprintln!("ffmpeg not on PATH; skipping");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let config = job(&root.path().join("video.mp4"))
        .with_frame_format(FrameFormat::RawVideo {
            width: 64,
            height: 48,
            pixel_format: "rgba".to_string(),
        })
        .with_background_video(BackgroundVideo {
            video_path: root.path().join("missing-background.mp4"),
            in_seconds: 0.0,
            out_seconds: 1.0,
        });

    let err = encoder.run(config).await.unwrap_err();
    assert!(matches!(err, FrameforgeError::EncodingFailure { .. }));
    assert!(err.to_string().contains("ffmpeg exited with status"));
}

#[cfg(unix)]
mod scripted_binary {
    use std::os::unix::fs::PermissionsExt;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use frameforge_common::config::FfmpegSettings;
    use frameforge_encoder::FfmpegEngine;
    use tokio::io::{AsyncRead, ReadBuf};

    use super::*;

    /// An encoder whose ffmpeg binary is a shell script with `body`.
    fn scripted_encoder(dir: &Path, body: &str) -> Encoder {
        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        Encoder::new(FfmpegEngine::new(FfmpegSettings {
            binary: path.to_string_lossy().into_owned(),
            ..Default::default()
        }))
    }

    /// Yields a few bytes, then fails.
    struct UnpluggedCamera {
        sent: bool,
    }

    impl AsyncRead for UnpluggedCamera {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::other("camera unplugged")));
            }
            self.sent = true;
            buf.put_slice(b"frame");
            Poll::Ready(Ok(()))
        }
    }

    /// Never produces a byte and never ends.
    struct StalledCamera;

    impl AsyncRead for StalledCamera {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    #[tokio::test]
    async fn test_stdout_is_copied_into_output() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let output = root.path().join("out").join("video.mp4");
        let display = DisplayLog::default();
        let encoder = scripted_encoder(
            bin.path(),
            "cat\necho frame=10 >&2\necho out_time_us=1000000 >&2\necho progress=end >&2",
        )
        .with_display_factory(display.factory());

        let result = encoder.run(job(&output).with_silent(false)).await.unwrap();

        assert_eq!(result.path, output);
        assert_eq!(std::fs::read(&output).unwrap(), ten_frames());
        let calls = display.calls();
        assert_eq!(calls.first(), Some(&DisplayCall::Start(100.0, 0.0)));
        assert!(calls.contains(&DisplayCall::Update(100.0)));
        assert_eq!(calls.last(), Some(&DisplayCall::Stop));
    }

    #[tokio::test]
    async fn test_nonzero_exit_keeps_stderr_tail() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let encoder = scripted_encoder(
            bin.path(),
            "cat > /dev/null\necho 'Invalid pixel format' >&2\necho 'Conversion failed!' >&2\nexit 3",
        );

        let err = encoder
            .run(job(&root.path().join("video.mp4")))
            .await
            .unwrap_err();

        assert!(matches!(err, FrameforgeError::EncodingFailure { .. }));
        let message = err.to_string();
        assert!(message.starts_with("ffmpeg exited with status 3:"), "{message}");
        assert!(message.contains("Invalid pixel format"));
        assert!(message.contains("Conversion failed!"));
    }

    #[tokio::test]
    async fn test_frame_source_read_error_rejects() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let encoder = scripted_encoder(bin.path(), "cat > /dev/null");

        let config = JobConfig::new(
            UnpluggedCamera { sent: false },
            root.path().join("video.mp4"),
            Fps::new(10.0, 30.0),
        );
        let err = encoder.run(config).await.unwrap_err();

        assert!(matches!(err, FrameforgeError::EncodingFailure { .. }));
        assert!(err.to_string().contains("camera unplugged"), "{err}");
    }

    #[tokio::test]
    async fn test_early_exit_does_not_wait_for_stalled_frames() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let encoder = scripted_encoder(bin.path(), "exit 0");

        let config = JobConfig::new(
            StalledCamera,
            root.path().join("video.mp4"),
            Fps::new(10.0, 30.0),
        );
        let result = tokio::time::timeout(Duration::from_secs(10), encoder.run(config))
            .await
            .expect("job settles once the encoder exits")
            .unwrap();

        assert_eq!(result.output.metadata().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_missing_binary_rejects() {
        let root = tempfile::tempdir().unwrap();
        let encoder = Encoder::new(FfmpegEngine::new(FfmpegSettings {
            binary: root.path().join("no-such-ffmpeg").to_string_lossy().into_owned(),
            ..Default::default()
        }));

        let err = encoder
            .run(job(&root.path().join("video.mp4")))
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to start ffmpeg"), "{err}");
    }
}
