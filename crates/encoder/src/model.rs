//! Job data model: the loosely typed candidate, its validated form, and the result.

use std::fmt;
use std::path::PathBuf;

use frameforge_common::error::{FrameforgeError, FrameforgeResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::AsyncRead;

/// A pull-based byte stream of frames, read once and in order.
pub type FrameReader = Box<dyn AsyncRead + Send + Unpin>;

/// Whatever was supplied as the frame source of a job.
pub enum FrameSource {
    /// A readable byte stream.
    Stream(FrameReader),
    /// A value that was supplied in place of a stream.
    Value(Value),
}

impl FrameSource {
    pub fn stream(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("FrameSource::Stream(..)"),
            Self::Value(v) => f.debug_tuple("FrameSource::Value").field(v).finish(),
        }
    }
}

/// How the engine should interpret the frame bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FrameFormat {
    /// Let the engine probe the stream (e.g. concatenated PNG or JPEG images).
    #[default]
    Auto,
    /// Headerless frames of a fixed size.
    #[serde(rename_all = "camelCase")]
    RawVideo {
        width: u32,
        height: u32,
        pixel_format: String,
    },
}

/// Declared input frame rate and target output frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fps {
    pub input: f64,
    pub output: f64,
}

impl Fps {
    pub fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }
}

/// Background video and the window `[in_seconds, out_seconds)` during which
/// the frames are composited over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundVideo {
    pub video_path: PathBuf,
    pub in_seconds: f64,
    pub out_seconds: f64,
}

/// A candidate job configuration, checked by [`crate::validate`] before use.
///
/// Build one from JSON with [`JobSpec::from_json`] or from a typed
/// [`JobConfig`] via `From`.
#[derive(Debug)]
pub struct JobSpec {
    pub frame_source: FrameSource,
    pub output: Value,
    pub fps: Value,
    pub background_video: Option<Value>,
    pub silent: Option<bool>,
    pub frame_format: FrameFormat,
    pub frame_count: Option<u64>,
}

impl JobSpec {
    /// Read a job description such as
    /// `{"frameSource": ..., "output": "out.mp4", "fps": {"input": 10, "output": 30}}`.
    ///
    /// The `frameSource` value is kept as-is; callers that know how to turn it
    /// into a stream replace it with [`JobSpec::with_frame_source`].
    pub fn from_json(value: &Value) -> FrameforgeResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| FrameforgeError::config("job description must be a JSON object"))?;

        let field = |name: &str| obj.get(name).cloned().unwrap_or(Value::Null);

        let silent = match obj.get("silent") {
            None | Some(Value::Null) => None,
            Some(v) => Some(serde_json::from_value(v.clone())?),
        };
        let frame_format = match obj.get("frameFormat") {
            None | Some(Value::Null) => FrameFormat::Auto,
            Some(v) => serde_json::from_value(v.clone())?,
        };
        let frame_count = match obj.get("frameCount") {
            None | Some(Value::Null) => None,
            Some(v) => Some(serde_json::from_value(v.clone())?),
        };
        let background_video = obj
            .get("backgroundVideo")
            .filter(|v| !is_falsy(v))
            .cloned();

        Ok(Self {
            frame_source: FrameSource::Value(field("frameSource")),
            output: field("output"),
            fps: field("fps"),
            background_video,
            silent,
            frame_format,
            frame_count,
        })
    }

    pub fn with_frame_source(mut self, frame_source: FrameSource) -> Self {
        self.frame_source = frame_source;
        self
    }

    /// Whether notices and the progress display are suppressed.
    pub fn is_silent(&self) -> bool {
        self.silent.unwrap_or(true)
    }
}

/// A validated job configuration.
pub struct JobConfig {
    pub frame_source: FrameReader,
    pub output: PathBuf,
    pub fps: Fps,
    pub background_video: Option<BackgroundVideo>,
    pub silent: bool,
    pub frame_format: FrameFormat,
    pub frame_count: Option<u64>,
}

impl JobConfig {
    pub fn new(
        frame_source: impl AsyncRead + Send + Unpin + 'static,
        output: impl Into<PathBuf>,
        fps: Fps,
    ) -> Self {
        Self {
            frame_source: Box::new(frame_source),
            output: output.into(),
            fps,
            background_video: None,
            silent: true,
            frame_format: FrameFormat::Auto,
            frame_count: None,
        }
    }

    pub fn with_background_video(mut self, background: BackgroundVideo) -> Self {
        self.background_video = Some(background);
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_frame_format(mut self, format: FrameFormat) -> Self {
        self.frame_format = format;
        self
    }

    pub fn with_frame_count(mut self, count: u64) -> Self {
        self.frame_count = Some(count);
        self
    }

    /// Seconds of frame-source content, when the frame count is known.
    pub fn expected_duration_secs(&self) -> Option<f64> {
        let count = self.frame_count?;
        if self.fps.input > 0.0 {
            Some(count as f64 / self.fps.input)
        } else {
            None
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("output", &self.output)
            .field("fps", &self.fps)
            .field("background_video", &self.background_video)
            .field("silent", &self.silent)
            .field("frame_format", &self.frame_format)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl From<JobConfig> for JobSpec {
    fn from(config: JobConfig) -> Self {
        let background_video = config.background_video.map(|bg| {
            json!({
                "videoPath": bg.video_path.to_string_lossy(),
                "inSeconds": bg.in_seconds,
                "outSeconds": bg.out_seconds,
            })
        });

        Self {
            frame_source: FrameSource::Stream(config.frame_source),
            output: Value::String(config.output.to_string_lossy().into_owned()),
            fps: json!({ "input": config.fps.input, "output": config.fps.output }),
            background_video,
            silent: Some(config.silent),
            frame_format: config.frame_format,
            frame_count: config.frame_count,
        }
    }
}

/// The outcome of a successful job.
#[derive(Debug)]
pub struct JobResult {
    /// The output destination, echoed back.
    pub path: PathBuf,

    /// Handle to the written output file.
    pub output: tokio::fs::File,
}

/// `false`, `0`, `""` and `null` mean "not given" for optional sections.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
