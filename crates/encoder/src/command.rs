//! Declarative encoder command and its ffmpeg argument rendering.

use std::path::PathBuf;

use frameforge_common::config::OutputEncoding;

use crate::filter::{build_overlay_graph, FilterGraph};
use crate::model::{FrameFormat, JobConfig};

/// Where an input's bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// A file or URL ffmpeg opens itself.
    Path(PathBuf),
    /// The job's frame source, fed through the engine's stdin.
    FrameStream,
}

/// One encoder input and the options that apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderInput {
    pub source: InputSource,
    pub options: Vec<String>,
}

impl EncoderInput {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: InputSource::Path(path.into()),
            options: Vec::new(),
        }
    }

    pub fn frame_stream() -> Self {
        Self {
            source: InputSource::FrameStream,
            options: Vec::new(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(key.into());
        self.options.push(value.into());
        self
    }

    /// Declare the frame rate the input is produced at.
    pub fn input_fps(self, fps: f64) -> Self {
        self.option("-r", fps.to_string())
    }
}

/// Everything the encoding engine needs to know about one job, except the
/// byte streams themselves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncoderCommand {
    inputs: Vec<EncoderInput>,
    output_options: Vec<String>,
    output_fps: Option<f64>,
    filter_graph: Option<FilterGraph>,
    map: Option<String>,
}

impl EncoderCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: EncoderInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output_options<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_options.extend(args.into_iter().map(Into::into));
        self
    }

    /// Resample the output to `fps`.
    pub fn output_fps(mut self, fps: f64) -> Self {
        self.output_fps = Some(fps);
        self
    }

    /// Attach a filter graph and map its final output.
    pub fn complex_filter(mut self, graph: FilterGraph) -> Self {
        self.map = Some(graph.map_target());
        self.filter_graph = Some(graph);
        self
    }

    pub fn inputs(&self) -> &[EncoderInput] {
        &self.inputs
    }

    pub fn filter_graph(&self) -> Option<&FilterGraph> {
        self.filter_graph.as_ref()
    }

    pub fn map(&self) -> Option<&str> {
        self.map.as_deref()
    }

    pub fn output_fps_value(&self) -> Option<f64> {
        self.output_fps
    }

    /// Index of the frame-stream input, if any.
    pub fn frame_input_index(&self) -> Option<usize> {
        self.inputs
            .iter()
            .position(|input| input.source == InputSource::FrameStream)
    }

    /// Render ffmpeg arguments. Progress goes to stderr and the encoded
    /// output to stdout.
    pub fn to_args(&self, log_level: &str) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            log_level.to_string(),
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];

        for input in &self.inputs {
            args.extend(input.options.iter().cloned());
            args.push("-i".to_string());
            args.push(match &input.source {
                InputSource::Path(path) => path.display().to_string(),
                InputSource::FrameStream => "pipe:0".to_string(),
            });
        }

        if let Some(graph) = &self.filter_graph {
            args.push("-filter_complex".to_string());
            args.push(graph.render());
        }
        if let Some(map) = &self.map {
            args.push("-map".to_string());
            args.push(map.clone());
        }

        args.extend(self.output_options.iter().cloned());

        if let Some(fps) = self.output_fps {
            args.push("-r".to_string());
            args.push(fps.to_string());
        }

        args.push("pipe:1".to_string());
        args
    }
}

/// Build the encoder command for a validated job.
pub fn build_command(config: &JobConfig, encoding: &OutputEncoding) -> EncoderCommand {
    let mut command = EncoderCommand::new();

    if let Some(background) = &config.background_video {
        command = command.input(EncoderInput::path(&background.video_path));
    }

    let mut frames = EncoderInput::frame_stream();
    if let FrameFormat::RawVideo {
        width,
        height,
        pixel_format,
    } = &config.frame_format
    {
        frames = frames
            .option("-f", "rawvideo")
            .option("-pix_fmt", pixel_format.clone())
            .option("-s", format!("{width}x{height}"));
    }
    command = command
        .input(frames.input_fps(config.fps.input))
        .output_options(encoding.to_args())
        .output_fps(config.fps.output);

    if let Some(background) = &config.background_video {
        command = command.complex_filter(build_overlay_graph(background));
    }

    command
}
