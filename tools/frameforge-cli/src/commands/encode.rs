//! Encode frames from a file or stdin.

use std::path::PathBuf;

use frameforge_common::config::AppConfig;
use frameforge_encoder::{BackgroundVideo, Encoder, FrameFormat, Fps, JobConfig};

pub struct EncodeArgs {
    pub input: String,
    pub output: PathBuf,
    pub input_fps: f64,
    pub output_fps: f64,
    pub background: Option<PathBuf>,
    pub in_seconds: f64,
    pub out_seconds: Option<f64>,
    pub raw: Option<String>,
    pub pix_fmt: String,
    pub frame_count: Option<u64>,
    pub silent: bool,
}

pub async fn run(config: &AppConfig, args: EncodeArgs) -> anyhow::Result<()> {
    let frame_format = match &args.raw {
        Some(size) => {
            let (width, height) = parse_size(size)?;
            FrameFormat::RawVideo {
                width,
                height,
                pixel_format: args.pix_fmt.clone(),
            }
        }
        None => FrameFormat::Auto,
    };

    let frames = super::open_frames(&args.input).await?;
    let mut job = JobConfig::new(frames, &args.output, Fps::new(args.input_fps, args.output_fps))
        .with_silent(args.silent)
        .with_frame_format(frame_format);

    if let Some(count) = args.frame_count {
        job = job.with_frame_count(count);
    }

    if let Some(video_path) = args.background {
        let out_seconds = args
            .out_seconds
            .ok_or_else(|| anyhow::anyhow!("--out is required with --background"))?;
        job = job.with_background_video(BackgroundVideo {
            video_path,
            in_seconds: args.in_seconds,
            out_seconds,
        });
    }

    tracing::debug!(?job, "Encoding");
    let result = Encoder::from_config(config).run(job).await?;
    super::report(result).await
}

/// Parse `WIDTHxHEIGHT`.
fn parse_size(size: &str) -> anyhow::Result<(u32, u32)> {
    let (width, height) = size
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow::anyhow!("Invalid frame size {size:?}, expected WIDTHxHEIGHT"))?;
    let width = width.trim().parse()?;
    let height = height.trim().parse()?;
    if width == 0 || height == 0 {
        anyhow::bail!("Frame size must be non-zero, got {size}");
    }
    Ok((width, height))
}
