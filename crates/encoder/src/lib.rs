//! Frameforge Encoder
//!
//! Turns a stream of frames into a fragmented MP4 by driving ffmpeg, with an
//! optional background video the frames are composited over during a time
//! window.
//!
//! # Pipeline Architecture
//!
//! ```text
//! frames (AsyncRead) ──► stdin ─┐
//!                               ├── ffmpeg ── stdout ──► output file
//! background.mp4 ───────────────┘    │
//!                                    └── stderr (-progress) ──► progress display
//! ```
//!
//! ```no_run
//! use frameforge_encoder::{Encoder, Fps, JobConfig};
//!
//! # async fn demo() -> frameforge_common::FrameforgeResult<()> {
//! let frames = tokio::fs::File::open("frames.bin").await?;
//! let job = JobConfig::new(frames, "out/video.mp4", Fps::new(10.0, 30.0));
//! let result = Encoder::default().run(job).await?;
//! println!("wrote {}", result.path.display());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod filter;
pub mod job;
pub mod lifecycle;
pub mod model;
pub mod output_dir;
pub mod progress;
pub mod settle;
pub mod validate;

pub use command::{build_command, EncoderCommand, EncoderInput, InputSource};
pub use engine::{EncodingEngine, EngineEvent, EngineInvocation, EngineProgress, OutputHandle};
pub use ffmpeg::FfmpegEngine;
pub use filter::{build_overlay_graph, FilterArg, FilterGraph, FilterStage};
pub use job::{encode, Encoder, JobHandle};
pub use lifecycle::{JobState, Lifecycle, Signal};
pub use model::{
    BackgroundVideo, FrameFormat, FrameReader, FrameSource, Fps, JobConfig, JobResult, JobSpec,
};
pub use output_dir::{Filesystem, StdFilesystem};
pub use progress::{progress_percent, DisplayFactory, ProgressDisplay, TerminalProgress};
pub use settle::Settlement;
