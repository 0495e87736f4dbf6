//! Frameforge CLI: encode frame streams into MP4.
//!
//! Usage:
//!   frameforge encode [OPTIONS]   Encode frames from a file or stdin
//!   frameforge run <JOB>          Run a JSON job description
//!   frameforge check              Check that the encoder can run

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use frameforge_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "frameforge",
    about = "Encode frame streams into MP4, optionally over a background video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode frames into a video file
    Encode {
        /// Frame source file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Rate the frames are produced at
        #[arg(long, default_value = "30")]
        input_fps: f64,

        /// Rate of the encoded output
        #[arg(long, default_value = "30")]
        output_fps: f64,

        /// Background video to composite the frames over
        #[arg(long)]
        background: Option<PathBuf>,

        /// Start of the overlay window (seconds)
        #[arg(long = "in", default_value = "0", requires = "background")]
        in_seconds: f64,

        /// End of the overlay window (seconds)
        #[arg(long = "out", requires = "background")]
        out_seconds: Option<f64>,

        /// Frames are raw video of this size, e.g. 1280x720
        #[arg(long)]
        raw: Option<String>,

        /// Pixel format of raw frames
        #[arg(long, default_value = "rgba", requires = "raw")]
        pix_fmt: String,

        /// Number of frames, for a progress percentage
        #[arg(long)]
        frame_count: Option<u64>,

        /// Hide the progress bar and notices
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run a JSON job description
    Run {
        /// Path to the job file
        job: PathBuf,
    },

    /// Check that the encoder can run
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    frameforge_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Encode {
            input,
            output,
            input_fps,
            output_fps,
            background,
            in_seconds,
            out_seconds,
            raw,
            pix_fmt,
            frame_count,
            quiet,
        } => {
            commands::encode::run(
                &config,
                commands::encode::EncodeArgs {
                    input,
                    output,
                    input_fps,
                    output_fps,
                    background,
                    in_seconds,
                    out_seconds,
                    raw,
                    pix_fmt,
                    frame_count,
                    silent: quiet,
                },
            )
            .await
        }
        Commands::Run { job } => commands::run::run(&config, job).await,
        Commands::Check => commands::check::run(&config, cli.config.as_deref()),
    }
}
