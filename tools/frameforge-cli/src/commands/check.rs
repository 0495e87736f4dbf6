//! Check that the encoder can run.

use std::path::Path;

use frameforge_common::config::{config_file_path, AppConfig};
use frameforge_encoder::{EncodingEngine, FfmpegEngine};

pub fn run(config: &AppConfig, config_override: Option<&Path>) -> anyhow::Result<()> {
    println!("Frameforge System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_override
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not found)", config_path.display());
    }

    let engine = FfmpegEngine::new(config.ffmpeg.clone());
    let binary = &engine.settings().binary;
    let available = engine.is_available();
    if available {
        println!("[OK] Encoder: {} ({binary})", engine.name());
    } else {
        println!(
            "[FAIL] Encoder: {binary} not found; install ffmpeg or set ffmpeg.binary in the config"
        );
    }
    println!("     Output options: {}", config.encoding.to_args().join(" "));

    println!();
    if available {
        println!("Frameforge is ready.");
        Ok(())
    } else {
        anyhow::bail!("encoder unavailable")
    }
}
