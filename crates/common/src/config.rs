//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FrameforgeError, FrameforgeResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output encoding options applied to every job.
    pub encoding: OutputEncoding,

    /// How the ffmpeg binary is invoked.
    pub ffmpeg: FfmpegSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Fixed output encoding parameters.
///
/// The defaults produce a fragmented MP4 that can be written to a
/// non-seekable destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputEncoding {
    /// Encoder speed preset (`-preset`).
    pub preset: String,

    /// Constant rate factor (`-crf`).
    pub crf: u8,

    /// Container format (`-f`).
    pub format: String,

    /// Muxer flags (`-movflags`).
    pub movflags: String,

    /// Output pixel format (`-pix_fmt`).
    pub pixel_format: String,

    /// Explicit video codec (`-c:v`); ffmpeg picks the container default when unset.
    pub video_codec: Option<String>,
}

/// Settings for the ffmpeg process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegSettings {
    /// Binary name or path.
    pub binary: String,

    /// Value passed to `-loglevel`.
    pub log_level: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "frameforge_encoder=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for OutputEncoding {
    fn default() -> Self {
        Self {
            preset: "veryfast".to_string(),
            crf: 24,
            format: "mp4".to_string(),
            movflags: "frag_keyframe+empty_moov".to_string(),
            pixel_format: "yuv420p".to_string(),
            video_codec: None,
        }
    }
}

impl OutputEncoding {
    /// Render as ffmpeg output arguments, in a stable order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(12);
        if let Some(codec) = &self.video_codec {
            args.push("-c:v".to_string());
            args.push(codec.clone());
        }
        args.extend([
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-f".to_string(),
            self.format.clone(),
            "-movflags".to_string(),
            self.movflags.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
        ]);
        args
    }
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            log_level: "error".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> FrameforgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings ffmpeg would refuse.
    pub fn validate(&self) -> FrameforgeResult<()> {
        if self.encoding.crf > 51 {
            return Err(FrameforgeError::config(format!(
                "crf must be in 0..=51, got {}",
                self.encoding.crf
            )));
        }
        if self.encoding.format.trim().is_empty() {
            return Err(FrameforgeError::config("container format must not be empty"));
        }
        if self.ffmpeg.binary.trim().is_empty() {
            return Err(FrameforgeError::config("ffmpeg binary must not be empty"));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("frameforge").join("config.json")
}
