//! Run a JSON job description.
//!
//! The job file uses the same keys as the library's JSON form. A string
//! `frameSource` names a file to read frames from, or `-` for stdin; any other
//! value is handed to validation unchanged.

use std::path::PathBuf;

use frameforge_common::config::AppConfig;
use frameforge_encoder::{Encoder, FrameSource, JobSpec};
use serde_json::Value;

pub async fn run(config: &AppConfig, job: PathBuf) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&job)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read job {}: {e}", job.display()))?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Job {} is not valid JSON: {e}", job.display()))?;

    let mut spec = JobSpec::from_json(&value)?;
    if let Some(source) = value.get("frameSource").and_then(Value::as_str) {
        let frames = super::open_frames(source).await?;
        spec = spec.with_frame_source(FrameSource::Stream(frames));
    }

    println!("Running job: {}", job.display());
    let result = Encoder::from_config(config).run(spec).await?;
    super::report(result).await
}
