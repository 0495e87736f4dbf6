pub mod check;
pub mod encode;
pub mod run;

use std::path::Path;

use frameforge_encoder::{FrameReader, JobResult};

/// Open a frame source: a file path, or `-` for stdin.
pub async fn open_frames(source: &str) -> anyhow::Result<FrameReader> {
    if source == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(Path::new(source))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open frame source {source}: {e}"))?;
    Ok(Box::new(file))
}

pub async fn report(result: JobResult) -> anyhow::Result<()> {
    let size = result.output.metadata().await?.len();
    println!("Encoded {} ({size} bytes)", result.path.display());
    Ok(())
}
