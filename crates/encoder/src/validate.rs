//! Job configuration checks.
//!
//! All checks run even after one fails; every failure rejects the job's
//! settlement, so the first failure found is the one the caller sees.

use std::path::PathBuf;

use frameforge_common::error::FrameforgeError;
use serde_json::Value;

use crate::model::{BackgroundVideo, FrameReader, FrameSource, Fps, JobConfig, JobSpec};
use crate::settle::Settlement;

/// Check a candidate job and convert it into a [`JobConfig`].
///
/// Returns `None` when any check failed; the failures have been reported
/// through `settlement`.
pub fn validate<T>(spec: JobSpec, settlement: &Settlement<T>) -> Option<JobConfig> {
    let silent = spec.is_silent();
    let JobSpec {
        frame_source,
        output,
        fps,
        background_video,
        frame_format,
        frame_count,
        ..
    } = spec;

    let frame_source = check_frame_source(frame_source).map_err(|e| settlement.reject(e));
    let output = check_output(&output).map_err(|e| settlement.reject(e));
    let fps = check_fps(&fps).map_err(|e| settlement.reject(e));
    let background_video = match background_video {
        Some(value) => check_background_video(&value)
            .map(Some)
            .map_err(|e| settlement.reject(e)),
        None => Ok(None),
    };

    Some(JobConfig {
        frame_source: frame_source.ok()?,
        output: output.ok()?,
        fps: fps.ok()?,
        background_video: background_video.ok()?,
        silent,
        frame_format,
        frame_count,
    })
}

/// Name of a JSON value's kind, as reported in type mismatches.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_frame_source(source: FrameSource) -> Result<FrameReader, FrameforgeError> {
    match source {
        FrameSource::Stream(reader) => Ok(reader),
        FrameSource::Value(value) => Err(FrameforgeError::type_mismatch(
            "frameSource",
            "Readable",
            json_kind(&value),
        )),
    }
}

fn check_output(output: &Value) -> Result<PathBuf, FrameforgeError> {
    match output {
        Value::String(path) => Ok(PathBuf::from(path)),
        other => Err(FrameforgeError::type_mismatch(
            "output",
            "string",
            json_kind(other),
        )),
    }
}

fn check_fps(fps: &Value) -> Result<Fps, FrameforgeError> {
    let rate = |key: &str| {
        fps.get(key)
            .and_then(Value::as_f64)
            .filter(|r| r.is_finite() && *r > 0.0)
    };

    match (rate("input"), rate("output")) {
        (Some(input), Some(output)) => Ok(Fps { input, output }),
        _ => Err(FrameforgeError::missing_field("fps")),
    }
}

fn check_background_video(value: &Value) -> Result<BackgroundVideo, FrameforgeError> {
    let in_seconds = value.get("inSeconds").and_then(Value::as_f64);
    let out_seconds = value.get("outSeconds").and_then(Value::as_f64);
    let video_path = value.get("videoPath").and_then(Value::as_str);

    let (Some(in_seconds), Some(out_seconds), Some(video_path)) =
        (in_seconds, out_seconds, video_path)
    else {
        return Err(FrameforgeError::malformed_background(
            "expected numeric inSeconds/outSeconds and a string videoPath",
        ));
    };

    if in_seconds > out_seconds {
        return Err(FrameforgeError::malformed_background(format!(
            "overlay window is inverted: inSeconds {in_seconds} > outSeconds {out_seconds}"
        )));
    }

    Ok(BackgroundVideo {
        video_path: PathBuf::from(video_path),
        in_seconds,
        out_seconds,
    })
}
