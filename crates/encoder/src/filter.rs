//! Filter graph for compositing the frames over a background video.
//!
//! Input 0 is the background video and input 1 the frame source:
//!
//! ```text
//! [1:v] ── setpts=PTS+in/TB ── [out] ──┐
//!                                     ├── overlay (enabled in [in, out)) ── [tmp]
//! [0:v] ──────────────────────────────┘
//! ```

use std::fmt;

use crate::model::BackgroundVideo;

/// Label of the composite stream that gets mapped to the output.
pub const COMPOSITE_LABEL: &str = "tmp";

const SHIFTED_LABEL: &str = "out";

/// One argument of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    Positional(String),
    Named(String, String),
}

/// A single filter with its input and output pad labels.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    pub inputs: Vec<String>,
    pub filter: String,
    pub args: Vec<FilterArg>,
    pub outputs: Vec<String>,
}

impl FilterStage {
    /// Value of a named argument.
    pub fn named(&self, name: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| match arg {
            FilterArg::Named(key, value) if key == name => Some(value.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{input}]")?;
        }
        f.write_str(&self.filter)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            match arg {
                FilterArg::Positional(value) => f.write_str(&escape_value(value))?,
                FilterArg::Named(key, value) => write!(f, "{key}={}", escape_value(value))?,
            }
        }
        for output in &self.outputs {
            write!(f, "[{output}]")?;
        }
        Ok(())
    }
}

/// An ordered chain of filter stages with a named final output.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub stages: Vec<FilterStage>,
    pub output: String,
}

impl FilterGraph {
    /// Render in `-filter_complex` syntax.
    pub fn render(&self) -> String {
        self.stages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// The `-map` target for the final output.
    pub fn map_target(&self) -> String {
        format!("[{}]", self.output)
    }
}

/// Build the two-stage overlay graph for a background video.
pub fn build_overlay_graph(background: &BackgroundVideo) -> FilterGraph {
    let shift = FilterStage {
        inputs: vec!["1:v".to_string()],
        filter: "setpts".to_string(),
        args: vec![FilterArg::Positional(format!(
            "PTS+{}/TB",
            background.in_seconds
        ))],
        outputs: vec![SHIFTED_LABEL.to_string()],
    };

    let overlay = FilterStage {
        inputs: vec!["0:v".to_string(), SHIFTED_LABEL.to_string()],
        filter: "overlay".to_string(),
        args: vec![
            FilterArg::Named(
                "enable".to_string(),
                format!(
                    "between(t,{},{})",
                    background.in_seconds, background.out_seconds
                ),
            ),
            FilterArg::Named("x".to_string(), "0".to_string()),
            FilterArg::Named("y".to_string(), "0".to_string()),
        ],
        outputs: vec![COMPOSITE_LABEL.to_string()],
    };

    FilterGraph {
        stages: vec![shift, overlay],
        output: COMPOSITE_LABEL.to_string(),
    }
}

// Commas and colons separate filters and arguments, so values holding them are quoted.
fn escape_value(value: &str) -> String {
    if value.contains([',', ':', ';', '[', ']']) {
        format!("'{value}'")
    } else {
        value.to_string()
    }
}
