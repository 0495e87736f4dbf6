//! Progress reporting: percentage mapping and the terminal display.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

/// Receives the progress of a running job.
pub trait ProgressDisplay: Send {
    /// Begin showing progress out of `max`, starting at `initial`.
    fn start(&mut self, max: f64, initial: f64);

    fn update(&mut self, value: f64);

    fn stop(&mut self);
}

/// Builds a fresh display for each job that is not silent.
pub type DisplayFactory = Arc<dyn Fn() -> Box<dyn ProgressDisplay> + Send + Sync>;

/// Map an engine-reported percentage to a display value.
///
/// The result is within `[0, 100]` with at most two decimals; a missing or
/// non-finite percentage maps to `0`.
pub fn progress_percent(percent: Option<f64>) -> f64 {
    match percent {
        Some(p) if p.is_finite() => (p.clamp(0.0, 100.0) * 100.0).round() / 100.0,
        _ => 0.0,
    }
}

// Positions are tracked in hundredths so two decimals survive indicatif's u64 counter.
const SCALE: f64 = 100.0;

/// Single-line terminal progress bar on stderr.
pub struct TerminalProgress {
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self { bar: None }
    }

    /// A factory producing terminal bars, for [`crate::Encoder::with_display_factory`].
    pub fn factory() -> DisplayFactory {
        Arc::new(|| Box::new(TerminalProgress::new()))
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("Processing | {bar:40} | {msg}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("\u{2588}\u{2591}")
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressDisplay for TerminalProgress {
    fn start(&mut self, max: f64, initial: f64) {
        let bar = ProgressBar::new((max.max(0.0) * SCALE).round() as u64);
        bar.set_style(Self::style());
        bar.set_position((initial.max(0.0) * SCALE).round() as u64);
        bar.set_message(format!("{initial}"));
        self.bar = Some(bar);
    }

    fn update(&mut self, value: f64) {
        if let Some(bar) = &self.bar {
            bar.set_position((value.max(0.0) * SCALE).round() as u64);
            bar.set_message(format!("{value}"));
        }
    }

    fn stop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}
