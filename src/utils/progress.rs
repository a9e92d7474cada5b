// sizefit/src/utils/progress.rs
use crate::core::{BatchSummary, ResizeResult};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress sink for batch runs. Implementations must tolerate calls from
/// several worker threads.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, _total: usize) {}

    fn advance(&self, _name: &str, _result: &ResizeResult) {}

    fn finish(&self, _summary: &BatchSummary) {}
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Terminal progress bar.
pub struct BarProgress {
    label: String,
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bar: ProgressBar::new(0),
        }
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        self.bar.set_style(style);
        self.bar.set_prefix(self.label.clone());
    }

    fn advance(&self, name: &str, _result: &ResizeResult) {
        self.bar.set_message(name.to_string());
        self.bar.inc(1);
    }

    fn finish(&self, summary: &BatchSummary) {
        self.bar.finish_with_message(format!(
            "{} of {} images on target",
            summary.succeeded, summary.processed
        ));
    }
}
