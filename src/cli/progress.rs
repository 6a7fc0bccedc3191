//! Terminal busy indicator for the CLI

use crate::{
    services::{ProcessingStage, ProgressReporter, ProgressUpdate},
    types::ProcessingTimings,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner that ticks while the model runs and shows stage percentages
/// otherwise
pub(crate) struct IndicatifProgressReporter {
    bar: ProgressBar,
}

impl IndicatifProgressReporter {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::new(100);
        let template = "{spinner:.green} [{elapsed_precise}] {pos:>3}% {msg}";
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            bar.set_style(style);
        }
        Self { bar }
    }

    pub(crate) fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_position(u64::from(update.progress));
        self.bar.set_message(update.description);
        if update.stage.is_indeterminate() {
            self.bar.enable_steady_tick(Duration::from_millis(120));
        } else {
            self.bar.disable_steady_tick();
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        self.bar.disable_steady_tick();
        self.bar.set_position(u64::from(ProcessingStage::Completed.progress_percentage()));
        self.bar.finish_with_message(format!(
            "Done in {:.2}s (model {:.2}s)",
            timings.total_ms as f64 / 1000.0,
            timings.inference_ms as f64 / 1000.0
        ));
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar.disable_steady_tick();
        let stage = stage.description().to_lowercase();
        self.bar
            .abandon_with_message(format!("Failed while {}: {}", stage, error));
    }
}
