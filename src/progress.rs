//! Terminal progress for assignment batches.

use assignment::{PlannedAssignment, ProgressCallback, RemoteError};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over the pairs of a batch, with a running failure count
pub struct BatchProgress {
    bar: ProgressBar,
    hidden: bool,
    failed: usize,
}

impl BatchProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            hidden: quiet,
            failed: 0,
        }
    }
}

impl ProgressCallback for BatchProgress {
    fn on_batch_start(&mut self, total: usize) {
        if self.hidden {
            return;
        }
        self.bar = ProgressBar::new(total as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {prefix} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
    }

    fn on_pair_start(&mut self, _index: usize, assignment: &PlannedAssignment) {
        self.bar.set_message(assignment.label());
    }

    // Failures are logged by the executor and listed in the summary
    fn on_pair_complete(
        &mut self,
        _index: usize,
        _assignment: &PlannedAssignment,
        outcome: Result<(), &RemoteError>,
    ) {
        if outcome.is_err() {
            self.failed += 1;
            self.bar.set_prefix(format!("{} failed", self.failed).red().to_string());
        }
        self.bar.inc(1);
    }

    fn on_batch_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}
