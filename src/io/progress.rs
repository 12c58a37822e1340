//! Terminal progress for graph construction and order-by-order expansion

use crate::algorithm::expansion::{ExpansionObserver, IterationResult};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::LazyLock;
use std::time::Duration;

/// Spinner refresh interval while an order is being extracted
const TICK_INTERVAL: Duration = Duration::from_millis(120);

static ORDER_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {prefix:>9} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

static DONE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("✓ {prefix:>9} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

/// One line per discovery stage, kept after completion
pub struct ProgressManager {
    multi_progress: MultiProgress,
    current: Option<ProgressBar>,
    /// (`order`, `accepted`, `evaluated`) for every finished order
    completed: Vec<(usize, usize, usize)>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Create a manager drawing to stderr
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Create a manager that records progress without drawing
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi_progress: MultiProgress::with_draw_target(target),
            current: None,
            completed: Vec::new(),
        }
    }

    /// Finished orders as (`order`, `accepted`, `evaluated`)
    pub fn completed(&self) -> &[(usize, usize, usize)] {
        &self.completed
    }

    /// Stop any running spinner and clear transient output
    pub fn finish(&mut self) {
        if let Some(bar) = self.current.take() {
            bar.finish_and_clear();
        }
        let _ = self.multi_progress.clear();
    }

    fn start_line(&mut self, prefix: String, message: String) {
        if let Some(previous) = self.current.take() {
            previous.finish();
        }
        let bar = self.multi_progress.add(ProgressBar::new_spinner());
        bar.set_style(ORDER_STYLE.clone());
        bar.set_prefix(prefix);
        bar.set_message(message);
        bar.enable_steady_tick(TICK_INTERVAL);
        self.current = Some(bar);
    }

    fn finish_line(&mut self, message: String) {
        if let Some(bar) = self.current.take() {
            bar.set_style(DONE_STYLE.clone());
            bar.finish_with_message(message);
        }
    }
}

impl ExpansionObserver for ProgressManager {
    fn graphs_built(&mut self, built: usize, skipped: usize) {
        self.start_line("graphs".to_string(), String::new());
        let message = if skipped > 0 {
            format!("{built} samples ({skipped} skipped)")
        } else {
            format!("{built} samples")
        };
        self.finish_line(message);
    }

    fn order_started(&mut self, order: usize, frontier: usize) {
        let message = if order == 2 {
            format!("seeding from {frontier} significant pairs")
        } else {
            format!("extending {frontier} structures")
        };
        self.start_line(format!("order {order}"), message);
    }

    fn order_finished(&mut self, result: &IterationResult) {
        self.completed
            .push((result.order, result.len(), result.candidates_evaluated));
        self.finish_line(format!(
            "{} of {} candidates accepted",
            result.len(),
            result.candidates_evaluated
        ));
    }
}
