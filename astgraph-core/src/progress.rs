//! Progress reporting for corpus runs.
//!
//! The pipeline advances the reporter once per source unit. The CLI uses
//! [`IndicatifReporter`]; library callers pass [`NoopReporter`] or their own.

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Sink for pipeline progress. Called from rayon workers, hence `Sync`.
pub trait ProgressReporter: Send + Sync {
    /// Begin a task with an optional total count.
    fn start(&self, task: &str, total: Option<u64>);

    fn advance(&self, amount: u64);

    fn finish(&self);
}

#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn start(&self, _task: &str, _total: Option<u64>) {}
    fn advance(&self, _amount: u64) {}
    fn finish(&self) {}
}

/// Reporter backed by an `indicatif` bar on stderr.
#[derive(Debug)]
pub struct IndicatifReporter {
    bar: ProgressBar,
    completed: AtomicU64,
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatifReporter {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A reporter that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(None, target),
            completed: AtomicU64::new(0),
        }
    }

    /// Units advanced since the last `start`.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl ProgressReporter for IndicatifReporter {
    fn start(&self, task: &str, total: Option<u64>) {
        self.completed.store(0, Ordering::Relaxed);
        let style = if let Some(total) = total {
            self.bar.set_length(total);
            ProgressStyle::with_template(
                "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} units ({eta})",
            )
            .map(|s| s.progress_chars("=> "))
        } else {
            self.bar.unset_length();
            ProgressStyle::with_template("{spinner:.green} {msg} {pos} units")
        };
        self.bar
            .set_style(style.unwrap_or_else(|_| ProgressStyle::default_bar()));
        self.bar.set_message(task.to_string());
        self.bar.reset();
    }

    fn advance(&self, amount: u64) {
        self.completed.fetch_add(amount, Ordering::Relaxed);
        self.bar.inc(amount);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
