//! Progress reporting for long runs
//!
//! A spinner on stderr showing the running count and throughput. Stdout is
//! left alone so it can carry exported records.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Counts processed documents and optionally draws a spinner
pub struct ProgressTracker {
    processed: AtomicU64,
    start_time: Instant,
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a tracker
    ///
    /// # Arguments
    /// * `label` - Noun shown after the count ("documents", "records")
    /// * `enable_bar` - Whether to draw the spinner
    pub fn new(label: &str, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            let template = format!("{{spinner:.green}} {{pos}} {label} {{msg}}");
            if let Ok(style) = ProgressStyle::default_spinner().template(&template) {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });

        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// A tracker that only counts
    pub fn hidden() -> Self {
        Self::new("", false)
    }

    /// Add `count` processed documents
    pub fn advance(&self, count: u64) {
        let total = self.processed.fetch_add(count, Ordering::Relaxed) + count;

        if let Some(ref bar) = self.bar {
            bar.set_position(total);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = total as f64 / elapsed;
                bar.set_message(format!("({:.0}/sec)", speed));
            }
        }
    }

    /// Documents processed so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Time since the tracker was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let tracker = ProgressTracker::hidden();
        tracker.advance(500);
        tracker.advance(20);
        assert_eq!(tracker.processed(), 520);
        tracker.finish();
    }

    #[test]
    fn test_hidden_tracker_draws_nothing() {
        let tracker = ProgressTracker::new("documents", false);
        assert!(tracker.bar.is_none());
    }
}
