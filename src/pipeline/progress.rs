// file: src/pipeline/progress.rs
// description: progress display and counters for a mirror run
// reference: uses indicatif for progress bars and tracks per-pair outcomes

use crate::models::Outcome;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub mirrored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_secs: u64,
}

impl RunStats {
    pub fn total(&self) -> usize {
        self.mirrored + self.skipped + self.failed
    }

    /// Share of attempted pairs (skips excluded) that mirrored.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.mirrored + self.failed;
        if attempted == 0 {
            return 0.0;
        }
        (self.mirrored as f64 / attempted as f64) * 100.0
    }
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    mirrored: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_pairs: usize, visible: bool) -> Self {
        let multi_progress = if visible {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let main_bar = create_progress_bar(&multi_progress, total_pairs as u64);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            mirrored: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn hidden(total_pairs: usize) -> Self {
        Self::new(total_pairs, false)
    }

    pub fn record(&self, repository: &str, destination: &str, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Mirrored { .. } => &self.mirrored,
            Outcome::Skipped { .. } => &self.skipped,
            Outcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.main_bar.set_message(format!("{} → {}", repository, destination));
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Mirror run complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> RunStats {
        RunStats {
            mirrored: self.mirrored.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            duration_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn update_detail_bar(&self) {
        let message = format!(
            "Mirrored: {} | Skipped: {} | Failed: {}",
            self.mirrored.load(Ordering::SeqCst),
            self.skipped.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst)
        );
        self.detail_bar.set_message(message);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("█▓▒░"));
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
        bar.set_style(style);
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkipReason;

    #[test]
    fn test_run_stats_success_rate() {
        let stats = RunStats {
            mirrored: 3,
            skipped: 5,
            failed: 1,
            duration_secs: 2,
        };
        assert_eq!(stats.total(), 9);
        assert!((stats.success_rate() - 75.0).abs() < 0.01);
        assert_eq!(RunStats::default().success_rate(), 0.0);
    }

    #[test]
    fn test_tracker_counts_outcomes() {
        let tracker = ProgressTracker::hidden(3);
        tracker.record("a", "X", &Outcome::Mirrored { sha: None });
        tracker.record(
            "a",
            "Y",
            &Outcome::Skipped {
                reason: SkipReason::MissingCredential,
            },
        );
        tracker.record("b", "X", &Outcome::Failed { error: "x".into() });

        let stats = tracker.get_stats();
        assert_eq!((stats.mirrored, stats.skipped, stats.failed), (1, 1, 1));
    }
}
