//! Walk progress reporting.

use std::time::{Duration, Instant};

/// Counters broadcast while a walk runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanProgress {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
    /// Entries that produced a warning.
    pub skipped: u64,
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Files walked per second; zero before any time has passed.
    pub fn files_per_sec(&self) -> f64 {
        match self.elapsed.as_secs_f64() {
            secs if secs > 0.0 => self.files as f64 / secs,
            _ => 0.0,
        }
    }
}

/// Running counters behind [`ScanProgress`] snapshots.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    started: Instant,
    counts: ScanProgress,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counts: ScanProgress::default(),
        }
    }

    /// Count a file; returns how many files came before it.
    pub fn record_file(&mut self, size: u64) -> u64 {
        let before = self.counts.files;
        self.counts.files += 1;
        self.counts.bytes += size;
        before
    }

    pub fn record_dir(&mut self) {
        self.counts.dirs += 1;
    }

    pub fn record_skip(&mut self) {
        self.counts.skipped += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            elapsed: self.elapsed(),
            ..self.counts.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.record_file(100), 0);
        assert_eq!(tracker.record_file(50), 1);
        tracker.record_dir();
        tracker.record_skip();

        let progress = tracker.snapshot();
        assert_eq!(progress.files, 2);
        assert_eq!(progress.dirs, 1);
        assert_eq!(progress.bytes, 150);
        assert_eq!(progress.skipped, 1);
    }

    #[test]
    fn test_rate() {
        assert_eq!(ScanProgress::default().files_per_sec(), 0.0);

        let progress = ScanProgress {
            files: 500,
            elapsed: Duration::from_secs(2),
            ..ScanProgress::default()
        };
        assert_eq!(progress.files_per_sec(), 250.0);
    }
}
