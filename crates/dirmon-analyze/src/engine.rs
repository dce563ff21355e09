//! Entry points that walk a root and run an analysis over it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span};

use dirmon_core::{ScanConfig, ScanError, ScanWarning, WalkStats};
use dirmon_scan::{Walk, Walker};

use crate::cleanup::{CleanupClassifier, CleanupConfig, CleanupReport};
use crate::duplicates::{DuplicateConfig, DuplicateFinder, DuplicateReport};
use crate::hasher::ContentHasher;
use crate::usage::{UsageAggregator, UsageConfig, UsageReport};

/// Every analysis over a single walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullReport {
    /// Canonical root path.
    pub root_path: PathBuf,
    /// Walk statistics.
    pub stats: WalkStats,
    /// Time spent walking.
    pub scan_duration: Duration,
    /// Usage breakdown.
    pub usage: UsageReport,
    /// Cleanup advice.
    pub cleanup: CleanupReport,
    /// Duplicate groups; its warnings only cover hashing.
    pub duplicates: DuplicateReport,
    /// Entries skipped during the walk.
    pub warnings: Vec<ScanWarning>,
}

/// Runs analyses with shared walk settings and cancellation.
///
/// The root in the scan config is replaced by the root passed to each call.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    scan: ScanConfig,
    duplicates: DuplicateConfig,
    usage: UsageConfig,
    cleanup: CleanupConfig,
    cancel: CancellationToken,
}

impl Analyzer {
    /// Create an analyzer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these walk settings.
    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan = config;
        self
    }

    /// Use this duplicate detection config.
    pub fn with_duplicate_config(mut self, config: DuplicateConfig) -> Self {
        self.duplicates = config;
        self
    }

    /// Use this usage config.
    pub fn with_usage_config(mut self, config: UsageConfig) -> Self {
        self.usage = config;
        self
    }

    /// Use this cleanup config.
    pub fn with_cleanup_config(mut self, config: CleanupConfig) -> Self {
        self.cleanup = config;
        self
    }

    /// Abort walking and hashing once `cancel` is triggered.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that interrupts this analyzer's operations.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Find groups of byte-identical files under `root`.
    pub fn find_duplicates(&self, root: impl AsRef<Path>) -> Result<DuplicateReport, ScanError> {
        let _span = info_span!("find_duplicates", root = %root.as_ref().display()).entered();
        let finder = self.duplicate_finder()?;

        let mut walk = self.walk(root.as_ref())?;
        let buckets = finder.bucket(walk.by_ref());
        let summary = walk.finish()?;

        let mut report = finder.find_in_buckets(buckets)?;
        prepend_warnings(&mut report.warnings, summary.warnings);

        debug!(
            groups = report.group_count,
            wasted = report.total_wasted_space,
            "duplicate detection complete"
        );
        Ok(report)
    }

    /// Break down space usage under `root` by file type and directory.
    pub fn analyze_usage(&self, root: impl AsRef<Path>) -> Result<UsageReport, ScanError> {
        let _span = info_span!("analyze_usage", root = %root.as_ref().display()).entered();

        let mut walk = self.walk(root.as_ref())?;
        let mut report = UsageAggregator::with_config(self.usage.clone()).aggregate(walk.by_ref());
        report.warnings = walk.finish()?.warnings;

        debug!(
            files = report.total_files,
            bytes = report.total_bytes,
            "usage analysis complete"
        );
        Ok(report)
    }

    /// Suggest files under `root` for cleanup.
    pub fn advise_cleanup(&self, root: impl AsRef<Path>) -> Result<CleanupReport, ScanError> {
        let _span = info_span!("advise_cleanup", root = %root.as_ref().display()).entered();

        let mut walk = self.walk(root.as_ref())?;
        let mut report = CleanupClassifier::with_config(self.cleanup.clone()).classify(walk.by_ref());
        report.warnings = walk.finish()?.warnings;

        debug!(
            candidates = report.candidates.len(),
            savings = report.total_savings,
            "cleanup advice complete"
        );
        Ok(report)
    }

    /// Walk `root` once and run every analysis over the same records.
    pub fn full_report(&self, root: impl AsRef<Path>) -> Result<FullReport, ScanError> {
        let _span = info_span!("full_report", root = %root.as_ref().display()).entered();
        let finder = self.duplicate_finder()?;

        let snapshot = Walker::with_cancel(self.cancel.clone()).snapshot(&self.scan.with_root(root.as_ref()))?;

        let (usage, cleanup) = rayon::join(
            || UsageAggregator::with_config(self.usage.clone()).aggregate(&snapshot.records),
            || CleanupClassifier::with_config(self.cleanup.clone()).classify(&snapshot.records),
        );
        let duplicates = finder.find_in_records(&snapshot.records)?;

        Ok(FullReport {
            root_path: snapshot.root_path,
            stats: snapshot.stats,
            scan_duration: snapshot.scan_duration,
            usage,
            cleanup,
            duplicates,
            warnings: snapshot.warnings,
        })
    }

    fn walk(&self, root: &Path) -> Result<Walk, ScanError> {
        Walker::with_cancel(self.cancel.clone()).walk(&self.scan.with_root(root))
    }

    fn duplicate_finder(&self) -> Result<DuplicateFinder, ScanError> {
        let hasher = ContentHasher::with_threads(self.scan.hash_threads)?.with_cancel(self.cancel.clone());
        Ok(DuplicateFinder::with_config(self.duplicates.clone())?.with_hasher(hasher))
    }
}

fn prepend_warnings(warnings: &mut Vec<ScanWarning>, mut first: Vec<ScanWarning>) {
    first.append(warnings);
    *warnings = first;
}

/// Find duplicate files under `root` with default settings.
pub fn find_duplicates(root: impl AsRef<Path>) -> Result<DuplicateReport, ScanError> {
    Analyzer::new().find_duplicates(root)
}

/// Break down space usage under `root` with default settings.
pub fn analyze_usage(root: impl AsRef<Path>) -> Result<UsageReport, ScanError> {
    Analyzer::new().analyze_usage(root)
}

/// Suggest cleanup candidates under `root` using the given thresholds.
pub fn advise_cleanup(
    root: impl AsRef<Path>,
    age_threshold_days: u64,
    size_threshold_mb: u64,
) -> Result<CleanupReport, ScanError> {
    Analyzer::new()
        .with_cleanup_config(CleanupConfig::with_thresholds(age_threshold_days, size_threshold_mb))
        .advise_cleanup(root)
}
