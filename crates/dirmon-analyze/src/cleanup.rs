//! Rule-based cleanup advice.
//!
//! Every file is checked against a fixed, ordered rule set and the first
//! matching rule supplies the reason it is suggested for removal:
//!
//! 1. Temporary file names (`*.tmp`, `~*`, anything with `cache`, ...)
//! 2. Log file names (`*.log`, `*.log.gz`, anything with `debug`, ...)
//! 3. Stale files not modified within the age threshold
//! 4. Files larger than the size threshold
//!
//! Nothing here touches the filesystem; classification only looks at the
//! records it is given.

use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use dirmon_core::{FileRecord, ScanWarning};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const BYTES_PER_MB: u64 = 1024 * 1024;

const TEMP_SUFFIXES: &[&str] = &[".tmp", ".temp", ".bak"];
const TEMP_PREFIXES: &[&str] = &["~", "temp_"];
const LOG_SUFFIXES: &[&str] = &[".log", ".log.gz", ".logs"];

/// Configuration for cleanup advice.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct CleanupConfig {
    /// Files untouched for longer than this many days are stale.
    #[builder(default = "90")]
    pub age_threshold_days: u64,

    /// Files larger than this many MiB are oversize.
    #[builder(default = "100")]
    pub size_threshold_mb: u64,

    /// Reference time for age calculations (default: now).
    #[builder(default = "SystemTime::now()")]
    pub reference_time: SystemTime,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            age_threshold_days: 90,
            size_threshold_mb: 100,
            reference_time: SystemTime::now(),
        }
    }
}

impl CleanupConfig {
    /// Create a new config builder.
    pub fn builder() -> CleanupConfigBuilder {
        CleanupConfigBuilder::default()
    }

    /// Create a config with the given thresholds, measured from now.
    pub fn with_thresholds(age_threshold_days: u64, size_threshold_mb: u64) -> Self {
        Self {
            age_threshold_days,
            size_threshold_mb,
            reference_time: SystemTime::now(),
        }
    }

    /// Age threshold as a duration.
    pub fn age_threshold(&self) -> Duration {
        Duration::from_secs(self.age_threshold_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Size threshold in bytes.
    pub fn size_threshold_bytes(&self) -> u64 {
        self.size_threshold_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Cleanup rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum CleanupRule {
    #[strum(to_string = "temporary")]
    Temporary,
    #[strum(to_string = "log")]
    Log,
    #[strum(to_string = "stale")]
    Stale,
    #[strum(to_string = "oversize")]
    Oversize,
}

impl CleanupRule {
    /// Check a single record against this rule.
    ///
    /// `name` is the record's lower-cased file name.
    pub fn evaluate(self, record: &FileRecord, name: &str, config: &CleanupConfig) -> Option<CleanupReason> {
        match self {
            Self::Temporary => is_temporary_name(name).then_some(CleanupReason::Temporary),
            Self::Log => is_log_name(name).then_some(CleanupReason::Log),
            Self::Stale => {
                let age = record.age_at(config.reference_time);
                (record.size > 0 && age > config.age_threshold()).then(|| CleanupReason::Stale {
                    days: age.as_secs() / SECONDS_PER_DAY,
                })
            }
            Self::Oversize => (record.size > config.size_threshold_bytes())
                .then_some(CleanupReason::Oversize { size: record.size }),
        }
    }
}

/// Why a file is suggested for cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum CleanupReason {
    Temporary,
    Log,
    /// Whole days since last modification.
    Stale { days: u64 },
    /// File size in bytes.
    Oversize { size: u64 },
}

impl CleanupReason {
    /// The rule that produced this reason.
    pub fn rule(&self) -> CleanupRule {
        match self {
            Self::Temporary => CleanupRule::Temporary,
            Self::Log => CleanupRule::Log,
            Self::Stale { .. } => CleanupRule::Stale,
            Self::Oversize { .. } => CleanupRule::Oversize,
        }
    }
}

impl fmt::Display for CleanupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary => f.write_str("Temporary file"),
            Self::Log => f.write_str("Log file"),
            Self::Stale { days } => write!(f, "Not modified for {days} days"),
            Self::Oversize { size } => {
                write!(f, "Large file ({})", humansize::format_size(*size, humansize::BINARY))
            }
        }
    }
}

/// A file suggested for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupCandidate {
    /// Absolute path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// First matching rule.
    pub reason: CleanupReason,
}

/// Results from cleanup analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Candidates in discovery order.
    pub candidates: Vec<CleanupCandidate>,
    /// Sum of candidate sizes; each file counted once.
    pub total_savings: u64,
    /// Number of files examined.
    pub files_examined: u64,
    /// Entries skipped during the walk.
    pub warnings: Vec<ScanWarning>,
}

impl CleanupReport {
    /// Check if anything was suggested.
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Number of candidates flagged by `rule`.
    pub fn count(&self, rule: CleanupRule) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.reason.rule() == rule)
            .count()
    }

    /// Add one more classified candidate.
    pub fn push(&mut self, candidate: CleanupCandidate) {
        self.total_savings += candidate.size;
        self.candidates.push(candidate);
    }
}

/// Applies the cleanup rules to records.
#[derive(Debug, Clone, Default)]
pub struct CleanupClassifier {
    config: CleanupConfig,
}

impl CleanupClassifier {
    /// Create a classifier with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with custom config.
    pub fn with_config(config: CleanupConfig) -> Self {
        Self { config }
    }

    /// Get the config.
    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Classify one record; `None` if it is a directory or matches no rule.
    pub fn classify_record(&self, record: &FileRecord) -> Option<CleanupCandidate> {
        if record.is_dir {
            return None;
        }

        let name = record.file_name().to_lowercase();
        let reason = CleanupRule::iter().find_map(|rule| rule.evaluate(record, &name, &self.config))?;

        Some(CleanupCandidate {
            path: record.path.clone(),
            size: record.size,
            modified: record.modified,
            reason,
        })
    }

    /// Classify all records.
    pub fn classify<I>(&self, records: I) -> CleanupReport
    where
        I: IntoIterator,
        I::Item: Borrow<FileRecord>,
    {
        let mut report = CleanupReport::default();
        for record in records {
            let record = record.borrow();
            if record.is_dir {
                continue;
            }
            report.files_examined += 1;
            if let Some(candidate) = self.classify_record(record) {
                report.push(candidate);
            }
        }
        report
    }
}

/// Whether a lower-cased file name looks like a temporary file.
pub fn is_temporary_name(name: &str) -> bool {
    TEMP_SUFFIXES.iter().any(|s| name.ends_with(s))
        || TEMP_PREFIXES.iter().any(|p| name.starts_with(p))
        || name.contains("cache")
}

/// Whether a lower-cased file name looks like a log file.
pub fn is_log_name(name: &str) -> bool {
    LOG_SUFFIXES.iter().any(|s| name.ends_with(s)) || name.contains("debug")
}
