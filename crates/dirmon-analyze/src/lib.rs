//! Analysis algorithms for dirmon.
//!
//! This crate turns walked records into reports:
//!
//! - **Duplicate detection** - Find byte-identical files using BLAKE3 hashing
//! - **Usage analysis** - Bytes per file type and per parent directory
//! - **Cleanup advice** - Rule-based suggestions of files worth removing
//!
//! # Duplicate Detection
//!
//! Uses a two-phase algorithm:
//!
//! 1. Group files by exact size (no I/O)
//! 2. Stream every file in a bucket of two or more through BLAKE3
//!
//! ```rust,no_run
//! use dirmon_analyze::find_duplicates;
//!
//! let report = find_duplicates("/path/to/scan").unwrap();
//!
//! println!("Found {} duplicate groups", report.group_count);
//! println!("Wasted space: {} bytes", report.total_wasted_space);
//! ```
//!
//! # Cleanup Advice
//!
//! ```rust,no_run
//! use dirmon_analyze::advise_cleanup;
//!
//! let report = advise_cleanup("/path/to/scan", 90, 100).unwrap();
//!
//! for candidate in &report.candidates {
//!     println!("{}: {}", candidate.path.display(), candidate.reason);
//! }
//! ```
//!
//! # Custom Settings
//!
//! [`Analyzer`] carries walk settings, per-analysis configs and a
//! cancellation token:
//!
//! ```rust,no_run
//! use dirmon_analyze::{Analyzer, UsageConfig};
//! use dirmon_scan::ScanConfig;
//!
//! let mut scan = ScanConfig::new(".");
//! scan.ignore_patterns = vec!["node_modules".to_string()];
//!
//! let analyzer = Analyzer::new()
//!     .with_scan_config(scan)
//!     .with_usage_config(UsageConfig { top_dirs: 5 });
//!
//! let usage = analyzer.analyze_usage("/path/to/scan").unwrap();
//! for stat in &usage.by_type {
//!     println!("{}: {:.1}%", stat.extension, stat.percent_of(usage.total_bytes));
//! }
//! ```

pub mod bucket;
pub mod cleanup;
mod duplicates;
mod engine;
pub mod hasher;
mod usage;

pub use bucket::{SizeBucket, SizeBuckets};
pub use cleanup::{
    CleanupCandidate, CleanupClassifier, CleanupConfig, CleanupReason, CleanupReport, CleanupRule,
    is_log_name, is_temporary_name,
};
pub use duplicates::{DuplicateConfig, DuplicateFinder, DuplicateGroup, DuplicateReport, group_by_digest};
pub use engine::{Analyzer, FullReport, advise_cleanup, analyze_usage, find_duplicates};
pub use hasher::{ContentHasher, HashMode, HashOutcome, hash_file, partial_hash};
pub use usage::{DirStat, TypeStat, UsageAggregator, UsageConfig, UsageReport};

// Re-export core types
pub use dirmon_core::{ContentHash, FileRecord, ScanError, ScanWarning};
