//! Directory walking for dirmon.
//!
//! This crate turns a root path into a lazy stream of [`FileRecord`]s
//! using jwalk for traversal.
//!
//! # Overview
//!
//! - **Sorted parallel traversal** via jwalk/rayon, so discovery order is
//!   the same on every run
//! - **Per-entry fault tolerance**: unreadable entries become warnings
//! - **Cancellation** through a `CancellationToken`
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use dirmon_scan::{ScanConfig, Walker};
//!
//! let config = ScanConfig::new("/path/to/scan");
//! let mut walk = Walker::new().walk(&config).unwrap();
//!
//! let mut bytes = 0;
//! for record in walk.by_ref() {
//!     bytes += record.size;
//! }
//! let summary = walk.finish().unwrap();
//!
//! println!("{} bytes in {} files", bytes, summary.stats.total_files);
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use dirmon_scan::{ScanConfig, Walker};
//!
//! let walker = Walker::new();
//! let mut progress_rx = walker.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         eprintln!("Walked {} files", progress.files);
//!     }
//! });
//!
//! let snapshot = walker.snapshot(&ScanConfig::new(".")).unwrap();
//! ```

mod progress;
mod walker;

pub use progress::ScanProgress;
pub use walker::{Walk, WalkSummary, Walker};

// Re-export core types for convenience
pub use dirmon_core::{
    FileRecord, ScanConfig, ScanError, ScanWarning, Snapshot, WalkStats, WarningKind,
};
