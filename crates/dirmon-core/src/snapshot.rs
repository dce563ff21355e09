//! Materialized walk results and running statistics.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::ScanWarning;
use crate::record::FileRecord;

/// Summary statistics accumulated while walking a tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkStats {
    /// Total size in bytes of all files.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories (the root excluded).
    pub total_dirs: u64,
    /// Symbolic links seen but not followed.
    pub total_symlinks: u64,
    /// Sockets, devices and other special entries skipped.
    pub total_other: u64,
    /// Maximum depth reached.
    pub max_depth: usize,
    /// Largest file (path, size).
    pub largest_file: Option<(PathBuf, u64)>,
    /// Oldest file (path, time).
    pub oldest_file: Option<(PathBuf, SystemTime)>,
    /// Newest file (path, time).
    pub newest_file: Option<(PathBuf, SystemTime)>,
}

impl WalkStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a record.
    pub fn record(&mut self, record: &FileRecord) {
        self.max_depth = self.max_depth.max(record.depth);

        if record.is_dir {
            self.total_dirs += 1;
            return;
        }

        self.total_files += 1;
        self.total_size += record.size;

        if self.largest_file.as_ref().is_none_or(|(_, s)| record.size > *s) {
            self.largest_file = Some((record.path.clone(), record.size));
        }

        if self
            .oldest_file
            .as_ref()
            .is_none_or(|(_, t)| record.modified < *t)
        {
            self.oldest_file = Some((record.path.clone(), record.modified));
        }

        if self
            .newest_file
            .as_ref()
            .is_none_or(|(_, t)| record.modified > *t)
        {
            self.newest_file = Some((record.path.clone(), record.modified));
        }
    }

    /// Record a symlink that was not followed.
    pub fn record_symlink(&mut self) {
        self.total_symlinks += 1;
    }

    /// Record a special file that was skipped.
    pub fn record_other(&mut self) {
        self.total_other += 1;
    }
}

/// A complete walk of one root, held in memory so several consumers can
/// share it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Canonical root path that was walked.
    pub root_path: PathBuf,

    /// Records in discovery order.
    pub records: Vec<FileRecord>,

    /// When the walk finished.
    pub scanned_at: SystemTime,

    /// Duration of the walk.
    pub scan_duration: Duration,

    /// Summary statistics.
    pub stats: WalkStats,

    /// Entries skipped during the walk.
    pub warnings: Vec<ScanWarning>,
}

impl Snapshot {
    /// Create a new snapshot.
    pub fn new(
        root_path: PathBuf,
        records: Vec<FileRecord>,
        stats: WalkStats,
        scan_duration: Duration,
        warnings: Vec<ScanWarning>,
    ) -> Self {
        Self {
            root_path,
            records,
            scanned_at: SystemTime::now(),
            scan_duration,
            stats,
            warnings,
        }
    }

    /// Iterate over non-directory records.
    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter().filter(|r| !r.is_dir)
    }

    /// Total size of all files.
    pub fn total_size(&self) -> u64 {
        self.stats.total_size
    }

    /// Check if any entries were skipped.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_stats_default() {
        let stats = WalkStats::default();
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_dirs, 0);
        assert!(stats.largest_file.is_none());
    }

    #[test]
    fn test_walk_stats_record() {
        let mut stats = WalkStats::new();
        let now = SystemTime::now();
        let old = now - Duration::from_secs(86_400);

        stats.record(&FileRecord::file("/t/a.txt", 1024, now).with_depth(2));
        stats.record(&FileRecord::file("/t/b.txt", 10, old));
        stats.record(&FileRecord::directory("/t/d", now));

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_dirs, 1);
        assert_eq!(stats.total_size, 1034);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.largest_file, Some((PathBuf::from("/t/a.txt"), 1024)));
        assert_eq!(stats.oldest_file, Some((PathBuf::from("/t/b.txt"), old)));
        assert_eq!(stats.newest_file, Some((PathBuf::from("/t/a.txt"), now)));
    }

    #[test]
    fn test_snapshot_files_skips_directories() {
        let now = SystemTime::now();
        let snapshot = Snapshot::new(
            PathBuf::from("/t"),
            vec![
                FileRecord::directory("/t/d", now),
                FileRecord::file("/t/d/a", 3, now).with_depth(2),
            ],
            WalkStats::default(),
            Duration::ZERO,
            Vec::new(),
        );

        assert_eq!(snapshot.files().count(), 1);
        assert!(!snapshot.has_warnings());
    }
}
