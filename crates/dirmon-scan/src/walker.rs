//! JWalk-based directory walker.

use std::path::{Path, PathBuf};
use std::io;
use std::time::{Duration, SystemTime};

use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{DirEntryIter, Parallelism, WalkDir};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dirmon_core::{
    FileRecord, ScanConfig, ScanError, ScanWarning, Snapshot, WalkStats, WarningKind,
};

use crate::progress::{ProgressTracker, ScanProgress};

/// Files between two progress broadcasts.
const PROGRESS_INTERVAL: u64 = 1000;

/// Directory walker built on jwalk's parallel, sorted traversal.
pub struct Walker {
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: CancellationToken,
}

impl Walker {
    /// Create a new walker.
    pub fn new() -> Self {
        Self::with_cancel(CancellationToken::new())
    }

    /// Create a walker that stops as soon as `cancel` is triggered.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            cancel,
        }
    }

    /// Subscribe to walk progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Token that interrupts walks started by this walker.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Start walking `config.root`.
    ///
    /// Fails immediately if the root does not exist, is not a directory or
    /// cannot be listed. The returned [`Walk`] yields every descendant once;
    /// the root itself is not yielded.
    pub fn walk(&self, config: &ScanConfig) -> Result<Walk, ScanError> {
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        // jwalk reports an unreadable root as an ordinary entry error, which
        // would turn a fatal condition into a warning.
        std::fs::read_dir(&root_path).map_err(|e| ScanError::io(&root_path, e))?;

        let ignore = build_ignore_set(&config.ignore_patterns)?;

        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let mut walker = WalkDir::new(&root_path)
            .parallelism(parallelism)
            .sort(true)
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks)
            .min_depth(1)
            .max_depth(config.max_depth.unwrap_or(usize::MAX));

        if let Some(ignore) = ignore {
            walker = walker.process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) => !ignore.is_match(entry.file_name()),
                    Err(_) => true,
                });
            });
        }

        debug!(root = %root_path.display(), "starting walk");

        Ok(Walk {
            entries: walker.into_iter(),
            root_path,
            tracker: ProgressTracker::new(),
            stats: WalkStats::new(),
            warnings: Vec::new(),
            progress_tx: self.progress_tx.clone(),
            cancel: self.cancel.clone(),
            interrupted: false,
            exhausted: false,
        })
    }

    /// Walk the whole tree and keep every record in memory.
    pub fn snapshot(&self, config: &ScanConfig) -> Result<Snapshot, ScanError> {
        let mut walk = self.walk(config)?;
        let records: Vec<FileRecord> = walk.by_ref().collect();
        let summary = walk.finish()?;

        Ok(Snapshot::new(
            summary.root_path,
            records,
            summary.stats,
            summary.duration,
            summary.warnings,
        ))
    }
}

impl Default for Walker {
    fn default() -> Self {
        Self::new()
    }
}

/// What remains of a walk once every record has been consumed.
#[derive(Debug, Clone)]
pub struct WalkSummary {
    /// Canonical root path.
    pub root_path: PathBuf,
    /// Totals over the yielded records.
    pub stats: WalkStats,
    /// Entries that were skipped.
    pub warnings: Vec<ScanWarning>,
    /// Time spent walking.
    pub duration: Duration,
}

/// A lazy, single-use sequence of [`FileRecord`]s.
///
/// Entries that cannot be read are skipped and remembered as warnings.
/// Call [`Walk::finish`] after iterating to learn whether the walk was
/// interrupted.
pub struct Walk {
    entries: DirEntryIter<((), ())>,
    root_path: PathBuf,
    tracker: ProgressTracker,
    stats: WalkStats,
    warnings: Vec<ScanWarning>,
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: CancellationToken,
    interrupted: bool,
    exhausted: bool,
}

impl Walk {
    /// Canonical root path being walked.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Statistics over the records yielded so far.
    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    /// Whether the walk was cut short by cancellation.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Drain any remaining entries and return the summary.
    ///
    /// Returns [`ScanError::Interrupted`] if the walk was cancelled, so
    /// partial results are never mistaken for complete ones.
    pub fn finish(mut self) -> Result<WalkSummary, ScanError> {
        for _ in self.by_ref() {}

        if self.interrupted {
            return Err(ScanError::Interrupted);
        }

        Ok(WalkSummary {
            root_path: self.root_path,
            stats: self.stats,
            warnings: self.warnings,
            duration: self.tracker.elapsed(),
        })
    }

    fn push_warning(&mut self, warning: ScanWarning) {
        warn!(path = %warning.path.display(), "{}", warning.message);
        self.tracker.record_skip();
        self.warnings.push(warning);
    }

    fn send_progress(&self) {
        // Nobody listening is fine.
        let _ = self.progress_tx.send(self.tracker.snapshot());
    }

    /// Turn a jwalk entry into a record, or `None` if it is skipped.
    fn record_for(&mut self, entry: jwalk::DirEntry<((), ())>) -> Option<FileRecord> {
        let path = entry.path();
        let depth = entry.depth();
        let file_type = entry.file_type();

        if let Some(err) = entry.read_children_error.as_ref() {
            self.push_warning(warning_from_walk_error(err, &path, WarningKind::ReadError));
        }

        if file_type.is_symlink() {
            // Only reached when links are not followed.
            self.stats.record_symlink();
            if std::fs::metadata(&path).is_err() {
                let target = std::fs::read_link(&path)
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.push_warning(ScanWarning::broken_symlink(&path, &target));
            }
            return None;
        }

        if !file_type.is_dir() && !file_type.is_file() {
            self.stats.record_other();
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                self.push_warning(warning_from_walk_error(&err, &path, WarningKind::MetadataError));
                return None;
            }
        };

        let (modified, missing_mtime) = modification_time(&path, metadata.modified());
        if let Some(warning) = missing_mtime {
            self.push_warning(warning);
        }
        let record = if file_type.is_dir() {
            self.tracker.record_dir();
            FileRecord::directory(path, modified).with_depth(depth)
        } else {
            FileRecord::file(path, metadata.len(), modified).with_depth(depth)
        };

        self.stats.record(&record);
        Some(record)
    }
}

impl Iterator for Walk {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        if self.interrupted || self.exhausted {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                debug!(root = %self.root_path.display(), "walk interrupted");
                self.interrupted = true;
                return None;
            }

            let entry = match self.entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    self.push_warning(warning_from_walk_error(&err, &path, WarningKind::ReadError));
                    continue;
                }
                None => {
                    self.exhausted = true;
                    self.send_progress();
                    debug!(
                        root = %self.root_path.display(),
                        files = self.stats.total_files,
                        dirs = self.stats.total_dirs,
                        warnings = self.warnings.len(),
                        "walk complete"
                    );
                    return None;
                }
            };

            let Some(record) = self.record_for(entry) else {
                continue;
            };

            if !record.is_dir {
                let seen = self.tracker.record_file(record.size);
                if seen % PROGRESS_INTERVAL == 0 {
                    self.send_progress();
                }
            }

            return Some(record);
        }
    }
}

/// Compile ignore patterns; `None` when there are none.
fn build_ignore_set(patterns: &[String]) -> Result<Option<GlobSet>, ScanError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ScanError::invalid_config(format!("bad ignore pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| ScanError::invalid_config(e.to_string()))
}

/// Modification time, or the current time plus a warning when the platform
/// or filesystem cannot report one. Entries without an mtime count as fresh.
fn modification_time(path: &Path, modified: io::Result<SystemTime>) -> (SystemTime, Option<ScanWarning>) {
    match modified {
        Ok(time) => (time, None),
        Err(err) => {
            let message = format!("No modification time for {}: {err}", path.display());
            let warning = ScanWarning::new(path, message, WarningKind::MetadataError);
            (SystemTime::now(), Some(warning))
        }
    }
}

fn warning_from_walk_error(err: &jwalk::Error, path: &Path, fallback: WarningKind) -> ScanWarning {
    match err.io_error() {
        Some(io) => ScanWarning::from_io(path, io, fallback),
        None => ScanWarning::new(path, err.to_string(), fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        // Create directory structure
        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        // Create files
        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();

        temp
    }

    #[test]
    fn test_missing_mtime_counts_as_fresh() {
        let before = SystemTime::now();
        let unsupported = io::Error::new(io::ErrorKind::Unsupported, "no mtime here");

        let (time, warning) = modification_time(Path::new("/r/odd"), Err(unsupported));

        assert!(time >= before);
        let warning = warning.unwrap();
        assert_eq!(warning.kind, WarningKind::MetadataError);
        assert_eq!(warning.path, PathBuf::from("/r/odd"));
        assert!(warning.message.contains("no mtime here"));

        let stamp = before - Duration::from_secs(60);
        assert_eq!(modification_time(Path::new("/r/ok"), Ok(stamp)), (stamp, None));
    }

    #[test]
    fn test_basic_walk() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let snapshot = Walker::new().snapshot(&config).unwrap();

        assert_eq!(snapshot.stats.total_files, 4);
        assert_eq!(snapshot.stats.total_dirs, 3);
        assert_eq!(snapshot.stats.total_size, 5 + 17 + 4 + 17);
        assert_eq!(snapshot.stats.max_depth, 3);
        assert!(snapshot.warnings.is_empty());
    }

    #[test]
    fn test_root_not_yielded() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let walk = Walker::new().walk(&config).unwrap();
        let root = walk.root_path().to_path_buf();
        let records: Vec<FileRecord> = walk.collect();

        assert!(records.iter().all(|r| r.path != root));
        assert!(records.iter().all(|r| r.path.starts_with(&root)));
        assert!(records.iter().all(|r| r.depth >= 1));
    }

    #[test]
    fn test_walk_order_is_deterministic() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let first: Vec<PathBuf> = Walker::new().walk(&config).unwrap().map(|r| r.path).collect();
        let second: Vec<PathBuf> = Walker::new().walk(&config).unwrap().map(|r| r.path).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let config = ScanConfig::new(temp.path().join("nope"));

        let err = Walker::new().walk(&config).err().unwrap();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn test_file_root_fails() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path().join("file1.txt"));

        let err = Walker::new().walk(&config).err().unwrap();
        assert!(matches!(err, ScanError::NotADirectory { .. }));
    }

    #[test]
    fn test_ignore_patterns_prune_subtrees() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .ignore_patterns(vec!["dir1".to_string()])
            .build()
            .unwrap();

        let snapshot = Walker::new().snapshot(&config).unwrap();

        // dir1 and everything below it are gone
        assert!(!snapshot
            .records
            .iter()
            .any(|r| r.path.components().any(|c| c.as_os_str() == "dir1")));
        assert_eq!(snapshot.stats.total_files, 2);
    }

    #[test]
    fn test_ignore_glob_pattern() {
        let temp = create_test_tree();
        fs::write(temp.path().join("noise.log"), "x").unwrap();
        let config = ScanConfig::builder()
            .root(temp.path())
            .ignore_patterns(vec!["*.log".to_string()])
            .build()
            .unwrap();

        let snapshot = Walker::new().snapshot(&config).unwrap();
        assert!(!snapshot.records.iter().any(|r| r.file_name() == "noise.log"));
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .ignore_patterns(vec!["[".to_string()])
            .build()
            .unwrap();

        let err = Walker::new().walk(&config).err().unwrap();
        assert!(matches!(err, ScanError::InvalidConfig { .. }));
    }

    #[test]
    fn test_hidden_files_excluded_on_request() {
        let temp = create_test_tree();
        fs::write(temp.path().join(".secret"), "shh").unwrap();

        let mut config = ScanConfig::new(temp.path());
        let with_hidden = Walker::new().snapshot(&config).unwrap();
        assert!(with_hidden.records.iter().any(|r| r.file_name() == ".secret"));

        config.include_hidden = false;
        let without_hidden = Walker::new().snapshot(&config).unwrap();
        assert!(!without_hidden.records.iter().any(|r| r.file_name() == ".secret"));
    }

    #[test]
    fn test_max_depth() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .max_depth(Some(1usize))
            .build()
            .unwrap();

        let snapshot = Walker::new().snapshot(&config).unwrap();
        assert!(snapshot.records.iter().all(|r| r.depth == 1));
        assert_eq!(snapshot.stats.total_files, 1);
    }

    #[test]
    fn test_cancelled_walk_is_interrupted() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let walker = Walker::new();
        walker.cancel_token().cancel();

        let mut walk = walker.walk(&config).unwrap();
        assert!(walk.next().is_none());
        assert!(walk.is_interrupted());
        assert!(matches!(walk.finish(), Err(ScanError::Interrupted)));

        assert!(matches!(
            walker.snapshot(&config),
            Err(ScanError::Interrupted)
        ));
    }

    #[test]
    fn test_progress_is_broadcast() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let walker = Walker::new();
        let mut rx = walker.subscribe();
        walker.snapshot(&config).unwrap();

        let mut last = None;
        while let Ok(progress) = rx.try_recv() {
            last = Some(progress);
        }
        let last = last.expect("at least the final progress update");
        assert_eq!(last.files, 4);
        assert_eq!(last.dirs, 3);
        assert_eq!(last.bytes, 43);
        assert_eq!(last.skipped, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_warning() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("dangling")).unwrap();

        let snapshot = Walker::new().snapshot(&ScanConfig::new(temp.path())).unwrap();

        assert_eq!(snapshot.stats.total_symlinks, 1);
        assert_eq!(snapshot.stats.total_files, 4);
        assert!(snapshot
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::BrokenSymlink));
    }
}
