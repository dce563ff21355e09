//! Space usage breakdown by file type and parent directory.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use derive_builder::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use dirmon_core::{FileRecord, ScanWarning};

/// Configuration for usage analysis.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct UsageConfig {
    /// Number of directories kept in the directory breakdown (0 = all).
    #[builder(default = "10")]
    pub top_dirs: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self { top_dirs: 10 }
    }
}

impl UsageConfig {
    /// Create a new config builder.
    pub fn builder() -> UsageConfigBuilder {
        UsageConfigBuilder::default()
    }
}

/// Bytes attributed to one normalized extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStat {
    /// Lower-cased extension with its dot, or `[no extension]`.
    pub extension: CompactString,
    /// Total bytes.
    pub bytes: u64,
    /// Number of files.
    pub file_count: u64,
}

impl TypeStat {
    /// Share of `total` in percent.
    pub fn percent_of(&self, total: u64) -> f64 {
        percent(self.bytes, total)
    }
}

/// Bytes of the files whose immediate parent is `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirStat {
    /// Absolute directory path.
    pub path: PathBuf,
    /// Total bytes of direct children files.
    pub bytes: u64,
    /// Number of direct children files.
    pub file_count: u64,
}

impl DirStat {
    /// Share of `total` in percent.
    pub fn percent_of(&self, total: u64) -> f64 {
        percent(self.bytes, total)
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Results from usage analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Every extension seen, largest first.
    pub by_type: Vec<TypeStat>,
    /// Largest directories, truncated to `top_dirs`.
    pub by_dir: Vec<DirStat>,
    /// Exact total bytes over all files.
    pub total_bytes: u64,
    /// Number of files aggregated.
    pub total_files: u64,
    /// Number of directories holding files, before truncation.
    pub dir_total_count: usize,
    /// Entries skipped during the walk.
    pub warnings: Vec<ScanWarning>,
}

impl UsageReport {
    /// Check if no file was aggregated.
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }

    /// Stat for an extension key.
    pub fn type_stat(&self, extension: &str) -> Option<&TypeStat> {
        self.by_type.iter().find(|t| t.extension == extension)
    }

    /// Stat for a directory, if it made the top list.
    pub fn dir_stat(&self, path: &Path) -> Option<&DirStat> {
        self.by_dir.iter().find(|d| d.path == path)
    }
}

/// Accumulates usage totals over records.
#[derive(Debug, Clone, Default)]
pub struct UsageAggregator {
    config: UsageConfig,
}

impl UsageAggregator {
    /// Create an aggregator with default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aggregator with custom config.
    pub fn with_config(config: UsageConfig) -> Self {
        Self { config }
    }

    /// Aggregate bytes per extension and per immediate parent directory.
    ///
    /// Directory records are ignored. Both lists are sorted by bytes
    /// descending, ties broken by key.
    pub fn aggregate<I>(&self, records: I) -> UsageReport
    where
        I: IntoIterator,
        I::Item: Borrow<FileRecord>,
    {
        let mut totals = UsageTotals::default();
        for record in records {
            totals.add(record.borrow());
        }
        totals.into_report(self.config.top_dirs)
    }
}

#[derive(Default)]
struct UsageTotals {
    by_type: HashMap<CompactString, (u64, u64)>,
    by_dir: HashMap<PathBuf, (u64, u64)>,
    total_bytes: u64,
    total_files: u64,
}

impl UsageTotals {
    fn add(&mut self, record: &FileRecord) {
        if record.is_dir {
            return;
        }

        self.total_bytes += record.size;
        self.total_files += 1;

        let by_type = self.by_type.entry(record.extension_key()).or_default();
        by_type.0 += record.size;
        by_type.1 += 1;

        let parent = record.parent().map(Path::to_path_buf).unwrap_or_default();
        let by_dir = self.by_dir.entry(parent).or_default();
        by_dir.0 += record.size;
        by_dir.1 += 1;
    }

    fn into_report(self, top_dirs: usize) -> UsageReport {
        let by_type = self
            .by_type
            .into_iter()
            .map(|(extension, (bytes, file_count))| TypeStat {
                extension,
                bytes,
                file_count,
            })
            .sorted_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.extension.cmp(&b.extension)))
            .collect();

        let dir_total_count = self.by_dir.len();
        let limit = if top_dirs == 0 { usize::MAX } else { top_dirs };
        let by_dir = self
            .by_dir
            .into_iter()
            .map(|(path, (bytes, file_count))| DirStat {
                path,
                bytes,
                file_count,
            })
            .sorted_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.path.cmp(&b.path)))
            .take(limit)
            .collect();

        UsageReport {
            by_type,
            by_dir,
            total_bytes: self.total_bytes,
            total_files: self.total_files,
            dir_total_count,
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn file(path: &str, size: u64) -> FileRecord {
        FileRecord::file(path, size, SystemTime::now())
    }

    #[test]
    fn test_aggregate_by_type_and_dir() {
        let records = vec![
            FileRecord::directory("/r/docs", SystemTime::now()),
            file("/r/docs/a.TXT", 100),
            file("/r/docs/b.txt", 50),
            file("/r/docs/deep/c.jpg", 400),
            file("/r/Makefile", 10),
        ];

        let report = UsageAggregator::new().aggregate(&records);

        assert_eq!(report.total_bytes, 560);
        assert_eq!(report.total_files, 4);

        let types: Vec<(&str, u64)> = report
            .by_type
            .iter()
            .map(|t| (t.extension.as_str(), t.bytes))
            .collect();
        assert_eq!(types, vec![(".jpg", 400), (".txt", 150), ("[no extension]", 10)]);
        assert_eq!(report.type_stat(".txt").map(|t| t.file_count), Some(2));

        // Only the immediate parent gets the bytes
        assert_eq!(report.dir_stat(Path::new("/r/docs")).map(|d| d.bytes), Some(150));
        assert_eq!(report.dir_stat(Path::new("/r/docs/deep")).map(|d| d.bytes), Some(400));
        assert_eq!(report.dir_stat(Path::new("/r")).map(|d| d.bytes), Some(10));
    }

    #[test]
    fn test_ties_break_by_key() {
        let records = vec![file("/r/b/x.zz", 5), file("/r/a/x.aa", 5)];

        let report = UsageAggregator::new().aggregate(&records);

        assert_eq!(report.by_type[0].extension, ".aa");
        assert_eq!(report.by_dir[0].path, PathBuf::from("/r/a"));
    }

    #[test]
    fn test_dir_breakdown_truncated() {
        let records: Vec<FileRecord> = (0..15)
            .map(|i| file(&format!("/r/d{i:02}/f.bin"), 100 + i))
            .collect();

        let report = UsageAggregator::new().aggregate(&records);

        assert_eq!(report.by_dir.len(), 10);
        assert_eq!(report.dir_total_count, 15);
        assert_eq!(report.by_dir[0].path, PathBuf::from("/r/d14"));
        assert_eq!(report.total_bytes, (100..115).sum::<u64>());

        let all = UsageAggregator::with_config(UsageConfig { top_dirs: 0 }).aggregate(&records);
        assert_eq!(all.by_dir.len(), 15);
    }

    #[test]
    fn test_percent_of() {
        let stat = TypeStat {
            extension: ".txt".into(),
            bytes: 25,
            file_count: 1,
        };
        assert_eq!(stat.percent_of(100), 25.0);
        assert_eq!(stat.percent_of(0), 0.0);
    }

    #[test]
    fn test_empty_input() {
        let report = UsageAggregator::new().aggregate(Vec::<FileRecord>::new());
        assert!(report.is_empty());
        assert!(report.by_type.is_empty());
        assert!(report.by_dir.is_empty());
        assert_eq!(report.total_bytes, 0);
    }
}
