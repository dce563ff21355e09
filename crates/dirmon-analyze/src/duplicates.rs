//! Duplicate file detection using content hashing.
//!
//! Uses a two-phase algorithm:
//! 1. Group files by exact size (no I/O)
//! 2. Hash the members of every bucket with two or more files
//!
//! With `quick_compare` enabled a partial hash (first + last 4KB) runs
//! between the two phases, so only partial matches are read in full.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::path::PathBuf;

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dirmon_core::{ContentHash, FileRecord, ScanError, ScanWarning};

use crate::bucket::{SizeBucket, SizeBuckets};
use crate::hasher::{ContentHasher, HashMode};

/// Configuration for duplicate detection.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct DuplicateConfig {
    /// Minimum file size to consider. Empty files never count as duplicates.
    #[builder(default = "1")]
    pub min_size: u64,

    /// Maximum file size to consider (skip huge files).
    #[builder(default = "u64::MAX")]
    pub max_size: u64,

    /// Use quick comparison (size + partial hash) before full hash.
    #[builder(default = "false")]
    pub quick_compare: bool,

    /// Number of bytes for partial hash from start of file.
    #[builder(default = "4096")]
    pub partial_hash_head: usize,

    /// Number of bytes for partial hash from end of file.
    #[builder(default = "4096")]
    pub partial_hash_tail: usize,

    /// Glob patterns; files whose name or path matches are skipped.
    #[builder(default)]
    pub exclude_patterns: Vec<String>,

    /// Maximum number of groups listed in the report (0 = unlimited).
    /// Totals and `group_count` still cover every group.
    #[builder(default = "0")]
    pub max_groups: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: u64::MAX,
            quick_compare: false,
            partial_hash_head: 4096,
            partial_hash_tail: 4096,
            exclude_patterns: Vec::new(),
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }
}

/// A group of duplicate files sharing the same content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// Size of each file in bytes.
    pub size: u64,

    /// Paths to all duplicate files, in discovery order.
    pub paths: Vec<PathBuf>,

    /// Wasted space: size * (count - 1).
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    /// Create a group, computing the wasted space.
    pub fn new(hash: ContentHash, size: u64, paths: Vec<PathBuf>) -> Self {
        let wasted_bytes = size * (paths.len() as u64).saturating_sub(1);
        Self {
            hash,
            size,
            paths,
            wasted_bytes,
        }
    }

    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Check if keeping one file, how many could be deleted.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups of duplicate files, sorted by wasted space descending.
    /// Cut to `max_groups` when a limit is set.
    pub groups: Vec<DuplicateGroup>,

    /// Total size of all duplicate files.
    pub total_duplicate_size: u64,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Number of files considered after filtering.
    pub files_analyzed: u64,

    /// Number of files whose content was hashed.
    pub files_hashed: u64,

    /// Bytes read while hashing.
    pub bytes_hashed: u64,

    /// Number of files that have duplicates.
    pub files_with_duplicates: u64,

    /// Number of duplicate groups found, listed or not.
    pub group_count: usize,

    /// Entries skipped during the walk or while hashing.
    pub warnings: Vec<ScanWarning>,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Whether `groups` holds fewer groups than were found.
    pub fn is_truncated(&self) -> bool {
        self.groups.len() < self.group_count
    }

    /// Number of files across the listed groups.
    pub fn listed_files(&self) -> usize {
        self.groups.iter().map(|g| g.paths.len()).sum()
    }
}

/// Duplicate file finder.
pub struct DuplicateFinder {
    config: DuplicateConfig,
    exclude: Option<GlobSet>,
    hasher: ContentHasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with default config.
    pub fn new() -> Self {
        Self {
            config: DuplicateConfig::default(),
            exclude: None,
            hasher: ContentHasher::new(),
        }
    }

    /// Create a new duplicate finder with custom config.
    ///
    /// Fails if an exclude pattern is not a valid glob.
    pub fn with_config(config: DuplicateConfig) -> Result<Self, ScanError> {
        let exclude = build_exclude_set(&config.exclude_patterns)?;
        Ok(Self {
            config,
            exclude,
            hasher: ContentHasher::new(),
        })
    }

    /// Use a specific hasher (thread limit, cancellation).
    pub fn with_hasher(mut self, hasher: ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Whether a record takes part in duplicate detection.
    pub fn accepts(&self, record: &FileRecord) -> bool {
        if record.is_dir || record.size < self.config.min_size || record.size > self.config.max_size {
            return false;
        }
        match &self.exclude {
            Some(set) => !(set.is_match(record.file_name()) || set.is_match(&record.path)),
            None => true,
        }
    }

    /// Size-bucket the accepted records.
    pub fn bucket<I>(&self, records: I) -> SizeBuckets
    where
        I: IntoIterator,
        I::Item: Borrow<FileRecord>,
    {
        let mut buckets = SizeBuckets::new();
        for record in records {
            let record = record.borrow();
            if self.accepts(record) {
                buckets.insert(record);
            }
        }
        buckets
    }

    /// Find duplicates among records.
    pub fn find_in_records<I>(&self, records: I) -> Result<DuplicateReport, ScanError>
    where
        I: IntoIterator,
        I::Item: Borrow<FileRecord>,
    {
        self.find_in_buckets(self.bucket(records))
    }

    /// Hash the candidate buckets and group them by digest.
    pub fn find_in_buckets(&self, buckets: SizeBuckets) -> Result<DuplicateReport, ScanError> {
        let files_analyzed = buckets.files_seen();
        let mut candidates = buckets.into_candidates();
        let mut warnings = Vec::new();
        let mut bytes_hashed = 0;

        debug!(
            files = files_analyzed,
            buckets = candidates.len(),
            "size buckets ready for hashing"
        );

        if self.config.quick_compare {
            let mode = HashMode::Partial {
                head: self.config.partial_hash_head,
                tail: self.config.partial_hash_tail,
            };
            let partial = self.hasher.hash_buckets(&candidates, mode)?;
            bytes_hashed += partial.bytes_hashed;
            warnings.extend(partial.warnings);
            candidates = refine_buckets(&candidates, &partial.digests);
        }

        let full = self.hasher.hash_buckets(&candidates, HashMode::Full)?;
        bytes_hashed += full.bytes_hashed;
        warnings.extend(full.warnings);

        let mut groups = group_by_digest(&candidates, &full.digests);

        let total_duplicate_size: u64 = groups.iter().map(|g| g.size * g.paths.len() as u64).sum();
        let total_wasted_space: u64 = groups.iter().map(|g| g.wasted_bytes).sum();
        let files_with_duplicates: u64 = groups.iter().map(|g| g.paths.len() as u64).sum();
        let group_count = groups.len();

        if self.config.max_groups > 0 {
            groups.truncate(self.config.max_groups);
        }

        Ok(DuplicateReport {
            groups,
            total_duplicate_size,
            total_wasted_space,
            files_analyzed,
            files_hashed: full.digests.len() as u64,
            bytes_hashed,
            files_with_duplicates,
            group_count,
            warnings,
        })
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Group bucket members by digest.
///
/// Only groups with two or more members are returned. Members keep
/// discovery order; groups are sorted by wasted space, then size
/// (both descending), then first path. Files without a digest are left out.
pub fn group_by_digest(
    buckets: &[SizeBucket],
    digests: &HashMap<PathBuf, ContentHash>,
) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = buckets
        .iter()
        .flat_map(|bucket| {
            split_by_digest(bucket, digests)
                .into_iter()
                .filter(|(_, paths)| paths.len() >= 2)
                .map(move |(hash, paths)| DuplicateGroup::new(hash, bucket.size, paths))
        })
        .collect();

    groups.sort_by(|a, b| {
        b.wasted_bytes
            .cmp(&a.wasted_bytes)
            .then_with(|| b.size.cmp(&a.size))
            .then_with(|| a.paths.first().cmp(&b.paths.first()))
    });

    groups
}

/// Narrow buckets down to members whose partial digests collide.
fn refine_buckets(buckets: &[SizeBucket], digests: &HashMap<PathBuf, ContentHash>) -> Vec<SizeBucket> {
    buckets
        .iter()
        .flat_map(|bucket| {
            split_by_digest(bucket, digests)
                .into_values()
                .map(move |paths| SizeBucket::new(bucket.size, paths))
                .filter(SizeBucket::is_candidate)
        })
        .collect()
}

fn split_by_digest(
    bucket: &SizeBucket,
    digests: &HashMap<PathBuf, ContentHash>,
) -> IndexMap<ContentHash, Vec<PathBuf>> {
    let mut by_digest: IndexMap<ContentHash, Vec<PathBuf>> = IndexMap::new();
    for path in &bucket.paths {
        if let Some(hash) = digests.get(path) {
            by_digest.entry(*hash).or_default().push(path.clone());
        }
    }
    by_digest
}

fn build_exclude_set(patterns: &[String]) -> Result<Option<GlobSet>, ScanError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ScanError::invalid_config(format!("bad exclude pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| ScanError::invalid_config(e.to_string()))
}
