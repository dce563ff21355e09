//! Size bucketing, the cheap pre-filter before content hashing.

use std::borrow::Borrow;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use dirmon_core::FileRecord;

/// Files sharing one exact byte size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBucket {
    /// Size shared by every member.
    pub size: u64,
    /// Members in discovery order.
    pub paths: Vec<PathBuf>,
}

impl SizeBucket {
    /// Create a bucket.
    pub fn new(size: u64, paths: Vec<PathBuf>) -> Self {
        Self { size, paths }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if the bucket has no members.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether this bucket is worth hashing: two or more non-empty files.
    pub fn is_candidate(&self) -> bool {
        self.size > 0 && self.paths.len() >= 2
    }
}

/// Non-directory records partitioned by exact size.
///
/// Buckets keep the order in which their size was first seen, and members
/// keep discovery order.
#[derive(Debug, Clone, Default)]
pub struct SizeBuckets {
    buckets: IndexMap<u64, Vec<PathBuf>>,
    files: u64,
}

impl SizeBuckets {
    /// Create an empty set of buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build buckets from records, ignoring directories.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<FileRecord>,
    {
        let mut buckets = Self::new();
        for record in records {
            buckets.insert(record.borrow());
        }
        buckets
    }

    /// Add a record; directories are ignored.
    pub fn insert(&mut self, record: &FileRecord) {
        if record.is_dir {
            return;
        }
        self.files += 1;
        self.buckets
            .entry(record.size)
            .or_default()
            .push(record.path.clone());
    }

    /// Number of files bucketed.
    pub fn files_seen(&self) -> u64 {
        self.files
    }

    /// Number of distinct sizes.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check if nothing was bucketed.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Members of the bucket for `size`.
    pub fn get(&self, size: u64) -> Option<&[PathBuf]> {
        self.buckets.get(&size).map(Vec::as_slice)
    }

    /// Iterate over all buckets, including single-member ones.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[PathBuf])> {
        self.buckets.iter().map(|(size, paths)| (*size, paths.as_slice()))
    }

    /// Buckets that may contain duplicates, in discovery order.
    pub fn into_candidates(self) -> Vec<SizeBucket> {
        self.buckets
            .into_iter()
            .map(|(size, paths)| SizeBucket::new(size, paths))
            .filter(SizeBucket::is_candidate)
            .collect()
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
    fn test_buckets_group_by_exact_size() {
        let records = vec![
            file("/r/a", 100),
            file("/r/b", 200),
            file("/r/c", 100),
            FileRecord::directory("/r/d", SystemTime::now()),
        ];

        let buckets = SizeBuckets::from_records(&records);

        assert_eq!(buckets.files_seen(), 3);
        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets.get(100),
            Some(&[PathBuf::from("/r/a"), PathBuf::from("/r/c")][..])
        );
        assert_eq!(buckets.get(200).map(<[PathBuf]>::len), Some(1));
    }

    #[test]
    fn test_only_multi_member_non_empty_buckets_are_candidates() {
        let records = vec![
            file("/r/empty1", 0),
            file("/r/empty2", 0),
            file("/r/lonely", 7),
            file("/r/pair1", 9),
            file("/r/pair2", 9),
        ];

        let candidates = SizeBuckets::from_records(records).into_candidates();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].size, 9);
        assert_eq!(candidates[0].len(), 2);
        assert!(candidates.iter().all(SizeBucket::is_candidate));
    }

    #[test]
    fn test_bucket_order_follows_discovery() {
        let records = vec![
            file("/r/x1", 5),
            file("/r/y1", 3),
            file("/r/y2", 3),
            file("/r/x2", 5),
        ];

        let sizes: Vec<u64> = SizeBuckets::from_records(&records)
            .into_candidates()
            .iter()
            .map(|b| b.size)
            .collect();

        assert_eq!(sizes, vec![5, 3]);
    }
}
