//! Streaming content hashing over size buckets.
//!
//! Every file is read through a fixed-size buffer, so memory use does not
//! depend on file size. Files are hashed on a rayon pool whose size bounds
//! the number of files open at once.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use blake3::Hasher;
use dashmap::DashMap;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dirmon_core::{ContentHash, ScanError, ScanWarning};

use crate::bucket::SizeBucket;

/// Read buffer size for full-content hashing.
const BUFFER_SIZE: usize = 64 * 1024;

/// What to feed into the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// The whole file.
    Full,
    /// Only `head` bytes from the start and `tail` bytes from the end.
    Partial { head: usize, tail: usize },
}

/// Digests computed for a set of buckets.
#[derive(Debug, Clone, Default)]
pub struct HashOutcome {
    /// One digest per successfully hashed file.
    pub digests: HashMap<PathBuf, ContentHash>,
    /// Files that could not be read, sorted by path.
    pub warnings: Vec<ScanWarning>,
    /// Bytes fed into the hasher.
    pub bytes_hashed: u64,
}

impl HashOutcome {
    /// Digest for `path`, if it was hashed.
    pub fn digest(&self, path: &Path) -> Option<ContentHash> {
        self.digests.get(path).copied()
    }

    /// Number of files hashed.
    pub fn files_hashed(&self) -> usize {
        self.digests.len()
    }
}

/// Hashes the members of size buckets, in parallel.
pub struct ContentHasher {
    pool: Option<ThreadPool>,
    cancel: CancellationToken,
}

impl ContentHasher {
    /// Create a hasher running on rayon's global pool.
    pub fn new() -> Self {
        Self {
            pool: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a hasher that reads at most `threads` files at once
    /// (0 = rayon's global pool).
    pub fn with_threads(threads: usize) -> Result<Self, ScanError> {
        if threads == 0 {
            return Ok(Self::new());
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dirmon-hash-{i}"))
            .build()
            .map_err(|e| ScanError::invalid_config(format!("hash thread pool: {e}")))?;

        Ok(Self {
            pool: Some(pool),
            cancel: CancellationToken::new(),
        })
    }

    /// Stop hashing once `cancel` is triggered.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Hash every member of every bucket.
    ///
    /// Unreadable files are skipped and reported in
    /// [`HashOutcome::warnings`]. Returns [`ScanError::Interrupted`] if
    /// cancelled before all files were hashed.
    pub fn hash_buckets(&self, buckets: &[SizeBucket], mode: HashMode) -> Result<HashOutcome, ScanError> {
        let digests: DashMap<PathBuf, ContentHash> = DashMap::new();
        let failures: DashMap<PathBuf, ScanWarning> = DashMap::new();

        let run = || {
            buckets.par_iter().for_each(|bucket| {
                bucket.paths.par_iter().for_each(|path| {
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    match hash_path(path, mode) {
                        Ok(hash) => {
                            digests.insert(path.clone(), hash);
                        }
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "skipping file that could not be hashed");
                            failures.insert(path.clone(), ScanWarning::hash_error(path, &err));
                        }
                    }
                });
            });
        };

        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }

        if self.cancel.is_cancelled() {
            debug!("hashing interrupted");
            return Err(ScanError::Interrupted);
        }

        let digests: HashMap<PathBuf, ContentHash> = digests.into_iter().collect();
        let bytes_hashed = buckets
            .iter()
            .map(|b| {
                let hashed = b.paths.iter().filter(|p| digests.contains_key(*p)).count() as u64;
                match mode {
                    HashMode::Full => b.size * hashed,
                    HashMode::Partial { head, tail } => b.size.min((head + tail) as u64) * hashed,
                }
            })
            .sum();

        let mut warnings: Vec<ScanWarning> = failures.into_iter().map(|(_, w)| w).collect();
        warnings.sort_by(|a, b| a.path.cmp(&b.path));

        debug!(
            files = digests.len(),
            skipped = warnings.len(),
            bytes = bytes_hashed,
            ?mode,
            "hashed size buckets"
        );

        Ok(HashOutcome {
            digests,
            warnings,
            bytes_hashed,
        })
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_path(path: &Path, mode: HashMode) -> io::Result<ContentHash> {
    match mode {
        HashMode::Full => hash_file(path),
        HashMode::Partial { head, tail } => partial_hash(path, head, tail),
    }
}

/// Compute the BLAKE3 hash of a file's full content, streaming it.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

/// Compute a hash over the first `head` and last `tail` bytes.
pub fn partial_hash(path: &Path, head: usize, tail: usize) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();

    let mut hasher = Hasher::new();

    // Read from start
    let head_size = (head as u64).min(file_size);
    let mut head_buf = vec![0u8; head_size as usize];
    file.read_exact(&mut head_buf)?;
    hasher.update(&head_buf);

    // Read from end (if file is large enough)
    if file_size > head_size {
        let tail_size = (tail as u64).min(file_size - head_size);
        if tail_size > 0 {
            file.seek(SeekFrom::End(-(tail_size as i64)))?;
            let mut tail_buf = vec![0u8; tail_size as usize];
            file.read_exact(&mut tail_buf)?;
            hasher.update(&tail_buf);
        }
    }

    // Include file size in hash to differentiate files with same head/tail
    hasher.update(&file_size.to_le_bytes());

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_files() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::write(root.join("file1.txt"), "duplicate content here").unwrap();
        fs::write(root.join("file2.txt"), "duplicate content here").unwrap();
        fs::write(root.join("file3.txt"), "different content here").unwrap();

        temp
    }

    #[test]
    fn test_hash_file() {
        let temp = create_test_files();

        let hash1 = hash_file(&temp.path().join("file1.txt")).unwrap();
        let hash2 = hash_file(&temp.path().join("file2.txt")).unwrap();
        let hash3 = hash_file(&temp.path().join("file3.txt")).unwrap();

        // file1 and file2 should have same hash
        assert_eq!(hash1, hash2);
        // file3 should be different
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.0, *blake3::hash(b"duplicate content here").as_bytes());
    }

    #[test]
    fn test_hash_file_larger_than_buffer() {
        let temp = TempDir::new().unwrap();
        let content: Vec<u8> = (0..(BUFFER_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        fs::write(temp.path().join("big.bin"), &content).unwrap();

        let hash = hash_file(&temp.path().join("big.bin")).unwrap();
        assert_eq!(hash.0, *blake3::hash(&content).as_bytes());
    }

    #[test]
    fn test_partial_hash() {
        let temp = create_test_files();

        let hash1 = partial_hash(&temp.path().join("file1.txt"), 4, 4).unwrap();
        let hash2 = partial_hash(&temp.path().join("file2.txt"), 4, 4).unwrap();
        // "dupl" vs "diff"
        let hash3 = partial_hash(&temp.path().join("file3.txt"), 4, 4).unwrap();

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_hash_buckets_skips_unreadable() {
        let temp = create_test_files();
        let root = temp.path();
        let bucket = SizeBucket::new(
            22,
            vec![root.join("file1.txt"), root.join("vanished.txt"), root.join("file2.txt")],
        );

        let outcome = ContentHasher::new()
            .hash_buckets(&[bucket], HashMode::Full)
            .unwrap();

        assert_eq!(outcome.files_hashed(), 2);
        assert_eq!(outcome.bytes_hashed, 44);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].path, root.join("vanished.txt"));
        assert!(outcome.digest(&root.join("vanished.txt")).is_none());
        assert_eq!(
            outcome.digest(&root.join("file1.txt")),
            outcome.digest(&root.join("file2.txt"))
        );
    }

    #[test]
    fn test_bounded_pool() {
        let temp = create_test_files();
        let root = temp.path();
        let bucket = SizeBucket::new(
            22,
            vec![root.join("file1.txt"), root.join("file2.txt"), root.join("file3.txt")],
        );

        let outcome = ContentHasher::with_threads(1)
            .unwrap()
            .hash_buckets(&[bucket], HashMode::Full)
            .unwrap();

        assert_eq!(outcome.files_hashed(), 3);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_cancelled_hashing() {
        let temp = create_test_files();
        let bucket = SizeBucket::new(22, vec![temp.path().join("file1.txt"), temp.path().join("file2.txt")]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = ContentHasher::new()
            .with_cancel(cancel)
            .hash_buckets(&[bucket], HashMode::Full);

        assert!(matches!(result, Err(ScanError::Interrupted)));
    }
}
