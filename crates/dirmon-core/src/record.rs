//! Walk records and content digests.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Extension key for files without an extension.
pub const NO_EXTENSION: &str = "[no extension]";

/// BLAKE3 content hash for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First eight hex characters, enough to tell groups apart in a report.
    pub fn short_hex(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// A single entry produced by walking a directory tree.
///
/// Records are immutable snapshots of the entry's metadata at walk time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Depth below the walk root (direct children are at depth 1).
    pub depth: usize,
}

impl FileRecord {
    /// Create a record for a regular file.
    pub fn file(path: impl Into<PathBuf>, size: u64, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size,
            modified,
            depth: 1,
        }
    }

    /// Create a record for a directory.
    pub fn directory(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            size: 0,
            modified,
            depth: 1,
        }
    }

    /// Set the depth of this record.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// File name as a lossy string (empty if the path has none).
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Immediate parent directory.
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// Normalized extension: the file name from its last `.` onwards,
    /// lower-cased. Dotfiles keep their whole name (`.gitignore`) and a
    /// trailing dot yields `.`. [`NO_EXTENSION`] only when there is no dot.
    pub fn extension_key(&self) -> CompactString {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) => CompactString::from(name[dot..].to_lowercase()),
            None => CompactString::const_new(NO_EXTENSION),
        }
    }

    /// Age of the entry relative to `reference`; zero if modified in the future.
    pub fn age_at(&self, reference: SystemTime) -> Duration {
        reference
            .duration_since(self.modified)
            .unwrap_or(Duration::ZERO)
    }
}
