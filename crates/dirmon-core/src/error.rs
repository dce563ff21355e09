//! Error types for walking and analysis.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a whole operation.
///
/// Anything touching the root of an operation ends up here; problems with
/// individual descendants are reported as [`ScanWarning`]s instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root (or a path it resolves through) may not be read.
    #[error("Cannot read {path}: permission denied")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("No such file or directory: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("Cannot walk {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Operation was interrupted.
    #[error("Operation interrupted")]
    Interrupted,

    /// A setting could not be used, e.g. a malformed glob.
    #[error("Bad configuration: {message}")]
    InvalidConfig { message: String },

    /// The root exists but is a file or special entry.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Kind of walk or hash warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Symbolic link target does not exist.
    BrokenSymlink,
    /// Error reading a directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// Error reading file content for hashing.
    HashError,
}

/// Non-fatal problem with a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from an I/O error, picking the kind from the error.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error, fallback: WarningKind) -> Self {
        let kind = match error.kind() {
            std::io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            _ => fallback,
        };
        Self::new(path, error.to_string(), kind)
    }

    /// Create a broken symlink warning.
    pub fn broken_symlink(path: impl Into<PathBuf>, target: &str) -> Self {
        let path = path.into();
        Self {
            message: format!("Dangling link {} -> {target}", path.display()),
            path,
            kind: WarningKind::BrokenSymlink,
        }
    }

    /// Create a hashing failure warning.
    pub fn hash_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        Self {
            message: format!("Could not hash {}: {error}", path.display()),
            path,
            kind: WarningKind::HashError,
        }
    }
}
