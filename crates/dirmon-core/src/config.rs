//! Walk settings shared by every analysis.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for walking a directory tree.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to walk.
    pub root: PathBuf,

    /// Descend into symlinked directories and treat symlinked files as files.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Deepest level yielded; direct children of the root are level 1.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Glob patterns matched against entry names; matching entries and
    /// their subtrees are skipped.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of threads for walking (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Maximum number of files hashed concurrently (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub hash_threads: usize,

    /// Yield dot-files and descend into dot-directories.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.root {
            None => Err("a root directory must be given".to_string()),
            Some(root) if root.as_os_str().is_empty() => Err("the root directory is empty".to_string()),
            Some(_) => Ok(()),
        }
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for walking a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            max_depth: None,
            ignore_patterns: Vec::new(),
            threads: 0,
            hash_threads: 0,
            include_hidden: true,
        }
    }

    /// Same settings, different root.
    pub fn with_root(&self, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..self.clone()
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .root("/home/user")
            .threads(4usize)
            .hash_threads(2usize)
            .follow_symlinks(true)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.threads, 4);
        assert_eq!(config.hash_threads, 2);
        assert!(config.follow_symlinks);
        assert!(config.include_hidden);
    }

    #[test]
    fn test_config_builder_requires_root() {
        assert!(ScanConfig::builder().build().is_err());
        assert!(ScanConfig::builder().root("").build().is_err());
    }

    #[test]
    fn test_config_simple() {
        let config = ScanConfig::new("/home/user");
        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert!(!config.follow_symlinks);
        assert_eq!(config.threads, 0);
        assert_eq!(config.hash_threads, 0);
    }

    #[test]
    fn test_with_root_keeps_settings() {
        let mut config = ScanConfig::new("/a");
        config.ignore_patterns = vec!["node_modules".to_string()];
        let moved = config.with_root("/b");
        assert_eq!(moved.root, PathBuf::from("/b"));
        assert_eq!(moved.ignore_patterns, config.ignore_patterns);
    }
}
