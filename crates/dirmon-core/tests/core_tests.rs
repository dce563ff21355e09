use dirmon_core::{
    ContentHash, FileRecord, NO_EXTENSION, ScanConfig, ScanError, ScanWarning, Snapshot,
    WalkStats, WarningKind,
};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

#[test]
fn test_content_hash_creation_and_hex() {
    let bytes = [0xab; 32];
    let hash = ContentHash::new(bytes);

    // Test hex conversion
    let hex = hash.to_hex();
    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(hex.starts_with("ab"));

    // Test equality
    let hash2 = ContentHash::new(bytes);
    assert_eq!(hash, hash2);

    // Test inequality
    let hash3 = ContentHash::new([0xcd; 32]);
    assert_ne!(hash, hash3);
    assert!(hash < hash3);
}

#[test]
fn test_record_constructors() {
    let now = SystemTime::now();

    let file = FileRecord::file("/data/photo.JPG", 2048, now);
    assert!(!file.is_dir);
    assert_eq!(file.size, 2048);
    assert_eq!(file.depth, 1);
    assert_eq!(file.file_name(), "photo.JPG");
    assert_eq!(file.extension_key(), ".jpg");

    let dir = FileRecord::directory("/data/albums", now).with_depth(2);
    assert!(dir.is_dir);
    assert_eq!(dir.size, 0);
    assert_eq!(dir.depth, 2);
}

#[test]
fn test_no_extension_sentinel() {
    let record = FileRecord::file("/etc/hostname", 10, SystemTime::now());
    assert_eq!(record.extension_key(), NO_EXTENSION);
    assert_eq!(NO_EXTENSION, "[no extension]");
}

#[test]
fn test_walk_stats_tracks_extremes() {
    let now = SystemTime::now();
    let mut stats = WalkStats::new();

    stats.record(&FileRecord::file("/r/small", 1, now - Duration::from_secs(10)));
    stats.record(&FileRecord::file("/r/big", 500, now));
    stats.record(&FileRecord::file("/r/ancient", 5, now - Duration::from_secs(1_000_000)));
    stats.record_symlink();
    stats.record_other();

    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.total_size, 506);
    assert_eq!(stats.total_symlinks, 1);
    assert_eq!(stats.total_other, 1);
    assert_eq!(stats.largest_file.as_ref().map(|(_, s)| *s), Some(500));
    assert_eq!(
        stats.oldest_file.as_ref().map(|(p, _)| p.clone()),
        Some(PathBuf::from("/r/ancient"))
    );
    assert_eq!(
        stats.newest_file.as_ref().map(|(p, _)| p.clone()),
        Some(PathBuf::from("/r/big"))
    );
}

#[test]
fn test_snapshot_creation() {
    let now = SystemTime::now();
    let records = vec![
        FileRecord::file("/r/a", 10, now),
        FileRecord::directory("/r/d", now),
    ];
    let mut stats = WalkStats::new();
    records.iter().for_each(|r| stats.record(r));

    let snapshot = Snapshot::new(
        PathBuf::from("/r"),
        records,
        stats,
        Duration::from_millis(5),
        vec![ScanWarning::new("/r/locked", "Permission denied (os error 13)", WarningKind::PermissionDenied)],
    );

    assert_eq!(snapshot.total_size(), 10);
    assert_eq!(snapshot.files().count(), 1);
    assert!(snapshot.has_warnings());
    assert_eq!(snapshot.warnings[0].kind, WarningKind::PermissionDenied);
}

#[test]
fn test_scan_config_builder_defaults() {
    let config = ScanConfig::builder().root("/srv").build().unwrap();

    assert_eq!(config.root, PathBuf::from("/srv"));
    assert!(!config.follow_symlinks);
    assert!(config.include_hidden);
    assert!(config.max_depth.is_none());
    assert!(config.ignore_patterns.is_empty());
}

#[test]
fn test_scan_error_messages_carry_path() {
    let err = ScanError::NotADirectory {
        path: PathBuf::from("/etc/passwd"),
    };
    assert!(err.to_string().contains("/etc/passwd"));

    let err = ScanError::io("/missing", std::io::Error::other("disk on fire"));
    assert!(matches!(err, ScanError::Io { .. }));
    assert!(err.to_string().contains("disk on fire"));

    assert_eq!(ScanError::Interrupted.to_string(), "Operation interrupted");
}
