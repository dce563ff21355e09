//! Core types for dirmon.
//!
//! This crate provides the data structures shared by the walker and the
//! analysis engine: walk records, materialized snapshots, scan
//! configuration and the error/warning taxonomy.

mod config;
mod error;
mod record;
mod snapshot;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use record::{ContentHash, FileRecord, NO_EXTENSION};
pub use snapshot::{Snapshot, WalkStats};
