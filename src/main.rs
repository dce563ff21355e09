//! dirmon - duplicate detection, disk usage breakdown and cleanup advice.
//!
//! Usage:
//!   dirmon duplicates [PATH]   Find byte-identical files
//!   dirmon usage [PATH]        Space usage by file type and directory
//!   dirmon cleanup [PATH]      Suggest files worth removing
//!   dirmon scan [PATH]         Walk summary
//!   dirmon --help              Show help

mod logging;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dirmon_analyze::{
    Analyzer, CleanupConfig, CleanupReport, DuplicateConfig, DuplicateReport, UsageConfig,
    UsageReport,
};
use dirmon_scan::{ScanConfig, Snapshot, Walker};

/// Label for files sitting directly in the analyzed root.
const ROOT_LABEL: &str = "[root directory]";

#[derive(Parser)]
#[command(
    name = "dirmon",
    version,
    about = "Filesystem housekeeping for a directory tree",
    long_about = "dirmon finds duplicate files, shows where disk space goes and \
                  suggests cleanup candidates. It never deletes anything."
)]
struct Cli {
    #[command(flatten)]
    walk: WalkArgs,

    /// Show debug logs on stderr (DIRMON_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Walk settings shared by every command.
#[derive(Args)]
struct WalkArgs {
    /// Skip hidden files and directories
    #[arg(long, global = true)]
    no_hidden: bool,

    /// Follow symbolic links
    #[arg(long, global = true)]
    follow_symlinks: bool,

    /// Skip entries whose name matches this glob (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN", global = true)]
    ignore: Vec<String>,

    /// Walker threads (0 = auto)
    #[arg(long, default_value_t = 0, global = true)]
    threads: usize,

    /// Files hashed concurrently (0 = auto)
    #[arg(long, default_value_t = 0, global = true)]
    hash_threads: usize,
}

impl WalkArgs {
    fn scan_config(&self, root: &Path) -> ScanConfig {
        ScanConfig {
            root: root.to_path_buf(),
            follow_symlinks: self.follow_symlinks,
            max_depth: None,
            ignore_patterns: self.ignore.clone(),
            threads: self.threads,
            hash_threads: self.hash_threads,
            include_hidden: !self.no_hidden,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Find duplicate files
    Duplicates {
        /// Path to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Minimum file size to consider (e.g., "1KB", "1MB")
        #[arg(short, long, default_value = "1B")]
        min_size: String,

        /// Maximum number of duplicate groups to show (0 = all)
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,

        /// Compare first and last 4KB before hashing whole files
        #[arg(short, long)]
        quick: bool,

        /// Leave files matching this glob out of the comparison (repeatable)
        #[arg(short, long, value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Break down space usage by file type and directory
    Usage {
        /// Path to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Number of directories to list
        #[arg(short = 'n', long, default_value = "10")]
        top_dirs: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Suggest files for cleanup
    Cleanup {
        /// Path to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Files untouched for more than this many days are stale
        #[arg(short, long, default_value = "90")]
        age: u64,

        /// Files larger than this many MB are oversize
        #[arg(short, long, default_value = "100")]
        size: u64,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Walk and show a summary
    Scan {
        /// Path to walk
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = match cli.command {
        Command::Duplicates {
            path,
            min_size,
            top,
            quick,
            exclude,
            format,
        } => {
            let root = canonical_root(&path)?;
            let config = DuplicateConfig::builder()
                .min_size(parse_size(&min_size)?.max(1))
                .max_groups(top)
                .quick_compare(quick)
                .exclude_patterns(exclude)
                .build()?;
            let analyzer = build_analyzer(&cli.walk, &root, cancel).with_duplicate_config(config);

            eprintln!("Finding duplicates in {}...", root.display());
            let report = run_blocking(move || {
                analyzer
                    .find_duplicates(&root)
                    .context("Duplicate detection failed")
            })
            .await?;
            print_duplicates(&report, format)
        }
        Command::Usage {
            path,
            top_dirs,
            format,
        } => {
            let root = canonical_root(&path)?;
            let analyzer = build_analyzer(&cli.walk, &root, cancel)
                .with_usage_config(UsageConfig { top_dirs });

            eprintln!("Analyzing usage of {}...", root.display());
            let walk_root = root.clone();
            let report = run_blocking(move || {
                analyzer
                    .analyze_usage(&walk_root)
                    .context("Usage analysis failed")
            })
            .await?;
            print_usage(&report, &root, format)
        }
        Command::Cleanup {
            path,
            age,
            size,
            format,
        } => {
            let root = canonical_root(&path)?;
            let analyzer = build_analyzer(&cli.walk, &root, cancel)
                .with_cleanup_config(CleanupConfig::with_thresholds(age, size));

            eprintln!("Looking for cleanup candidates in {}...", root.display());
            let report = run_blocking(move || {
                analyzer
                    .advise_cleanup(&root)
                    .context("Cleanup analysis failed")
            })
            .await?;
            print_cleanup(&report, age, size, format)
        }
        Command::Scan { path, format } => {
            let root = canonical_root(&path)?;
            let config = cli.walk.scan_config(&root);
            let walker = Walker::with_cancel(cancel);
            let progress = tokio::spawn(report_progress(walker.subscribe()));

            eprintln!("Scanning {}...", root.display());
            let snapshot = run_blocking(move || walker.snapshot(&config).context("Scan failed")).await;
            // The walker is gone, so the progress channel is closed.
            let _ = progress.await;
            print_scan(&snapshot?, format)
        }
    };

    watcher.abort();
    result
}

fn build_analyzer(walk: &WalkArgs, root: &Path, cancel: CancellationToken) -> Analyzer {
    Analyzer::new()
        .with_scan_config(walk.scan_config(root))
        .with_cancel(cancel)
}

fn canonical_root(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Invalid path: {}", path.display()))
}

/// Run a blocking analysis off the async runtime.
async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| eyre!("analysis task failed: {e}"))?
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("\nInterrupted, stopping...");
        cancel.cancel();
    }
}

async fn report_progress(mut rx: tokio::sync::broadcast::Receiver<dirmon_scan::ScanProgress>) {
    loop {
        match rx.recv().await {
            Ok(progress) => {
                debug!(files = progress.files, dirs = progress.dirs, "walk progress");
                eprint!(
                    "\r  {} files, {} directories, {} ({:.0} files/s, {} skipped)",
                    progress.files,
                    progress.dirs,
                    format_size(progress.bytes),
                    progress.files_per_sec(),
                    progress.skipped
                );
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    eprintln!();
}

fn print_duplicates(report: &DuplicateReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print_header("Duplicate File Report");

            if report.groups.is_empty() {
                println!(" No duplicate files found.");
            } else {
                println!(
                    " Found {} duplicate groups ({} files)",
                    report.group_count, report.files_with_duplicates
                );
                println!(
                    " Total wasted space: {}",
                    format_size(report.total_wasted_space)
                );
                println!();

                for (i, group) in report.groups.iter().enumerate() {
                    println!(
                        " Group {} [{}] ({} files, {} each, {} wasted)",
                        i + 1,
                        group.hash.short_hex(),
                        group.count(),
                        format_size(group.size),
                        format_size(group.wasted_bytes)
                    );
                    for path in &group.paths {
                        println!("   {}", path.display());
                    }
                    println!();
                }

                if report.is_truncated() {
                    println!(
                        " Showing {} of {} groups ({} of {} files)",
                        report.groups.len(),
                        report.group_count,
                        report.listed_files(),
                        report.files_with_duplicates
                    );
                }
            }

            println!(
                " {} files compared, {} hashed ({} read)",
                report.files_analyzed,
                report.files_hashed,
                format_size(report.bytes_hashed)
            );
            print_warning_count(report.warnings.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }

    Ok(())
}

fn print_usage(report: &UsageReport, root: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print_header("Disk Usage Report");

            if report.is_empty() {
                println!(" No files found.");
                print_warning_count(report.warnings.len());
                return Ok(());
            }

            println!(
                " {} in {} files",
                format_size(report.total_bytes),
                report.total_files
            );
            println!();

            println!(" By file type:");
            for stat in &report.by_type {
                let ratio = stat.percent_of(report.total_bytes);
                println!(
                    "   {:<20} {:>10} {:>8} files {:>6.1}% {}",
                    truncate(&stat.extension, 20),
                    format_size(stat.bytes),
                    stat.file_count,
                    ratio,
                    make_bar(ratio / 100.0, 20)
                );
            }
            println!();

            println!(
                " Largest directories ({} of {}):",
                report.by_dir.len(),
                report.dir_total_count
            );
            for stat in &report.by_dir {
                let ratio = stat.percent_of(report.total_bytes);
                println!(
                    "   {:<40} {:>10} {:>8} files {:>6.1}%",
                    truncate(&display_dir(&stat.path, root), 40),
                    format_size(stat.bytes),
                    stat.file_count,
                    ratio
                );
            }
            println!();

            print_warning_count(report.warnings.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }

    Ok(())
}

fn print_cleanup(report: &CleanupReport, age: u64, size: u64, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print_header("Cleanup Suggestions");
            println!(" Stale after {age} days, oversize above {size} MB");
            println!();

            if !report.has_candidates() {
                println!(" Nothing to clean up.");
            } else {
                for candidate in &report.candidates {
                    println!(
                        "   {:<50} {:>10}  {}  {}",
                        truncate(&candidate.path.display().to_string(), 50),
                        format_size(candidate.size),
                        format_date(candidate.modified),
                        candidate.reason
                    );
                }
                println!();
                println!(
                    " {} candidates out of {} files, potential savings: {}",
                    report.candidates.len(),
                    report.files_examined,
                    format_size(report.total_savings)
                );
                println!(" Nothing has been deleted.");
            }

            print_warning_count(report.warnings.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }

    Ok(())
}

fn print_scan(snapshot: &Snapshot, format: OutputFormat) -> Result<()> {
    let stats = &snapshot.stats;

    match format {
        OutputFormat::Text => {
            print_header(&format!(
                "{} - {}",
                snapshot.root_path.display(),
                format_size(stats.total_size)
            ));
            println!(
                " {} files, {} directories, {} symlinks, {} other",
                stats.total_files, stats.total_dirs, stats.total_symlinks, stats.total_other
            );
            println!(" Max depth: {}", stats.max_depth);
            println!(" Scanned in {:.2}s", snapshot.scan_duration.as_secs_f64());

            if let Some((path, size)) = &stats.largest_file {
                println!(" Largest file: {} ({})", path.display(), format_size(*size));
            }
            if let Some((path, time)) = &stats.oldest_file {
                println!(" Oldest file:  {} ({})", path.display(), format_date(*time));
            }
            if let Some((path, time)) = &stats.newest_file {
                println!(" Newest file:  {} ({})", path.display(), format_date(*time));
            }
            println!();

            for warning in &snapshot.warnings {
                debug!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
            }
            print_warning_count(snapshot.warnings.len());
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "root_path": snapshot.root_path,
                "scan_duration": snapshot.scan_duration,
                "stats": stats,
                "warnings": snapshot.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn print_header(title: &str) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" {title}");
    println!("{}", "─".repeat(70));
    println!();
}

fn print_warning_count(count: usize) {
    if count > 0 {
        println!(" {count} entries skipped (run with -v for details)");
    }
}

/// Directory relative to the analyzed root.
fn display_dir(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ROOT_LABEL.to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

fn format_date(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string to max length, counting characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let digits = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.');
    let unit = &s[digits.len()..];

    let multiplier: u64 = match unit {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        _ => return Err(eyre!("unknown size unit '{unit}' in '{s}'")),
    };

    let num: f64 = digits
        .parse()
        .with_context(|| format!("invalid size '{s}'"))?;
    Ok((num * multiplier as f64) as u64)
}
