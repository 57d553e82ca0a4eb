//! fcp - Fan-out Copy
//!
//! Copy one file or directory to several destinations at once, reading the
//! source a single time. Powered by fancopy.

use clap::{Parser, ValueEnum};
use fancopy::{CopyBuilder, CopyOutcome, CopyReport, Error as CopyError};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// fcp - Copy one source to many destinations
///
/// The source is read once; every chunk is written to every destination.
///
/// Usage:
///   fcp SOURCE DEST...
///   fcp -r DIRECTORY DEST_DIR...
#[derive(Parser, Debug)]
#[command(name = "fcp", version, about, long_about = None)]
struct Args {
    /// Source file or directory
    source: PathBuf,

    /// Destination paths
    ///
    /// A destination that is an existing directory receives the source
    /// file under its own name.
    #[arg(required = true)]
    targets: Vec<PathBuf>,

    /// Copy directories recursively
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Abort a file at the first failing destination
    ///
    /// By default a failing destination is dropped and the others continue.
    #[arg(long)]
    fail_fast: bool,

    /// Number of files copied concurrently
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Chunk size in bytes
    #[arg(long, value_name = "BYTES")]
    buffer_size: Option<usize>,

    /// Write to temp files and rename into place only on success
    #[arg(long)]
    atomic: bool,

    /// Do not call fsync after each file (faster but less safe)
    #[arg(long)]
    no_sync: bool,

    /// Maximum directory depth (default: unlimited)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    output: OutputMode,

    /// Disable progress bar
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Source is a directory. Use -r/--recursive to copy directories: {path}")]
    SourceIsDirectoryWithoutRecursive { path: PathBuf },

    #[error("Target '{path}' is not a directory (when copying a directory)")]
    TargetNotDirectory { path: PathBuf },

    #[error("Path is not valid UTF-8: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Failed to read source directory: {path}: {source}")]
    Walk { path: PathBuf, source: io::Error },

    #[error("Failed to serialize JSON output: {source}")]
    JsonSerialize { source: serde_json::Error },
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::SourceIsDirectoryWithoutRecursive { .. }
            | Self::TargetNotDirectory { .. }
            | Self::InvalidPath { .. } => 2,
            Self::Walk { .. } | Self::JsonSerialize { .. } => 1,
        }
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("fcp: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn run() -> CliResult<ExitCode> {
    let args = Args::parse();
    init_logging(args.debug);

    let is_dir = args.source.is_dir();
    if is_dir && !args.recursive {
        return Err(CliError::SourceIsDirectoryWithoutRecursive {
            path: args.source.clone(),
        });
    }
    if is_dir {
        if let Some(path) = args.targets.iter().find(|t| t.exists() && !t.is_dir()) {
            return Err(CliError::TargetNotDirectory { path: path.clone() });
        }
    }

    let targets: Vec<String> = if is_dir {
        args.targets.iter().map(|t| path_url(t)).collect::<CliResult<_>>()?
    } else {
        args.targets
            .iter()
            .map(|t| path_url(&resolve_file_target(&args.source, t)))
            .collect::<CliResult<_>>()?
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel_clone = cancel.clone();
        ctrlc::set_handler(move || {
            if cancel_clone.load(Ordering::Relaxed) {
                eprintln!("\nForce quit.");
                std::process::exit(130);
            }
            cancel_clone.store(true, Ordering::Relaxed);
            eprintln!(
                "\nCancelling... finishing in-flight chunks. Press Ctrl+C again to abort immediately."
            );
        })
        .ok();
    }

    let mut builder = CopyBuilder::new(path_url(&args.source)?, targets)
        .parallel(args.jobs)
        .cancel_token(cancel)
        .warn_handler(|msg| eprintln!("fcp: warning: {msg}"));
    if args.fail_fast {
        builder = builder.fail_fast();
    }
    if let Some(bytes) = args.buffer_size {
        builder = builder.buffer_size(bytes);
    }
    if args.atomic {
        builder = builder.atomic();
    }
    if args.no_sync {
        builder = builder.no_fsync();
    }
    if let Some(depth) = args.max_depth {
        builder = builder.max_depth(depth);
    }

    let pb = if args.output == OutputMode::Human && !args.quiet {
        let pb = progress_bar(&args.source, is_dir);
        builder = builder.progress(Arc::new(pb.clone()));
        Some(pb)
    } else {
        builder = builder.quiet();
        None
    };

    let result = if is_dir {
        builder.run_recursive().map_err(|source| CliError::Walk {
            path: args.source.clone(),
            source,
        })
    } else {
        builder.run().map_err(|source| CliError::Walk {
            path: args.source.clone(),
            source,
        })
    };

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let report = result?;

    match args.output {
        OutputMode::Human => print_report(&report, args.verbose),
        OutputMode::Json => print_json_value(&report_json(&report))?,
    }

    Ok(exit_code_for(&report))
}

fn init_logging(debug: bool) {
    let default = if debug { "fancopy=debug,fcp=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("FCP_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// A destination that is an existing directory receives `source` under its
/// own file name.
fn resolve_file_target(source: &Path, target: &Path) -> PathBuf {
    match source.file_name() {
        Some(name) if target.is_dir() => target.join(name),
        _ => target.to_path_buf(),
    }
}

fn progress_bar(source: &Path, is_dir: bool) -> ProgressBar {
    if !is_dir {
        if let Ok(meta) = source.metadata() {
            return fancopy::create_progress_bar(meta.len());
        }
    }
    let pb = ProgressBar::no_length();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {bytes} ({bytes_per_sec})")
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn exit_code_for(report: &CopyReport) -> ExitCode {
    if report.is_cancelled() {
        ExitCode::from(130)
    } else if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &CopyReport, verbose: bool) {
    for (_, outcome) in &report.results {
        print_outcome_errors(outcome);
    }

    let stats = &report.stats;
    if report.is_cancelled() {
        eprintln!(
            "Cancelled after copying {} files ({}).",
            stats.jobs_succeeded,
            format_bytes(stats.bytes_copied)
        );
        return;
    }
    if stats.jobs() == 0 {
        println!("Nothing to copy");
        return;
    }

    let bytes_str = format_bytes(stats.bytes_copied);
    if verbose {
        println!("Copy completed in {:?}", stats.duration);
        println!("  Files copied:   {}", stats.jobs_succeeded);
        println!("  Files failed:   {}", stats.jobs_failed);
        println!("  Target errors:  {}", stats.target_errors);
        println!("  Total size:     {bytes_str}");

        if stats.duration.as_secs_f64() > 0.0 {
            let speed = stats.bytes_copied as f64 / stats.duration.as_secs_f64();
            println!("  Speed:          {}/s", format_bytes(speed as u64));
        }
    } else if stats.jobs_succeeded > 0 {
        println!("Copied {} files ({bytes_str})", stats.jobs_succeeded);
    }
}

/// Render every error of one outcome. Errors of a job that still succeeded
/// (best-effort with a healthy target) are warnings.
fn print_outcome_errors(outcome: &CopyOutcome) {
    let prefix = if outcome.is_success() {
        "fcp: warning: "
    } else {
        "fcp: "
    };
    for error in outcome.errors() {
        eprintln!("{prefix}{error}");
        if error.is_no_space() {
            eprintln!("fcp: hint: free up space on the destination and retry");
        }
    }
}

fn error_json(error: &CopyError) -> Value {
    json!({
        "kind": error.kind().as_str(),
        "phase": error.phase().as_str(),
        "url": error.url(),
        "job": error.job(),
        "no_space": error.is_no_space(),
        "message": error.to_string(),
    })
}

fn report_json(report: &CopyReport) -> Value {
    let jobs: Vec<Value> = report
        .results
        .iter()
        .map(|(job, outcome)| {
            json!({
                "source": job.source_url(),
                "targets": job.target_urls(),
                "status": if outcome.is_success() { "ok" } else { "failed" },
                "policy": outcome.policy.as_str(),
                "bytes_transferred": outcome.bytes_transferred,
                "expected_length": outcome.expected_length,
                "aborted": outcome.aborted,
                "succeeded_targets": outcome.succeeded_targets(),
                "errors": outcome.errors().map(error_json).collect::<Vec<_>>(),
            })
        })
        .collect();

    let stats = &report.stats;
    json!({
        "status": if report.is_cancelled() {
            "cancelled"
        } else if report.is_success() {
            "ok"
        } else {
            "failed"
        },
        "summary": {
            "jobs_succeeded": stats.jobs_succeeded,
            "jobs_failed": stats.jobs_failed,
            "jobs_cancelled": stats.jobs_cancelled,
            "target_errors": stats.target_errors,
            "bytes_copied": stats.bytes_copied,
            "duration_ms": stats.duration.as_millis() as u64,
        },
        "jobs": jobs,
    })
}

fn print_json_value(value: &Value) -> CliResult<()> {
    let serialized =
        serde_json::to_string(value).map_err(|source| CliError::JsonSerialize { source })?;
    println!("{serialized}");
    Ok(())
}

fn path_url(path: &Path) -> CliResult<String> {
    fancopy::path_to_url(path).map_err(|_| CliError::InvalidPath {
        path: path.to_path_buf(),
    })
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
