//! CLI arguments for memstat.
//!
//! This module defines the command-line interface structure using the clap
//! library. Argument values are validated into a `SamplerConfig` by the
//! `config` module before the engine starts.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Filter combine mode options
#[derive(Debug, Clone, ValueEnum)]
pub enum CombineArg {
    /// Every configured filter must match
    And,
    /// Any configured filter may match
    Or,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "memstat",
    about = "Samples per-process memory usage and renders log-binned histograms at exit",
    long_about = "Samples per-process memory usage and renders log-binned histograms at exit.\n\n\
                  Periodically walks the process table, records the seven-field memory \
                  breakdown of every process (rss, vms, shared, text, lib, data, dirty), \
                  optionally restricted by command name, owning user, or descent from a \
                  target process, and at termination writes one histogram per memory kind \
                  plus a full audit log of every observation.",
    version = "0.1.0"
)]
pub struct Args {
    /// Total sampling duration in seconds (0 = run until interrupted)
    #[arg(short = 'd', long, default_value_t = 0)]
    pub duration: u64,

    /// Sampling interval in milliseconds
    #[arg(short = 'i', long = "interval-ms", default_value_t = 1000)]
    pub interval_ms: u64,

    /// Include only processes with these command names (comma-separated)
    #[arg(long)]
    pub names: Option<String>,

    /// Include only processes owned by these users (comma-separated)
    #[arg(long)]
    pub users: Option<String>,

    /// Include only descendants of this process id
    #[arg(long)]
    pub ancestor_pid: Option<u32>,

    /// How to combine the name/user/ancestry filters
    #[arg(long, value_enum, default_value = "and")]
    pub combine: CombineArg,

    /// Also capture an unfiltered background series for comparison
    #[arg(short = 'b', long)]
    pub background: bool,

    /// Suppress per-pass progress messages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Root directory for figures/ and logs/ output
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Child command to launch and monitor exclusively
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,
}
