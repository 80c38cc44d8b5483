//! Configuration for the sampling engine.
//!
//! The CLI surface is parsed by `cli`; this module turns parsed arguments
//! into a validated [`SamplerConfig`] before any sampling starts. The core
//! never parses strings itself.

use crate::cli::{Args, CombineArg};
use crate::filter::{CombineMode, FilterConfig};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Configuration error. Reported to the operator before sampling starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("a child command is mutually exclusive with --names, --users and --ancestor-pid")]
    ChildWithFilters,
}

/// Validated engine configuration. Built once, read-only afterward.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Wall-clock bound for the sampling loop; `None` = unbounded.
    pub duration: Option<Duration>,
    /// Inter-pass sleep.
    pub interval: Duration,
    pub filter: FilterConfig,
    /// Capture the unfiltered background series as well.
    pub background: bool,
    /// Suppress per-pass progress messages.
    pub quiet: bool,
    /// Root directory for `figures/` and `logs/`.
    pub output_dir: PathBuf,
    /// Child command to launch and monitor exclusively.
    pub child_command: Option<Vec<String>>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            duration: None,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            filter: FilterConfig::default(),
            background: false,
            quiet: false,
            output_dir: PathBuf::from("."),
            child_command: None,
        }
    }
}

impl SamplerConfig {
    /// Builds and validates the engine configuration from parsed arguments.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if args.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let has_filter_args = args.names.is_some()
            || args.users.is_some()
            || args.ancestor_pid.is_some();
        if !args.command.is_empty() && has_filter_args {
            return Err(ConfigError::ChildWithFilters);
        }

        let filter = FilterConfig {
            commands: split_list(args.names.as_deref()),
            users: split_list(args.users.as_deref()),
            ancestor_pid: args.ancestor_pid.unwrap_or(0),
            mode: match args.combine {
                CombineArg::And => CombineMode::And,
                CombineArg::Or => CombineMode::Or,
            },
        };

        Ok(Self {
            duration: match args.duration {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            interval: Duration::from_millis(args.interval_ms),
            filter,
            background: args.background,
            quiet: args.quiet,
            output_dir: args.output_dir.clone(),
            child_command: if args.command.is_empty() {
                None
            } else {
                Some(args.command.clone())
            },
        })
    }
}

/// Splits a comma-separated list argument, dropping empty segments.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("memstat").chain(argv.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cfg = SamplerConfig::from_args(&parse(&[])).unwrap();
        assert_eq!(cfg.duration, None);
        assert_eq!(cfg.interval, Duration::from_millis(DEFAULT_INTERVAL_MS));
        assert!(cfg.filter.is_empty());
        assert!(!cfg.background);
        assert!(!cfg.quiet);
        assert_eq!(cfg.child_command, None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(None), Vec::<String>::new());
        assert_eq!(split_list(Some("a,b ,,c")), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filter_arguments() {
        let cfg = SamplerConfig::from_args(&parse(&[
            "--names",
            "nginx,postgres",
            "--users",
            "www",
            "--combine",
            "or",
        ]))
        .unwrap();
        assert_eq!(cfg.filter.commands, vec!["nginx", "postgres"]);
        assert_eq!(cfg.filter.users, vec!["www"]);
        assert_eq!(cfg.filter.mode, CombineMode::Or);
        assert_eq!(cfg.filter.ancestor_pid, 0);
    }

    #[test]
    fn test_duration_zero_means_unbounded() {
        let cfg = SamplerConfig::from_args(&parse(&["--duration", "0"])).unwrap();
        assert_eq!(cfg.duration, None);
        let cfg = SamplerConfig::from_args(&parse(&["--duration", "30"])).unwrap();
        assert_eq!(cfg.duration, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = SamplerConfig::from_args(&parse(&["--interval-ms", "0"])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroInterval);
    }

    #[test]
    fn test_child_command_conflicts_with_filters() {
        let err = SamplerConfig::from_args(&parse(&["--names", "x", "--", "sleep", "5"]))
            .unwrap_err();
        assert_eq!(err, ConfigError::ChildWithFilters);

        let cfg = SamplerConfig::from_args(&parse(&["--", "sleep", "5"])).unwrap();
        assert_eq!(
            cfg.child_command,
            Some(vec!["sleep".to_string(), "5".to_string()])
        );
    }
}
