//! Drain-time collaborators: histogram computation, chart writing, and the
//! audit log writer.
//!
//! Runs exactly once, after the sampling loop has stopped. Each memory kind
//! gets a logarithmically binned histogram over its foreground series (and
//! the background series when captured), written as a plain-text chart plus
//! a machine-readable JSON sidecar under `figures/`. The full audit record
//! and the peak-holder tally go to `logs/mem_stat.log`, overwritten once.

use crate::process::MemoryKind;
use crate::sampler::AggregationState;
use anyhow::{bail, Context};
use chrono::Local;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Number of logarithmically spaced bin boundary values.
pub const BIN_BOUNDARIES: usize = 50;

/// Name of the audit log file under `logs/`.
pub const LOG_FILE_NAME: &str = "mem_stat.log";

/// A log-binned histogram of one memory kind's byte values.
#[derive(Debug, Serialize)]
pub struct Histogram {
    /// Short kind label, e.g. "rss". Used for output file names.
    pub label: String,
    /// Chart title, e.g. "Resident Set Size". Suffixed with "(Empty)" when
    /// the series sums to zero.
    pub title: String,
    /// Bin boundary values, log-spaced from 1 to 10^ceil(log10(max)).
    /// Collapses to a single synthetic boundary for an empty series.
    pub bounds: Vec<f64>,
    /// Foreground count per bin; one shorter than `bounds`.
    pub counts: Vec<u64>,
    /// Background count per bin, when background capture was enabled.
    pub background_counts: Option<Vec<u64>>,
    /// Chart x-range: 10^floor(log10(smallest nonzero value)).
    pub x_min: f64,
    pub x_max: f64,
    pub empty: bool,
}

impl Histogram {
    /// Bins a foreground series (and optional background series) for one
    /// memory kind. Zero values never reach a bin; a series with a zero sum
    /// degrades to an explicitly empty chart rather than hitting log(0).
    pub fn build(kind: MemoryKind, foreground: &[u64], background: Option<&[u64]>) -> Self {
        let sum: u64 = foreground.iter().sum();
        if sum == 0 {
            return Self {
                label: kind.label().to_string(),
                title: format!("{} (Empty)", kind.description()),
                bounds: vec![1.0],
                counts: Vec::new(),
                background_counts: None,
                x_min: 1.0,
                x_max: 1.0,
                empty: true,
            };
        }

        let max = *foreground.iter().max().unwrap_or(&1) as f64;
        let min_nonzero = foreground
            .iter()
            .copied()
            .filter(|v| *v > 0)
            .min()
            .unwrap_or(1) as f64;
        let x_max = 10f64.powi(max.log10().ceil() as i32);
        let x_min = 10f64.powi(min_nonzero.log10().floor() as i32);
        let bounds = log_spaced_bounds(x_max);
        let counts = bin_values(foreground, &bounds);
        let background_counts = background.map(|bg| bin_values(bg, &bounds));

        Self {
            label: kind.label().to_string(),
            title: kind.description().to_string(),
            bounds,
            counts,
            background_counts,
            x_min,
            x_max,
            empty: false,
        }
    }
}

/// Log-spaced boundary values from 1 to `upper` inclusive. The last
/// boundary is pinned to `upper` exactly so the maximum observation is
/// never dropped to float drift.
fn log_spaced_bounds(upper: f64) -> Vec<f64> {
    let span = upper.log10();
    let mut bounds: Vec<f64> = (0..BIN_BOUNDARIES)
        .map(|i| 10f64.powf(span * i as f64 / (BIN_BOUNDARIES - 1) as f64))
        .collect();
    bounds[BIN_BOUNDARIES - 1] = upper;
    bounds
}

/// Counts values into the bins described by `bounds`. Values below the
/// first boundary are dropped; the last bin is closed on the right.
fn bin_values(values: &[u64], bounds: &[f64]) -> Vec<u64> {
    let bins = bounds.len().saturating_sub(1);
    let mut counts = vec![0u64; bins];
    if bins == 0 {
        return counts;
    }
    for &v in values {
        let v = v as f64;
        if v < bounds[0] || v > bounds[bins] {
            continue;
        }
        let idx = bounds[..bins]
            .partition_point(|b| *b <= v)
            .saturating_sub(1);
        counts[idx] += 1;
    }
    counts
}

/// Writes per-kind histogram charts under `figure_dir`.
pub struct ChartWriter {
    figure_dir: PathBuf,
}

impl ChartWriter {
    pub fn new(figure_dir: impl Into<PathBuf>) -> Self {
        Self {
            figure_dir: figure_dir.into(),
        }
    }

    /// Writes `<label>_histogram.txt` and `<label>_histogram.json`.
    /// Returns the chart path.
    pub fn render(&self, hist: &Histogram) -> anyhow::Result<PathBuf> {
        let chart_path = self.figure_dir.join(format!("{}_histogram.txt", hist.label));
        fs::write(&chart_path, render_chart(hist))
            .with_context(|| format!("failed to write {}", chart_path.display()))?;

        let json_path = self.figure_dir.join(format!("{}_histogram.json", hist.label));
        let json = serde_json::to_string_pretty(hist)?;
        fs::write(&json_path, json)
            .with_context(|| format!("failed to write {}", json_path.display()))?;

        Ok(chart_path)
    }
}

/// Renders one histogram as a plain-text bar chart.
fn render_chart(hist: &Histogram) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Histogram of {}", hist.title);
    if hist.empty {
        let _ = writeln!(out, "(no nonzero observations)");
        return out;
    }
    let _ = writeln!(
        out,
        "x range: [{:.0}, {:.0}] bytes, log scale, {} samples",
        hist.x_min,
        hist.x_max,
        hist.counts.iter().sum::<u64>()
    );
    let peak = hist.counts.iter().copied().max().unwrap_or(0).max(1);
    for (i, count) in hist.counts.iter().enumerate() {
        let bar_len = (count * 60).div_ceil(peak) as usize;
        let _ = writeln!(
            out,
            "{:>14.0} ..{:>14.0} | {:<60} {}",
            hist.bounds[i],
            hist.bounds[i + 1],
            "#".repeat(bar_len),
            count
        );
    }
    if let Some(bg) = &hist.background_counts {
        let _ = writeln!(out, "background samples: {}", bg.iter().sum::<u64>());
    }
    out
}

/// Writes the audit record and peak-holder tally to `logs/mem_stat.log`.
pub struct LogWriter {
    log_dir: PathBuf,
}

impl LogWriter {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Overwrites the log file with the full audit text followed by the
    /// tally, one `label: count` line per entry, sorted by label.
    pub fn write(&self, state: &AggregationState) -> anyhow::Result<PathBuf> {
        let path = self.log_dir.join(LOG_FILE_NAME);
        let mut text = String::with_capacity(state.audit().len() + 256);
        text.push_str(state.audit());
        text.push_str("Peak holders:\n");
        let mut entries: Vec<_> = state.peak_tally().iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (label, count) in entries {
            let shown = if label.is_empty() { "<none>" } else { label };
            let _ = writeln!(text, "{shown}: {count}");
        }
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Output paths produced by a drain.
#[derive(Debug)]
pub struct DrainSummary {
    pub charts: Vec<PathBuf>,
    pub log_path: PathBuf,
}

/// The terminal handoff: renders one histogram per memory kind and persists
/// the audit log. Fails without rendering anything when no foreground
/// sample was ever collected.
pub fn drain(state: &AggregationState, output_dir: &Path) -> anyhow::Result<DrainSummary> {
    if state.foreground().is_empty() {
        bail!(
            "no foreground samples collected over {} passes; nothing to render",
            state.passes()
        );
    }

    let figure_dir = output_dir.join("figures");
    let log_dir = output_dir.join("logs");
    fs::create_dir_all(&figure_dir)
        .with_context(|| format!("failed to create {}", figure_dir.display()))?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    info!("Start drawing figures, don't interrupt!");
    let has_background = !state.background().is_empty();
    let chart_writer = ChartWriter::new(&figure_dir);
    let mut charts = Vec::with_capacity(MemoryKind::ALL.len());
    for kind in MemoryKind::ALL {
        let fg = state.series(kind);
        let bg = has_background.then(|| state.background_series(kind));
        let hist = Histogram::build(kind, &fg, bg.as_deref());
        charts.push(chart_writer.render(&hist)?);
    }

    let log_path = LogWriter::new(&log_dir).write(state)?;
    info!(
        "drained {} foreground samples at {}: {} charts, log at {}",
        state.foreground().len(),
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        charts.len(),
        log_path.display()
    );

    Ok(DrainSummary { charts, log_path })
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Tests for Histogram::build
    // -------------------------------------------------------------------------

    #[test]
    fn test_build_basic() {
        let data = vec![100, 1_000, 50_000, 2_000_000];
        let hist = Histogram::build(MemoryKind::Rss, &data, None);
        assert!(!hist.empty);
        assert_eq!(hist.bounds.len(), BIN_BOUNDARIES);
        assert_eq!(hist.counts.len(), BIN_BOUNDARIES - 1);
        // Upper boundary is the next power of ten above the max.
        assert_eq!(hist.x_max, 1e7);
        assert_eq!(hist.x_min, 100.0);
        // Every nonzero value lands in exactly one bin.
        assert_eq!(hist.counts.iter().sum::<u64>(), 4);
        assert_eq!(hist.title, "Resident Set Size");
    }

    #[test]
    fn test_build_empty_series_degrades() {
        let hist = Histogram::build(MemoryKind::Dirty, &[0, 0, 0], None);
        assert!(hist.empty);
        assert_eq!(hist.bounds, vec![1.0]);
        assert!(hist.counts.is_empty());
        assert_eq!(hist.title, "Dirty Memory (Empty)");

        let hist = Histogram::build(MemoryKind::Dirty, &[], None);
        assert!(hist.empty);
    }

    #[test]
    fn test_build_zero_values_are_dropped_not_binned() {
        // Mixed zeros: the sum is nonzero so the chart is real, but the
        // zero observations must not land in any bin (or panic on log(0)).
        let data = vec![0, 0, 4096];
        let hist = Histogram::build(MemoryKind::Text, &data, None);
        assert!(!hist.empty);
        assert_eq!(hist.counts.iter().sum::<u64>(), 1);
    }

    #[test]
    fn test_build_max_on_power_of_ten_lands_in_last_bin() {
        let data = vec![10_000];
        let hist = Histogram::build(MemoryKind::Vms, &data, None);
        assert_eq!(hist.x_max, 10_000.0);
        assert_eq!(hist.counts.iter().sum::<u64>(), 1);
        assert_eq!(*hist.counts.last().unwrap(), 1);
    }

    #[test]
    fn test_build_background_series_binned_with_same_bounds() {
        let fg = vec![1_000, 2_000];
        let bg = vec![1_500, 3_000, 500];
        let hist = Histogram::build(MemoryKind::Shared, &fg, Some(&bg));
        let bg_counts = hist.background_counts.unwrap();
        assert_eq!(bg_counts.len(), hist.counts.len());
        assert_eq!(bg_counts.iter().sum::<u64>(), 3);
    }

    #[test]
    fn test_log_spaced_bounds_monotonic() {
        let bounds = log_spaced_bounds(1e6);
        assert_eq!(bounds.len(), BIN_BOUNDARIES);
        assert!((bounds[0] - 1.0).abs() < 1e-9);
        assert!((bounds[BIN_BOUNDARIES - 1] - 1e6).abs() < 1e-3);
        assert!(bounds.windows(2).all(|w| w[0] < w[1]));
    }

    // -------------------------------------------------------------------------
    // Tests for the chart renderer
    // -------------------------------------------------------------------------

    #[test]
    fn test_render_chart_empty() {
        let hist = Histogram::build(MemoryKind::Lib, &[], None);
        let chart = render_chart(&hist);
        assert!(chart.contains("Library Memory (Empty)"));
        assert!(chart.contains("no nonzero observations"));
    }

    #[test]
    fn test_render_chart_has_one_row_per_bin() {
        let hist = Histogram::build(MemoryKind::Rss, &[100, 200, 300], None);
        let chart = render_chart(&hist);
        let rows = chart.lines().filter(|l| l.contains('|')).count();
        assert_eq!(rows, BIN_BOUNDARIES - 1);
    }
}
