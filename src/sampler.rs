//! One sampling pass over the process table, and the aggregation state that
//! survives across passes.

use crate::filter::FilterConfig;
use crate::process::{MemoryInfo, MemoryKind, ProcessTable};
use ahash::AHashMap as HashMap;
use chrono::Local;
use tracing::debug;

/// Accumulated results of all sampling passes. Created empty at startup,
/// appended to only by [`Sampler::sample_once`], and read out once by the
/// drain step.
///
/// Single-threaded by design. A multi-threaded extension would have to
/// serialize the series and tally updates of one pass as a single critical
/// section so the drain step observes them consistently.
#[derive(Debug, Default)]
pub struct AggregationState {
    foreground: Vec<MemoryInfo>,
    background: Vec<MemoryInfo>,
    peak_tally: HashMap<String, u64>,
    audit: String,
    passes: u64,
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples that passed the foreground filter, in observation order.
    pub fn foreground(&self) -> &[MemoryInfo] {
        &self.foreground
    }

    /// Unfiltered samples, populated only when background capture is on.
    pub fn background(&self) -> &[MemoryInfo] {
        &self.background
    }

    /// Foreground values of one memory kind, in observation order.
    pub fn series(&self, kind: MemoryKind) -> Vec<u64> {
        self.foreground.iter().map(|m| m.get(kind)).collect()
    }

    /// Background values of one memory kind.
    pub fn background_series(&self, kind: MemoryKind) -> Vec<u64> {
        self.background.iter().map(|m| m.get(kind)).collect()
    }

    /// Per-label count of passes in which that label held the largest rss.
    /// The empty label stands for passes with no foreground observation.
    pub fn peak_tally(&self) -> &HashMap<String, u64> {
        &self.peak_tally
    }

    /// Full audit text: one header line per pass, one breakdown line per
    /// observed process. Grows monotonically, never truncated.
    pub fn audit(&self) -> &str {
        &self.audit
    }

    /// Number of per-process breakdown lines in the audit record.
    pub fn audit_process_lines(&self) -> usize {
        self.audit.lines().filter(|l| l.starts_with("PID: ")).count()
    }

    /// Number of completed sampling passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }
}

/// Drives one discrete pass over the process table.
pub struct Sampler<'a, T: ProcessTable> {
    table: &'a T,
    filter: &'a FilterConfig,
    capture_background: bool,
}

impl<'a, T: ProcessTable> Sampler<'a, T> {
    pub fn new(table: &'a T, filter: &'a FilterConfig, capture_background: bool) -> Self {
        Self {
            table,
            filter,
            capture_background,
        }
    }

    /// Walks the full process table once. Returns true iff at least one
    /// process was appended to the foreground series.
    ///
    /// Processes that vanish, deny access, or turn out to be zombies are
    /// skipped for this pass; that is an expected enumeration race, not an
    /// error. Entries whose seven fields sum to zero are recorded in the
    /// audit text but excluded from every series and from peak tracking.
    pub fn sample_once(&self, state: &mut AggregationState) -> bool {
        let pids = self.table.pids();
        state.passes += 1;
        state
            .audit
            .push_str(&format!("Sample @ {}\n", Local::now().format("%Y-%m-%d %H:%M:%S%.3f")));

        let mut leader = String::new();
        let mut leader_rss = 0u64;
        let mut matched = false;

        for pid in pids {
            let mem = match self.table.memory(pid) {
                Ok(m) => m,
                Err(e) if e.is_transient() => continue,
                Err(e) => {
                    debug!("skipping pid {pid}: {e}");
                    continue;
                }
            };
            state.audit.push_str(&format!(
                "PID: {pid}, Mem_info: rss={} vms={} shared={} text={} lib={} data={} dirty={}\n",
                mem.rss, mem.vms, mem.shared, mem.text, mem.lib, mem.data, mem.dirty
            ));
            if mem.total() == 0 {
                continue;
            }
            if self.capture_background {
                state.background.push(mem);
            }
            let command = self.table.command(pid).unwrap_or_default();
            let user = self.table.user(pid).unwrap_or_default();
            if !self.filter.matches(self.table, pid, &command, &user) {
                continue;
            }
            if mem.rss > leader_rss {
                leader_rss = mem.rss;
                leader = command;
            }
            state.foreground.push(mem);
            matched = true;
        }

        // One tally increment per pass, even when no foreground process was
        // observed: the empty label then takes the increment.
        *state.peak_tally.entry(leader).or_insert(0) += 1;

        matched
    }
}
