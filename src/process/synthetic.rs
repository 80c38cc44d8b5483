//! Deterministic in-memory process table.
//!
//! Stands in for /proc in unit and integration tests: fixed entries, a fixed
//! parent chain, and optional per-entry lifetimes measured in sampling
//! passes so tests can script a process exiting mid-run.

use crate::process::{MemoryInfo, ProbeError, ProcessTable};
use std::sync::atomic::{AtomicU64, Ordering};

/// One scripted process entry.
#[derive(Debug, Clone)]
pub struct SyntheticProcess {
    pub pid: u32,
    pub ppid: u32,
    pub command: String,
    pub user: String,
    pub memory: MemoryInfo,
    /// Number of passes this entry stays visible; `None` = forever.
    pub alive_for_passes: Option<u64>,
    /// Still enumerated, but every query fails as vanished. Simulates the
    /// exit race between enumeration and query.
    pub vanishes_on_query: bool,
}

impl SyntheticProcess {
    pub fn new(pid: u32, ppid: u32, command: &str, user: &str, rss: u64) -> Self {
        Self {
            pid,
            ppid,
            command: command.to_string(),
            user: user.to_string(),
            memory: MemoryInfo {
                rss,
                vms: rss * 4,
                shared: rss / 2,
                text: rss / 8,
                lib: 0,
                data: rss,
                dirty: 0,
            },
            alive_for_passes: None,
            vanishes_on_query: false,
        }
    }

    pub fn with_memory(mut self, memory: MemoryInfo) -> Self {
        self.memory = memory;
        self
    }

    pub fn alive_for(mut self, passes: u64) -> Self {
        self.alive_for_passes = Some(passes);
        self
    }

    pub fn vanishing(mut self) -> Self {
        self.vanishes_on_query = true;
        self
    }
}

/// Scripted snapshot source. Each `pids()` call advances the pass counter,
/// so entries with a lifetime disappear from enumeration and report
/// `Vanished` on later queries, mimicking the /proc race.
#[derive(Debug, Default)]
pub struct SyntheticTable {
    entries: Vec<SyntheticProcess>,
    passes: AtomicU64,
}

impl SyntheticTable {
    pub fn new(entries: Vec<SyntheticProcess>) -> Self {
        Self {
            entries,
            passes: AtomicU64::new(0),
        }
    }

    /// Number of enumeration passes performed so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    fn lookup(&self, pid: u32) -> Result<&SyntheticProcess, ProbeError> {
        let pass = self.passes.load(Ordering::Relaxed);
        self.entries
            .iter()
            .find(|p| {
                p.pid == pid
                    && !p.vanishes_on_query
                    && p.alive_for_passes.map_or(true, |n| pass <= n)
            })
            .ok_or(ProbeError::Vanished(pid))
    }
}

impl ProcessTable for SyntheticTable {
    fn pids(&self) -> Vec<u32> {
        let pass = self.passes.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries
            .iter()
            .filter(|p| p.alive_for_passes.map_or(true, |n| pass <= n))
            .map(|p| p.pid)
            .collect()
    }

    fn parent(&self, pid: u32) -> Result<u32, ProbeError> {
        Ok(self.lookup(pid)?.ppid)
    }

    fn memory(&self, pid: u32) -> Result<MemoryInfo, ProbeError> {
        Ok(self.lookup(pid)?.memory)
    }

    fn command(&self, pid: u32) -> Result<String, ProbeError> {
        Ok(self.lookup(pid)?.command.clone())
    }

    fn user(&self, pid: u32) -> Result<String, ProbeError> {
        Ok(self.lookup(pid)?.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifetime_expires_after_configured_passes() {
        let table = SyntheticTable::new(vec![
            SyntheticProcess::new(1, 0, "init", "root", 1024),
            SyntheticProcess::new(42, 1, "shortlived", "root", 2048).alive_for(1),
        ]);

        assert_eq!(table.pids(), vec![1, 42]);
        assert!(table.memory(42).is_ok());

        // Second pass: the short-lived entry is gone.
        assert_eq!(table.pids(), vec![1]);
        assert!(matches!(table.memory(42), Err(ProbeError::Vanished(42))));
        assert!(table.memory(1).is_ok());
        assert_eq!(table.passes(), 2);
    }
}
