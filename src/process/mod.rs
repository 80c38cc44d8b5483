//! Process snapshot source: the seam between the sampling engine and the OS.
//!
//! This module provides:
//! - `ProcessTable`: trait for enumerating live processes and querying their
//!   parent pid, memory breakdown, command name, and owning user
//! - `MemoryInfo`: fixed-shape seven-field memory record
//! - `MemoryKind`: enumeration of the seven fields for generic iteration
//! - `ProbeError`: classified per-process query errors
//! - `procfs`: the Linux /proc implementation
//! - `synthetic`: deterministic in-memory table for tests

pub mod procfs;
pub mod synthetic;

use thiserror::Error;

// Re-export commonly used types
pub use procfs::ProcfsTable;
pub use synthetic::{SyntheticProcess, SyntheticTable};

/// Error raised when querying a single process.
///
/// The `Vanished`, `AccessDenied`, and `Zombie` variants are expected races
/// in process enumeration and are always recovered by skipping the process
/// for the current pass.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The process exited between enumeration and query.
    #[error("process {0} no longer exists")]
    Vanished(u32),

    /// The caller lacks permission to read this process's entries.
    #[error("access denied to process {0}")]
    AccessDenied(u32),

    /// The process is a zombie and has no memory breakdown.
    #[error("process {0} is a zombie")]
    Zombie(u32),

    /// A /proc entry was present but not in the expected format.
    #[error("malformed proc entry for process {pid}: {reason}")]
    Malformed { pid: u32, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// True for the expected enumeration races that are skipped silently.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProbeError::Vanished(_) | ProbeError::AccessDenied(_) | ProbeError::Zombie(_)
        )
    }
}

/// One process's memory breakdown at one instant. All values are byte counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Resident set size.
    pub rss: u64,
    /// Virtual memory size.
    pub vms: u64,
    /// Shared memory.
    pub shared: u64,
    /// Text (code) memory.
    pub text: u64,
    /// Library memory.
    pub lib: u64,
    /// Data + stack memory.
    pub data: u64,
    /// Dirty pages.
    pub dirty: u64,
}

impl MemoryInfo {
    /// Sum of all seven fields. A zero total marks a degenerate entry
    /// (kernel thread or similar) that carries no signal.
    pub fn total(&self) -> u64 {
        MemoryKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    /// Field accessor by kind, for generic per-kind iteration.
    pub fn get(&self, kind: MemoryKind) -> u64 {
        match kind {
            MemoryKind::Rss => self.rss,
            MemoryKind::Vms => self.vms,
            MemoryKind::Shared => self.shared,
            MemoryKind::Text => self.text,
            MemoryKind::Lib => self.lib,
            MemoryKind::Data => self.data,
            MemoryKind::Dirty => self.dirty,
        }
    }
}

/// The seven memory kinds tracked per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    Rss,
    Vms,
    Shared,
    Text,
    Lib,
    Data,
    Dirty,
}

impl MemoryKind {
    pub const ALL: [MemoryKind; 7] = [
        MemoryKind::Rss,
        MemoryKind::Vms,
        MemoryKind::Shared,
        MemoryKind::Text,
        MemoryKind::Lib,
        MemoryKind::Data,
        MemoryKind::Dirty,
    ];

    /// Short label, used for audit lines and output file names.
    pub fn label(&self) -> &'static str {
        match self {
            MemoryKind::Rss => "rss",
            MemoryKind::Vms => "vms",
            MemoryKind::Shared => "shared",
            MemoryKind::Text => "text",
            MemoryKind::Lib => "lib",
            MemoryKind::Data => "data",
            MemoryKind::Dirty => "dirty",
        }
    }

    /// Human-readable description, used for chart titles.
    pub fn description(&self) -> &'static str {
        match self {
            MemoryKind::Rss => "Resident Set Size",
            MemoryKind::Vms => "Virtual Memory Size",
            MemoryKind::Shared => "Shared Memory",
            MemoryKind::Text => "Text Memory",
            MemoryKind::Lib => "Library Memory",
            MemoryKind::Data => "Data Memory",
            MemoryKind::Dirty => "Dirty Memory",
        }
    }
}

/// Snapshot source over the live process table.
///
/// `pids` enumerates best-effort: a process may vanish between enumeration
/// and any per-process query, which the per-process methods report as a
/// transient `ProbeError`.
pub trait ProcessTable {
    /// Enumerate all currently visible process ids. Called exactly once per
    /// sampling pass.
    fn pids(&self) -> Vec<u32>;

    /// Parent pid of `pid`. Pid 0 is the root sentinel.
    fn parent(&self, pid: u32) -> Result<u32, ProbeError>;

    /// Seven-field memory breakdown of `pid`, in bytes.
    fn memory(&self, pid: u32) -> Result<MemoryInfo, ProbeError>;

    /// Base name of the first command-line token of `pid`.
    fn command(&self, pid: u32) -> Result<String, ProbeError>;

    /// User name of the owner of `pid`.
    fn user(&self, pid: u32) -> Result<String, ProbeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_info_total() {
        let m = MemoryInfo {
            rss: 1,
            vms: 2,
            shared: 3,
            text: 4,
            lib: 5,
            data: 6,
            dirty: 7,
        };
        assert_eq!(m.total(), 28);
        assert_eq!(MemoryInfo::default().total(), 0);
    }

    #[test]
    fn test_memory_kind_accessors_cover_all_fields() {
        let m = MemoryInfo {
            rss: 10,
            vms: 20,
            shared: 30,
            text: 40,
            lib: 50,
            data: 60,
            dirty: 70,
        };
        let values: Vec<u64> = MemoryKind::ALL.iter().map(|k| m.get(*k)).collect();
        assert_eq!(values, vec![10, 20, 30, 40, 50, 60, 70]);
    }

    #[test]
    fn test_probe_error_classification() {
        assert!(ProbeError::Vanished(1).is_transient());
        assert!(ProbeError::AccessDenied(1).is_transient());
        assert!(ProbeError::Zombie(1).is_transient());
        assert!(!ProbeError::Malformed {
            pid: 1,
            reason: "bad stat".into()
        }
        .is_transient());
        assert!(!ProbeError::Io(std::io::Error::other("boom")).is_transient());
    }
}
