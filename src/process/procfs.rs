//! Linux /proc implementation of the process snapshot source.
//!
//! Memory breakdowns come from `/proc/<pid>/statm` (seven page counts,
//! scaled to bytes with the runtime page size), parent pid and run state
//! from `/proc/<pid>/stat`, the command name from `/proc/<pid>/cmdline`
//! (falling back to `comm` for kernel threads), and the owning user from
//! the `Uid:` line of `/proc/<pid>/status`.

use crate::process::{MemoryInfo, ProbeError, ProcessTable};
use nix::unistd::{Uid, User};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Snapshot source backed by the /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcfsTable {
    root: PathBuf,
    page_size: u64,
}

impl ProcfsTable {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Uses an alternate proc root. Unit tests point this at a fixture tree.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        Self {
            root: root.into(),
            page_size: if page_size > 0 { page_size as u64 } else { 4096 },
        }
    }

    fn proc_path(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    fn read_proc_file(&self, pid: u32, name: &str) -> Result<String, ProbeError> {
        fs::read_to_string(self.proc_path(pid).join(name)).map_err(|e| classify_io(pid, e))
    }

    /// Parses `/proc/<pid>/stat` into (parent pid, run state).
    fn read_stat(&self, pid: u32) -> Result<(u32, char), ProbeError> {
        let raw = self.read_proc_file(pid, "stat")?;
        parse_stat_line(&raw).ok_or_else(|| ProbeError::Malformed {
            pid,
            reason: "unparseable stat line".into(),
        })
    }
}

impl Default for ProcfsTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for ProcfsTable {
    fn pids(&self) -> Vec<u32> {
        let mut out = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = match name.to_str() {
                    Some(v) => v,
                    None => continue,
                };
                if !name.chars().all(|c| c.is_ascii_digit()) {
                    continue;
                }
                if let Ok(pid) = name.parse() {
                    out.push(pid);
                }
            }
        }
        out
    }

    fn parent(&self, pid: u32) -> Result<u32, ProbeError> {
        let (ppid, _) = self.read_stat(pid)?;
        Ok(ppid)
    }

    fn memory(&self, pid: u32) -> Result<MemoryInfo, ProbeError> {
        let (_, state) = self.read_stat(pid)?;
        if state == 'Z' {
            return Err(ProbeError::Zombie(pid));
        }
        let raw = self.read_proc_file(pid, "statm")?;
        parse_statm(&raw, self.page_size).ok_or_else(|| ProbeError::Malformed {
            pid,
            reason: "unparseable statm line".into(),
        })
    }

    fn command(&self, pid: u32) -> Result<String, ProbeError> {
        let cmdline = fs::read(self.proc_path(pid).join("cmdline"))
            .map_err(|e| classify_io(pid, e))?;
        if let Some(first) = cmdline.split(|&b| b == 0u8).next() {
            if !first.is_empty() {
                if let Ok(token) = std::str::from_utf8(first) {
                    return Ok(base_name(token));
                }
            }
        }
        // Kernel threads have an empty cmdline; comm still names them.
        let comm = self.read_proc_file(pid, "comm")?;
        Ok(comm.trim().to_string())
    }

    fn user(&self, pid: u32) -> Result<String, ProbeError> {
        let status = self.read_proc_file(pid, "status")?;
        let uid = parse_status_uid(&status).ok_or_else(|| ProbeError::Malformed {
            pid,
            reason: "missing Uid line in status".into(),
        })?;
        match User::from_uid(Uid::from_raw(uid)) {
            Ok(Some(u)) => Ok(u.name),
            // Unmapped uid (e.g. inside a container): report it numerically.
            _ => Ok(uid.to_string()),
        }
    }
}

/// Maps per-process io errors onto the transient taxonomy.
fn classify_io(pid: u32, e: std::io::Error) -> ProbeError {
    match e.kind() {
        ErrorKind::NotFound => ProbeError::Vanished(pid),
        ErrorKind::PermissionDenied => ProbeError::AccessDenied(pid),
        _ => ProbeError::Io(e),
    }
}

/// Parses the seven page counts of a statm line into a byte-valued record.
///
/// Field order is documented in proc(5): size resident shared text lib data dt.
pub fn parse_statm(raw: &str, page_size: u64) -> Option<MemoryInfo> {
    let mut fields = raw.split_whitespace().map(|f| f.parse::<u64>());
    let mut next = || fields.next()?.ok();
    let vms = next()? * page_size;
    let rss = next()? * page_size;
    let shared = next()? * page_size;
    let text = next()? * page_size;
    let lib = next()? * page_size;
    let data = next()? * page_size;
    let dirty = next()? * page_size;
    Some(MemoryInfo {
        rss,
        vms,
        shared,
        text,
        lib,
        data,
        dirty,
    })
}

/// Extracts (ppid, state) from a `/proc/<pid>/stat` line.
///
/// The comm field is parenthesized and may itself contain spaces or
/// parentheses, so fields are taken after the *last* closing paren.
pub fn parse_stat_line(raw: &str) -> Option<(u32, char)> {
    let rest = &raw[raw.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let state = fields.next()?.chars().next()?;
    let ppid = fields.next()?.parse().ok()?;
    Some((ppid, state))
}

/// Real uid from the `Uid:` line of `/proc/<pid>/status`.
pub fn parse_status_uid(status: &str) -> Option<u32> {
    for line in status.lines() {
        if let Some(v) = line.strip_prefix("Uid:") {
            return v.split_whitespace().next()?.parse().ok();
        }
    }
    None
}

/// Base name of a command token (strips any directory prefix).
fn base_name(token: &str) -> String {
    Path::new(token)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(token)
        .to_string()
}
