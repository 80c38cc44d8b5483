//! Foreground filter engine.
//!
//! Three independently optional predicates (command name, owning user,
//! ancestry) combined under a single global AND/OR switch decide whether a
//! process's sample counts toward the foreground population.

use crate::ancestry::is_descendant_of;
use crate::process::ProcessTable;

/// Combine mode for the three filter axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineMode {
    /// Every configured predicate must match.
    #[default]
    And,
    /// Any configured predicate may match.
    Or,
}

/// Filter configuration. Built once before the sampling loop starts and
/// read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Exact, case-sensitive command base names. Empty = unset.
    pub commands: Vec<String>,
    /// Owning user names. Empty = unset.
    pub users: Vec<String>,
    /// Ancestor pid for the ancestry predicate. 0 = unset.
    pub ancestor_pid: u32,
    pub mode: CombineMode,
}

impl FilterConfig {
    /// True when no filter axis is configured at all.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.users.is_empty() && self.ancestor_pid == 0
    }

    // An unset predicate answers the combine-mode flag itself (true in AND
    // mode, false in OR mode) rather than the conventional neutral element.
    // Longstanding observed behavior; the combination logic below and the
    // unset_predicate_returns_combine_flag test are written against it.
    fn unset(&self) -> bool {
        self.mode == CombineMode::And
    }

    /// Command predicate: base name of the first command-line token against
    /// the configured set.
    pub fn matches_command(&self, command: &str) -> bool {
        if self.commands.is_empty() {
            return self.unset();
        }
        self.commands.iter().any(|c| c == command)
    }

    /// User predicate: process owner against the configured set.
    pub fn matches_user(&self, user: &str) -> bool {
        if self.users.is_empty() {
            return self.unset();
        }
        self.users.iter().any(|u| u == user)
    }

    /// Ancestry predicate: descent from the configured ancestor pid.
    pub fn matches_ancestry<T: ProcessTable>(&self, table: &T, pid: u32) -> bool {
        if self.ancestor_pid == 0 {
            return self.unset();
        }
        is_descendant_of(table, pid, self.ancestor_pid)
    }

    /// Combined verdict for one process. Fully unconfigured = permissive.
    pub fn matches<T: ProcessTable>(&self, table: &T, pid: u32, command: &str, user: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let by_command = self.matches_command(command);
        let by_user = self.matches_user(user);
        let by_ancestry = self.matches_ancestry(table, pid);
        match self.mode {
            CombineMode::And => by_command && by_user && by_ancestry,
            CombineMode::Or => by_command || by_user || by_ancestry,
        }
    }
}
