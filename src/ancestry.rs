//! Parent-chain ancestry resolution.

use crate::process::ProcessTable;

/// Upper bound on parent-chain length. Linux pid namespaces keep real chains
/// far below this; the cap guards against a self-referential parent link.
const MAX_WALK_DEPTH: usize = 1024;

/// Walks pid → parent(pid) → … and reports whether `ancestor_pid` appears
/// on the chain. `is_descendant_of(pid, pid)` is trivially true.
///
/// A process that vanishes mid-walk cannot be confirmed as a descendant for
/// this sample, so the walk answers false rather than erroring.
pub fn is_descendant_of<T: ProcessTable>(table: &T, pid: u32, ancestor_pid: u32) -> bool {
    let mut current = pid;
    for _ in 0..MAX_WALK_DEPTH {
        if current == ancestor_pid {
            return true;
        }
        if current == 0 {
            return false;
        }
        current = match table.parent(current) {
            Ok(ppid) => ppid,
            Err(_) => return false,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{SyntheticProcess, SyntheticTable};

    fn chain_table() -> SyntheticTable {
        // 0 <- 1 <- 100 <- 200 <- 300
        SyntheticTable::new(vec![
            SyntheticProcess::new(1, 0, "init", "root", 1024),
            SyntheticProcess::new(100, 1, "daemon", "root", 1024),
            SyntheticProcess::new(200, 100, "worker", "alice", 1024),
            SyntheticProcess::new(300, 200, "helper", "alice", 1024),
        ])
    }

    #[test]
    fn test_self_is_descendant() {
        let table = chain_table();
        assert!(is_descendant_of(&table, 300, 300));
        assert!(is_descendant_of(&table, 1, 1));
    }

    #[test]
    fn test_walk_to_ancestor() {
        let table = chain_table();
        assert!(is_descendant_of(&table, 300, 100));
        assert!(is_descendant_of(&table, 300, 1));
        assert!(is_descendant_of(&table, 200, 100));
        assert!(!is_descendant_of(&table, 100, 200));
    }

    #[test]
    fn test_root_sentinel() {
        let table = chain_table();
        // Every normal chain terminates at pid 0.
        assert!(is_descendant_of(&table, 300, 0));
    }

    #[test]
    fn test_vanished_parent_is_not_a_descendant() {
        // 500's parent 400 is not in the table, so the walk cannot proceed.
        let table = SyntheticTable::new(vec![SyntheticProcess::new(500, 400, "orphan", "x", 1)]);
        assert!(!is_descendant_of(&table, 500, 1));
    }

    #[test]
    fn test_self_referential_parent_terminates() {
        let table = SyntheticTable::new(vec![SyntheticProcess::new(7, 7, "loop", "x", 1)]);
        assert!(!is_descendant_of(&table, 7, 1));
    }
}
