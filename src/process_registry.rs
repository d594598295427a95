//! PIDs of agent CLIs that are running right now.
//!
//! `process::run_with_timeout` adds each context, plan or exec agent run for
//! its lifetime. The Ctrl+C handler in `shutdown` stops them all before the
//! sprint pauses, so no agent keeps editing the tree after an interrupt.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tracing::debug;

/// Agent subprocesses started by this `vibe` invocation.
///
/// Every PID is also a process-group id, since agents are spawned as
/// group leaders.
#[derive(Default)]
pub struct AgentProcesses {
    pids: Mutex<HashSet<u32>>,
}

impl AgentProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves the set itself intact.
    fn lock(&self) -> MutexGuard<'_, HashSet<u32>> {
        self.pids.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, pid: u32) {
        self.lock().insert(pid);
    }

    /// Forget an agent once it has been reaped.
    pub fn unregister(&self, pid: u32) {
        self.lock().remove(&pid);
    }

    pub fn running_pids(&self) -> Vec<u32> {
        self.lock().iter().copied().collect()
    }

    /// Kill every registered agent's process group and forget it.
    ///
    /// Returns how many agents were stopped.
    pub fn stop_all(&self) -> usize {
        let pids: Vec<u32> = self.lock().drain().collect();
        for &pid in &pids {
            debug!(pid, "stopping agent process group");
            crate::process::kill_process_tree(pid);
        }
        pids.len()
    }
}

/// Agents visible to the Ctrl+C handler.
pub static PROCESS_REGISTRY: Lazy<AgentProcesses> = Lazy::new(AgentProcesses::new);

#[cfg(test)]
mod tests {
    use super::AgentProcesses;

    #[test]
    fn test_registry_tracks_running_agents() {
        let agents = AgentProcesses::new();

        agents.register(100);
        agents.register(200);
        agents.register(200);

        let mut pids = agents.running_pids();
        pids.sort_unstable();
        assert_eq!(pids, vec![100, 200]);

        agents.unregister(100);
        assert_eq!(agents.running_pids(), vec![200]);
    }

    #[test]
    fn test_stop_all_without_agents_is_a_no_op() {
        let agents = AgentProcesses::new();
        assert_eq!(agents.stop_all(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_all_kills_agent_process_group() {
        use crate::process::spawn_in_new_process_group;
        use std::process::{Command, Stdio};
        use std::thread;
        use std::time::{Duration, Instant};

        let agents = AgentProcesses::new();

        // Stands in for an agent CLI that spawned a helper of its own.
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 10 & wait"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = spawn_in_new_process_group(&mut cmd).expect("spawn fake agent");
        agents.register(child.id());

        assert_eq!(agents.stop_all(), 1);
        assert!(agents.running_pids().is_empty());

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    assert!(
                        start.elapsed() < Duration::from_secs(2),
                        "agent still running after stop_all"
                    );
                    thread::sleep(Duration::from_millis(20));
                }
                Err(err) => panic!("try_wait failed: {}", err),
            }
        }
    }
}
