//! Subprocess plumbing for agent CLIs.
//!
//! Children run in their own process group so a timeout or Ctrl+C can take
//! down everything they spawned. Output is drained on background threads
//! while the caller polls with a hard deadline.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::agents::AgentError;
use crate::process_registry::PROCESS_REGISTRY;
use crate::shutdown;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Minimum wait for the output pipes to close after the child exits.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Spawn a command in a new process group when supported.
#[cfg(unix)]
pub fn spawn_in_new_process_group(cmd: &mut Command) -> io::Result<Child> {
    use std::os::unix::process::CommandExt;

    unsafe {
        cmd.pre_exec(|| {
            libc::setpgid(0, 0);
            Ok(())
        });
    }

    cmd.spawn()
}

#[cfg(windows)]
pub fn spawn_in_new_process_group(cmd: &mut Command) -> io::Result<Child> {
    cmd.spawn()
}

/// Kill a process and all its children (process group).
#[cfg(unix)]
pub fn kill_process_tree(pid: u32) {
    let pgid = -(pid as i32);

    // SIGTERM first, then SIGKILL whatever is left.
    unsafe {
        libc::kill(pgid, libc::SIGTERM);
    }
    thread::sleep(Duration::from_millis(100));
    unsafe {
        libc::kill(pgid, libc::SIGKILL);
    }
}

#[cfg(windows)]
pub fn kill_process_tree(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .status();
}

/// Read `source` to EOF on a detached thread.
///
/// A descendant that escaped the process group can hold the pipe open
/// forever, so callers wait on the receiver with a bound instead of joining.
fn drain<R: Read + Send + 'static>(source: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn collect(rx: &Receiver<String>, wait: Duration, stream: &str, program: &str) -> String {
    rx.recv_timeout(wait).unwrap_or_else(|_| {
        warn!(command = %program, stream, "output pipe still open after exit, dropping it");
        String::new()
    })
}

/// Run `cmd` to completion, killing its process group after `timeout`.
///
/// Stdin is closed. The child's PID is registered with the global process
/// registry for its lifetime so the Ctrl+C handler can reach it. A pending
/// shutdown request also kills the child.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<CommandOutput, AgentError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = spawn_in_new_process_group(cmd).map_err(|source| AgentError::Spawn {
        command: program.clone(),
        source,
    })?;
    let pid = child.id();
    PROCESS_REGISTRY.register(pid);
    debug!(command = %program, pid, timeout_secs = timeout.as_secs(), "spawned agent process");

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let start = Instant::now();

    let outcome = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    warn!(command = %program, pid, "agent process timed out, killing process group");
                    kill_process_tree(pid);
                    let _ = child.wait();
                    break Err(AgentError::Timeout {
                        command: program.clone(),
                        secs: timeout.as_secs(),
                    });
                }
                if shutdown::requested() {
                    kill_process_tree(pid);
                    let _ = child.wait();
                    break Err(AgentError::Interrupted {
                        command: program.clone(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                kill_process_tree(pid);
                let _ = child.wait();
                break Err(AgentError::Wait {
                    command: program.clone(),
                    source,
                });
            }
        }
    };
    PROCESS_REGISTRY.unregister(pid);

    // On failure the drain threads are left to finish on their own.
    let status = outcome?;
    let wait = timeout.saturating_sub(start.elapsed()).max(DRAIN_GRACE);
    let stdout = collect(&stdout, wait, "stdout", &program);
    let stderr = collect(&stderr, DRAIN_GRACE, "stderr", &program);
    debug!(command = %program, pid, code = ?status.code(), "agent process exited");

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn spawn_creates_new_process_group() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = spawn_in_new_process_group(&mut cmd).expect("spawn sleep");
        let pid = child.id() as i32;

        let pgid = unsafe { libc::getpgid(pid) };
        assert_eq!(pgid, pid);

        let _ = child.kill();
        let _ = child.wait();
    }

    #[cfg(unix)]
    #[test]
    fn kill_process_tree_terminates_process_group() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut child = spawn_in_new_process_group(&mut cmd).expect("spawn sleep");

        kill_process_tree(child.id());

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    assert!(
                        start.elapsed() < Duration::from_secs(2),
                        "process still running after kill_process_tree"
                    );
                    thread::sleep(Duration::from_millis(20));
                }
                Err(err) => panic!("try_wait failed: {}", err),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_captures_both_streams() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);

        let output = run_with_timeout(&mut cmd, Duration::from_secs(5)).unwrap();
        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_kills_sleeping_child() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");

        let start = Instant::now();
        let err = run_with_timeout(&mut cmd, Duration::from_millis(300)).unwrap_err();
        assert!(matches!(err, AgentError::Timeout { .. }), "unexpected: {:?}", err);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_returns_when_grandchild_holds_pipe() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "setsid sleep 6 & sleep 30"]);

        let start = Instant::now();
        let err = run_with_timeout(&mut cmd, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, AgentError::Timeout { .. }), "unexpected: {:?}", err);
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "timeout waited {:?} for an escaped grandchild",
            start.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_bounds_wait_after_exit() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo done; setsid sleep 6 & exit 0"]);

        let start = Instant::now();
        let output = run_with_timeout(&mut cmd, Duration::from_secs(1)).unwrap();
        assert!(output.success());
        assert!(start.elapsed() < Duration::from_secs(3), "waited {:?}", start.elapsed());
    }

    #[test]
    fn run_with_timeout_reports_missing_program() {
        let mut cmd = Command::new("vibe-test-no-such-program");
        let err = run_with_timeout(&mut cmd, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, AgentError::Spawn { .. }));
    }
}
