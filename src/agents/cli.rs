use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use crate::config::AgentSettings;
use crate::process::run_with_timeout;

use super::AgentResponse;

/// One external CLI: `<command> --version` to probe,
/// `<command> <args..> --prompt <text>` to run.
#[derive(Debug, Clone)]
pub(super) struct CliTool {
    settings: AgentSettings,
    project_root: PathBuf,
    probe_timeout: Duration,
}

impl CliTool {
    pub(super) fn new(project_root: &Path, settings: AgentSettings, probe_timeout: Duration) -> Self {
        Self {
            settings,
            project_root: project_root.to_path_buf(),
            probe_timeout,
        }
    }

    pub(super) fn command(&self) -> &str {
        &self.settings.command
    }

    pub(super) fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Spawn failure, timeout and non-zero exit all mean unavailable.
    pub(super) fn is_available(&self) -> bool {
        let mut cmd = Command::new(&self.settings.command);
        cmd.arg("--version").current_dir(&self.project_root);
        match run_with_timeout(&mut cmd, self.probe_timeout) {
            Ok(output) => output.success(),
            Err(err) => {
                debug!(command = %self.settings.command, error = %err, "availability probe failed");
                false
            }
        }
    }

    /// Run the tool with `prompt`, mapping the outcome onto a response.
    pub(super) fn run(&self, prompt: &str) -> AgentResponse {
        let mut cmd = Command::new(&self.settings.command);
        cmd.args(&self.settings.args)
            .arg("--prompt")
            .arg(prompt)
            .current_dir(&self.project_root);

        match run_with_timeout(&mut cmd, self.settings.timeout()) {
            Ok(output) if output.success() => AgentResponse::success(output.stdout),
            Ok(output) => AgentResponse::failure_with_output(output.stdout, output.stderr),
            Err(err) => AgentResponse::failure(err.to_string()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    use super::*;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn tool(dir: &Path, command: String, timeout_secs: u64) -> CliTool {
        CliTool::new(
            dir,
            AgentSettings::new(command, timeout_secs),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn probe_missing_command_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let tool = tool(tmp.path(), "vibe-test-missing-tool".to_string(), 5);
        assert!(!tool.is_available());
    }

    #[test]
    fn probe_non_zero_exit_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let command = script(tmp.path(), "broken.sh", "exit 1");
        assert!(!tool(tmp.path(), command, 5).is_available());
    }

    #[test]
    fn run_passes_prompt_flag_and_captures_stdout() {
        let tmp = TempDir::new().unwrap();
        let command = script(tmp.path(), "echo.sh", "echo \"$1:$2\"");
        let response = tool(tmp.path(), command, 5).run("hello world");
        assert!(response.success);
        assert_eq!(response.output, "--prompt:hello world\n");
    }

    #[test]
    fn run_non_zero_exit_maps_stderr_to_error() {
        let tmp = TempDir::new().unwrap();
        let command = script(tmp.path(), "fail.sh", "echo partial; echo broken >&2; exit 2");
        let response = tool(tmp.path(), command, 5).run("x");
        assert!(!response.success);
        assert_eq!(response.output, "partial\n");
        assert_eq!(response.error.as_deref(), Some("broken\n"));
    }

    #[test]
    fn run_timeout_is_a_failure_response() {
        let tmp = TempDir::new().unwrap();
        let command = script(tmp.path(), "slow.sh", "sleep 30");
        let response = tool(tmp.path(), command, 1).run("x");
        assert!(!response.success);
        assert!(response.error_text().contains("timed out after 1 seconds"));
    }
}
