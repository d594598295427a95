use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::color::{self, emoji};
use crate::config::AgentSettings;
use crate::state::AgentRole;

use super::cli::CliTool;
use super::{Agent, AgentResponse, InputSource, InvokeContext};

/// Task execution through a coding CLI (`codex` by default).
pub struct ExecAgent {
    tool: CliTool,
    input: Arc<dyn InputSource>,
}

impl ExecAgent {
    pub fn new(
        project_root: &Path,
        settings: AgentSettings,
        probe_timeout: Duration,
        input: Arc<dyn InputSource>,
    ) -> Self {
        Self {
            tool: CliTool::new(project_root, settings, probe_timeout),
            input,
        }
    }
}

impl Agent for ExecAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Exec
    }

    fn is_available(&self) -> bool {
        self.tool.is_available()
    }

    fn invoke(&self, prompt: &str, context: &InvokeContext) -> AgentResponse {
        if !self.is_available() {
            println!(
                "\n{}",
                color::warning(&format!(
                    "{}  {} CLI not available. Using manual fallback.",
                    emoji::WARNING,
                    self.tool.command()
                ))
            );
            return self.manual_fallback(prompt);
        }

        info!(
            command = self.tool.command(),
            task_id = context.task_id.as_deref().unwrap_or(""),
            timeout_secs = self.tool.settings().timeout_secs,
            "invoking exec agent"
        );
        println!(
            "\n{}  Invoking {} CLI for execution...",
            emoji::GEAR,
            self.tool.command()
        );
        self.tool.run(prompt)
    }

    fn input(&self) -> &dyn InputSource {
        self.input.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ScriptedInput, SKIPPED_MESSAGE};

    #[test]
    fn unavailable_exec_tool_and_skip_yields_failure() {
        let input = Arc::new(ScriptedInput::new(["skip"]));
        let agent = ExecAgent::new(
            Path::new("."),
            AgentSettings::new("vibe-test-no-codex", 600),
            Duration::from_secs(5),
            input,
        );

        let response = agent.invoke("do the task", &InvokeContext::for_task("task-001"));
        assert!(!response.success);
        assert!(response.output.is_empty());
        assert_eq!(response.error.as_deref(), Some(SKIPPED_MESSAGE));
    }

    #[cfg(unix)]
    #[test]
    fn available_exec_tool_runs_prompt() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fake-codex.sh");
        fs::write(&path, "#!/bin/sh\n[ \"$1\" = \"--version\" ] && exit 0\necho \"done: $2\"\n")
            .unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();

        let agent = ExecAgent::new(
            tmp.path(),
            AgentSettings::new(path.to_string_lossy(), 10),
            Duration::from_secs(5),
            Arc::new(ScriptedInput::default()),
        );

        assert!(agent.is_available());
        let response = agent.invoke("build it", &InvokeContext::for_task("task-001"));
        assert!(response.success, "unexpected: {:?}", response);
        assert_eq!(response.output, "done: build it\n");
    }
}
