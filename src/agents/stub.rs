use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::state::AgentRole;

use super::{Agent, AgentResponse, InputSource, InvokeContext};

/// Stub agent for dry runs and tests.
///
/// Always available. Produces deterministic output and, when given an
/// output directory, writes it to `<role>-<subject>.md` there.
pub struct StubAgent {
    role: AgentRole,
    input: Arc<dyn InputSource>,
    output_dir: Option<PathBuf>,
}

impl StubAgent {
    pub fn new(role: AgentRole, input: Arc<dyn InputSource>) -> Self {
        Self {
            role,
            input,
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    fn subject(context: &InvokeContext) -> &str {
        context.task_id.as_deref().unwrap_or("output")
    }

    fn content(&self, prompt: &str, context: &InvokeContext) -> String {
        let words = prompt.split_whitespace().count();
        match self.role {
            AgentRole::Context => format!(
                "# Context Summary (stub)\n\nObjective: {}\nPrompt words: {}\n\nOK\n",
                context.objective.as_deref().unwrap_or(""),
                words
            ),
            AgentRole::Plan => super::PLAN_DELIVERED.to_string(),
            AgentRole::Exec => format!(
                "# Stub Output\n\nAgent: {}\nTask: {}\nPrompt words: {}\n\nOK\n",
                self.role,
                Self::subject(context),
                words
            ),
        }
    }
}

impl Agent for StubAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn is_available(&self) -> bool {
        true
    }

    fn invoke(&self, prompt: &str, context: &InvokeContext) -> AgentResponse {
        let content = self.content(prompt, context);
        let Some(ref dir) = self.output_dir else {
            return AgentResponse::success(content);
        };

        if let Err(e) = fs::create_dir_all(dir) {
            return AgentResponse::failure(format!("failed to create output dir: {}", e));
        }
        let path = dir.join(format!("{}-{}.md", self.role, Self::subject(context)));
        match fs::write(&path, &content) {
            Ok(()) => AgentResponse::success(content).with_artifact(path),
            Err(e) => AgentResponse::failure(format!("failed to write output: {}", e)),
        }
    }

    fn input(&self) -> &dyn InputSource {
        self.input.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::ScriptedInput;
    use tempfile::TempDir;

    fn stub(role: AgentRole) -> StubAgent {
        StubAgent::new(role, Arc::new(ScriptedInput::default()))
    }

    #[test]
    fn test_stub_exec_is_deterministic() {
        let agent = stub(AgentRole::Exec);
        let ctx = InvokeContext::for_task("task-001");

        let first = agent.invoke("Write tests", &ctx);
        let second = agent.invoke("Write tests", &ctx);
        assert!(first.success);
        assert!(first.output.contains("Task: task-001"));
        assert!(first.output.contains("OK"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_stub_plan_matches_real_plan_agent_output() {
        let response = stub(AgentRole::Plan).invoke("plan", &InvokeContext::default());
        assert_eq!(response.output, crate::agents::PLAN_DELIVERED);
    }

    #[test]
    fn test_stub_writes_artifact_when_output_dir_set() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("stub");
        let agent = stub(AgentRole::Exec).with_output_dir(&out);

        let response = agent.invoke("Task", &InvokeContext::for_task("task-002"));
        assert!(response.success);
        let expected = out.join("exec-agent-task-002.md");
        assert_eq!(response.artifacts, vec![expected.clone()]);
        assert_eq!(fs::read_to_string(expected).unwrap(), response.output);
    }

    #[test]
    fn test_stub_is_always_available() {
        for role in AgentRole::ALL {
            let agent = stub(role);
            assert!(agent.is_available());
            assert_eq!(agent.role(), role);
        }
    }
}
