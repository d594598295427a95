use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::color::{self, emoji};
use crate::config::AgentSettings;
use crate::state::AgentRole;

use super::cli::CliTool;
use super::{Agent, AgentResponse, InputSource, InvokeContext};

/// Repository analysis through a large-context CLI (`gemini` by default).
pub struct ContextAgent {
    tool: CliTool,
    input: Arc<dyn InputSource>,
}

impl ContextAgent {
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

impl Agent for ContextAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Context
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
            objective = context.objective.as_deref().unwrap_or(""),
            timeout_secs = self.tool.settings().timeout_secs,
            "invoking context agent"
        );
        println!(
            "\n{} Invoking {} CLI for context analysis...",
            emoji::SEARCH,
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
    fn unavailable_tool_falls_back_to_operator() {
        let input = Arc::new(ScriptedInput::new(["summary from operator"]));
        let agent = ContextAgent::new(
            Path::new("."),
            AgentSettings::new("vibe-test-no-gemini", 300),
            Duration::from_secs(5),
            input.clone(),
        );

        assert!(!agent.is_available());
        let response = agent.invoke("analyze", &InvokeContext::for_objective("Add auth"));
        assert!(response.success);
        assert_eq!(response.output, "summary from operator");
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn operator_can_skip_context_analysis() {
        let input = Arc::new(ScriptedInput::new(["skip"]));
        let agent = ContextAgent::new(
            Path::new("."),
            AgentSettings::new("vibe-test-no-gemini", 300),
            Duration::from_secs(5),
            input,
        );

        let response = agent.invoke("analyze", &InvokeContext::default());
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(SKIPPED_MESSAGE));
    }
}
