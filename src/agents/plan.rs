use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::color::{self, emoji};
use crate::config::AgentSettings;
use crate::state::AgentRole;

use super::cli::CliTool;
use super::{Agent, AgentResponse, InputSource, InvokeContext};

/// Output of a plan invocation: the plan itself is written by the operator's
/// interactive session, not captured here.
pub const PLAN_DELIVERED: &str = "Prompt delivered for manual completion";

/// Planning through an interactive CLI session (`claude` by default).
///
/// The tool is only probed. When present, the prompt is printed for the
/// operator to paste into their own session.
pub struct PlanAgent {
    tool: CliTool,
    input: Arc<dyn InputSource>,
}

impl PlanAgent {
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

impl Agent for PlanAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Plan
    }

    fn is_available(&self) -> bool {
        self.tool.is_available()
    }

    fn invoke(&self, prompt: &str, _context: &InvokeContext) -> AgentResponse {
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

        info!(command = self.tool.command(), "delivering plan prompt");
        println!();
        println!(
            "{}",
            color::banner(&format!(
                "{} PROMPT (paste into your {} session)",
                self.tool.command().to_uppercase(),
                self.tool.command()
            ))
        );
        println!("{}", prompt);
        println!("{}", "=".repeat(80));

        AgentResponse::success(PLAN_DELIVERED)
    }

    fn input(&self) -> &dyn InputSource {
        self.input.as_ref()
    }
}
