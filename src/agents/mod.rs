//! Agent adapters over external AI command-line tools.
//!
//! Three roles drive a sprint:
//! - context agent (`gemini` by default): repository analysis, real subprocess
//! - plan agent (`claude` by default): prompt handed to an interactive session
//! - exec agent (`codex` by default): task execution, real subprocess
//!
//! Every adapter falls back to a manual copy/paste round trip with the
//! operator when its tool is missing. `stub` replaces all three with
//! deterministic output for dry runs and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::handoff::excerpt;
use crate::prompt::PromptLibrary;
use crate::state::{AgentRole, Task};
use crate::color;

mod cli;
mod context;
mod exec;
mod input;
mod plan;
mod stub;

pub use context::ContextAgent;
pub use exec::ExecAgent;
pub use input::{InputSource, ScriptedInput, StdinInput};
pub use plan::{PlanAgent, PLAN_DELIVERED};
pub use stub::StubAgent;

/// Error text for a manual fallback the operator declined.
pub const SKIPPED_MESSAGE: &str = "User skipped manual invocation";

/// Characters of the plan included in the verification prompt.
const VERIFY_PLAN_EXCERPT_CHARS: usize = 2000;

/// Subprocess failures. Adapters turn these into failed responses.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("failed to invoke {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },
    #[error("failed to wait for {command}: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} was interrupted")]
    Interrupted { command: String },
    #[error("agent I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Response from an agent invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentResponse {
    pub success: bool,
    /// Stdout for real tools, operator input for manual fallbacks.
    pub output: String,
    /// Files the agent produced.
    pub artifacts: Vec<PathBuf>,
    pub error: Option<String>,
}

impl AgentResponse {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Failure that keeps whatever the tool printed to stdout.
    pub fn failure_with_output(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifacts.push(path);
        self
    }

    /// Error text, or a generic placeholder when the tool gave none.
    pub fn error_text(&self) -> &str {
        match self.error.as_deref() {
            Some(err) if !err.trim().is_empty() => err,
            _ => "unknown error",
        }
    }
}

/// What an invocation is about. Adapters may use it for logging and
/// artifact naming; the prompt carries the real instructions.
#[derive(Debug, Clone, Default)]
pub struct InvokeContext {
    pub objective: Option<String>,
    pub task_id: Option<String>,
}

impl InvokeContext {
    pub fn for_objective(objective: &str) -> Self {
        Self {
            objective: Some(objective.to_string()),
            task_id: None,
        }
    }

    pub fn for_task(task_id: &str) -> Self {
        Self {
            objective: None,
            task_id: Some(task_id.to_string()),
        }
    }
}

/// An external AI tool driven over its command line.
pub trait Agent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Probe the tool. Never panics; any failure means unavailable.
    fn is_available(&self) -> bool;

    fn invoke(&self, prompt: &str, context: &InvokeContext) -> AgentResponse;

    /// Where manual fallbacks read operator input from.
    fn input(&self) -> &dyn InputSource;

    /// Show the prompt and take the result from the operator instead.
    fn manual_fallback(&self, prompt: &str) -> AgentResponse {
        manual_fallback(self.input(), prompt)
    }
}

/// Print `prompt` and block for one line of operator input.
///
/// `skip` (any case) or end of input yields a failed response.
pub fn manual_fallback(input: &dyn InputSource, prompt: &str) -> AgentResponse {
    println!();
    println!("{}", color::banner("MANUAL INVOCATION REQUIRED"));
    println!("{}", prompt);
    println!("{}", "=".repeat(80));
    println!("\nExecute the above prompt manually and paste the result.");
    println!("Press Enter when done (or 'skip' to skip this step):");

    match input.read_line("") {
        Ok(Some(line)) => {
            let line = line.trim();
            if line.eq_ignore_ascii_case("skip") {
                AgentResponse::failure(SKIPPED_MESSAGE)
            } else {
                AgentResponse::success(line)
            }
        }
        Ok(None) => AgentResponse::failure(SKIPPED_MESSAGE),
        Err(err) => AgentResponse::failure(AgentError::Io(err).to_string()),
    }
}

/// Fallback verification prompt used when `made_verifier.md` is absent.
const VERIFY_TEMPLATE: &str = r#"# Architectural Verification

You are reviewing the implementation against the original plan.

## Original Plan
```markdown
{{plan_excerpt}}
```

## Your Task
Review the git diff and verify:
1. **Architectural Intent** - Does the implementation follow the planned architecture?
2. **Pattern Consistency** - Are existing patterns maintained?
3. **Scope Adherence** - Is the implementation within the planned scope?
4. **Technical Debt** - Any shortcuts taken that need addressing?

Run `git diff main` to see all changes, then provide:

### Verification Report
- [ ] Architectural intent maintained
- [ ] Patterns consistent
- [ ] Scope appropriate
- [ ] No critical technical debt

### Issues Found
[List any deviations or concerns]

### Recommendations
[Suggestions for improvement or follow-up tasks]
"#;

/// The three adapters a sprint uses, plus the prompt templates they share.
pub struct AgentSet {
    context: Box<dyn Agent>,
    plan: Box<dyn Agent>,
    exec: Box<dyn Agent>,
    prompts: PromptLibrary,
    project_root: PathBuf,
}

impl AgentSet {
    pub fn new(
        context: Box<dyn Agent>,
        plan: Box<dyn Agent>,
        exec: Box<dyn Agent>,
        prompts: PromptLibrary,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            context,
            plan,
            exec,
            prompts,
            project_root: project_root.into(),
        }
    }

    /// Build the configured adapters, or three stubs in stub mode.
    pub fn from_config(config: &Config, input: Arc<dyn InputSource>) -> Self {
        let root = config.project_root.as_path();
        let prompts = PromptLibrary::for_project(root, Some(Path::new(&config.files_prompts)));

        if config.agents_stub_mode {
            let out = config.session_logs_dir().join("stub");
            let stub = |role| -> Box<dyn Agent> {
                Box::new(StubAgent::new(role, Arc::clone(&input)).with_output_dir(out.clone()))
            };
            return Self::new(
                stub(AgentRole::Context),
                stub(AgentRole::Plan),
                stub(AgentRole::Exec),
                prompts,
                root,
            );
        }

        let probe = config.probe_timeout();
        Self::new(
            Box::new(ContextAgent::new(
                root,
                config.agents_context.clone(),
                probe,
                Arc::clone(&input),
            )),
            Box::new(PlanAgent::new(
                root,
                config.agents_plan.clone(),
                probe,
                Arc::clone(&input),
            )),
            Box::new(ExecAgent::new(root, config.agents_exec.clone(), probe, input)),
            prompts,
            root,
        )
    }

    pub fn agent(&self, role: AgentRole) -> &dyn Agent {
        match role {
            AgentRole::Context => self.context.as_ref(),
            AgentRole::Plan => self.plan.as_ref(),
            AgentRole::Exec => self.exec.as_ref(),
        }
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    /// Ask the context agent to analyze the repository for `objective`.
    pub fn analyze_context(&self, objective: &str) -> AgentResponse {
        let mut vars = HashMap::new();
        vars.insert("objective", objective.to_string());
        vars.insert("repo_path", self.project_root.display().to_string());
        let prompt = self.prompts.load_and_render("made_librarian", &vars);
        self.context
            .invoke(&prompt, &InvokeContext::for_objective(objective))
    }

    /// Hand the architect prompt to the plan agent.
    pub fn plan(&self, objective: &str, context_summary: &str) -> AgentResponse {
        let mut vars = HashMap::new();
        vars.insert("objective", objective.to_string());
        vars.insert("context_summary", context_summary.to_string());
        let prompt = self.prompts.load_and_render("made_architect", &vars);
        self.plan.invoke(&prompt, &InvokeContext::for_objective(objective))
    }

    /// Run one task through the exec agent.
    pub fn execute_task(&self, task: &Task, handoff_packet: &str) -> AgentResponse {
        let mut vars = HashMap::new();
        vars.insert("task_title", task.title.clone());
        vars.insert("task_description", task.description.clone());
        vars.insert("handoff_packet", handoff_packet.to_string());
        let prompt = self.prompts.load_and_render("made_executor", &vars);
        self.exec.invoke(&prompt, &InvokeContext::for_task(&task.id))
    }

    /// Deliver an architectural review prompt through the plan agent.
    pub fn verify(&self, plan_content: &str) -> AgentResponse {
        let prompt = self.verify_prompt(plan_content);
        self.plan.invoke(&prompt, &InvokeContext::default())
    }

    pub fn verify_prompt(&self, plan_content: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert(
            "plan_excerpt",
            excerpt(plan_content, VERIFY_PLAN_EXCERPT_CHARS).to_string(),
        );
        match self.prompts.template_path("made_verifier") {
            Some(_) => self.prompts.load_and_render("made_verifier", &vars),
            None => crate::prompt::render(VERIFY_TEMPLATE, &vars),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    /// Records prompts and replies with a fixed response.
    struct RecordingAgent {
        role: AgentRole,
        input: ScriptedInput,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingAgent {
        fn boxed(role: AgentRole) -> Box<Self> {
            Box::new(Self {
                role,
                input: ScriptedInput::default(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl Agent for RecordingAgent {
        fn role(&self) -> AgentRole {
            self.role
        }
        fn is_available(&self) -> bool {
            true
        }
        fn invoke(&self, prompt: &str, _context: &InvokeContext) -> AgentResponse {
            self.prompts.lock().unwrap().push(prompt.to_string());
            AgentResponse::success(prompt)
        }
        fn input(&self) -> &dyn InputSource {
            &self.input
        }
    }

    fn agent_set(prompts_dir: &Path) -> AgentSet {
        AgentSet::new(
            RecordingAgent::boxed(AgentRole::Context),
            RecordingAgent::boxed(AgentRole::Plan),
            RecordingAgent::boxed(AgentRole::Exec),
            PromptLibrary::new(prompts_dir),
            "/repo",
        )
    }

    #[test]
    fn test_manual_fallback_returns_operator_input() {
        let input = ScriptedInput::new(["  context pasted here  "]);
        let response = manual_fallback(&input, "Analyze the repo");
        assert!(response.success);
        assert_eq!(response.output, "context pasted here");
        assert!(response.error.is_none());
    }

    #[test]
    fn test_manual_fallback_skip_is_case_insensitive() {
        for answer in ["skip", "SKIP", " Skip "] {
            let input = ScriptedInput::new([answer]);
            let response = manual_fallback(&input, "prompt");
            assert!(!response.success);
            assert_eq!(response.error.as_deref(), Some(SKIPPED_MESSAGE));
        }
    }

    #[test]
    fn test_manual_fallback_eof_counts_as_skip() {
        let input = ScriptedInput::default();
        let response = manual_fallback(&input, "prompt");
        assert!(!response.success);
        assert!(response.error_text().contains("skipped"));
    }

    #[test]
    fn test_analyze_context_renders_librarian_template() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("made_librarian.md"),
            "Analyze {{repo_path}} for {{objective}}",
        )
        .unwrap();
        let agents = agent_set(tmp.path());

        let response = agents.analyze_context("Add auth");
        assert_eq!(response.output, "Analyze /repo for Add auth");
    }

    #[test]
    fn test_missing_templates_degrade_to_sentinel() {
        let tmp = TempDir::new().unwrap();
        let agents = agent_set(tmp.path());

        let response = agents.plan("Add auth", "summary");
        assert_eq!(
            response.output,
            "# Made Architect\n\n[Prompt template not found]"
        );
    }

    #[test]
    fn test_execute_task_passes_handoff_packet() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("made_executor.md"),
            "{{task_title}}|{{task_description}}|{{handoff_packet}}",
        )
        .unwrap();
        let agents = agent_set(tmp.path());
        let mut task = Task::new("task-001", "Build login form");
        task.description = "wire up form".to_string();

        let response = agents.execute_task(&task, "PACKET");
        assert_eq!(response.output, "Build login form|wire up form|PACKET");
    }

    #[test]
    fn test_verify_prompt_uses_builtin_template_and_truncates_plan() {
        let tmp = TempDir::new().unwrap();
        let agents = agent_set(tmp.path());
        let plan = "p".repeat(2500);

        let prompt = agents.verify_prompt(&plan);
        assert!(prompt.starts_with("# Architectural Verification"));
        assert!(prompt.contains(&"p".repeat(2000)));
        assert!(!prompt.contains(&"p".repeat(2001)));
        assert!(prompt.contains("- [ ] Architectural intent maintained"));
    }

    #[test]
    fn test_agent_lookup_by_role() {
        let tmp = TempDir::new().unwrap();
        let agents = agent_set(tmp.path());
        for role in AgentRole::ALL {
            assert_eq!(agents.agent(role).role(), role);
        }
    }

    #[test]
    fn test_response_error_text_placeholder() {
        assert_eq!(AgentResponse::failure("").error_text(), "unknown error");
        assert_eq!(AgentResponse::failure("boom").error_text(), "boom");
        assert!(AgentResponse::success("x").artifacts.is_empty());
    }
}
