//! Sprint workflow engine.
//!
//! Drives one sprint through its phases:
//!
//! 1. context: the context agent summarizes the repository
//! 2. planning: the plan agent gets the architect prompt; the operator
//!    writes the plan document and loads it with [`Sprint::load_plan`]
//! 3. execution: each pending task goes to the exec agent with a handoff
//!    packet
//! 4. verification (optional): the plan agent reviews the result
//!
//! Every status change goes through [`SprintStatus::can_transition_to`].
//! Phase methods report logical failures as [`PhaseOutcome::Failed`] and
//! leave the sprint status alone; only state or disk errors are `Err`.

mod estimate;
mod session_log;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::agents::{AgentResponse, AgentSet, InputSource};
use crate::color::{self, emoji};
use crate::config::Config;
use crate::handoff;
use crate::plan::parse_plan;
use crate::shutdown::ShutdownSignal;
use crate::state::{AgentRole, Severity, SprintStatus, StateError, StateStore, Task, TaskStatus};

pub use estimate::{TokenEstimator, WordCountEstimator};
pub use session_log::{Phase, SessionLog};

/// Result of a phase that ran to a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    /// The planning prompt is out; the plan document must be loaded next.
    AwaitingPlan,
    /// Execution stopped at a task boundary; resume with `exec`.
    Paused,
    Failed(String),
}

impl PhaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::AwaitingPlan)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error<'a>(
    action: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> WorkflowError + 'a {
    move |source| WorkflowError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// Contents of `path`, or an empty string if it is not there.
fn read_optional(path: Option<&str>) -> Result<String, WorkflowError> {
    match path.map(Path::new) {
        Some(path) if path.is_file() => {
            fs::read_to_string(path).map_err(io_error("read", path))
        }
        _ => Ok(String::new()),
    }
}

/// The sprint engine for one project.
pub struct Sprint {
    store: StateStore,
    agents: AgentSet,
    input: Arc<dyn InputSource>,
    shutdown: ShutdownSignal,
    estimator: Box<dyn TokenEstimator>,
    session_logs_dir: PathBuf,
    default_plan: PathBuf,
}

impl Sprint {
    pub fn new(config: &Config, agents: AgentSet, input: Arc<dyn InputSource>) -> Self {
        Self {
            store: StateStore::at(config.state_path()),
            agents,
            input,
            shutdown: ShutdownSignal::new(),
            estimator: Box::new(WordCountEstimator),
            session_logs_dir: config.session_logs_dir(),
            default_plan: config.plan_path(),
        }
    }

    /// Pause at the next task boundary once `signal` fires.
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = signal;
        self
    }

    pub fn with_estimator(mut self, estimator: Box<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn store(&mut self) -> &mut StateStore {
        &mut self.store
    }

    pub fn agents(&self) -> &AgentSet {
        &self.agents
    }

    fn handoffs_dir(&self) -> PathBuf {
        self.session_logs_dir.join("handoffs")
    }

    fn session_log(&mut self) -> Result<Option<SessionLog>, WorkflowError> {
        Ok(self
            .store
            .state()?
            .session_log
            .as_deref()
            .map(SessionLog::open))
    }

    fn log_phase(
        &mut self,
        phase: Phase,
        status: &str,
        detail: Option<&str>,
    ) -> Result<(), WorkflowError> {
        if let Some(log) = self.session_log()? {
            log.set_phase_status(phase, status, detail)
                .map_err(io_error("update", log.path()))?;
        }
        Ok(())
    }

    /// `Some(Failed)` when the sprint may not move to `target`.
    fn guard(&mut self, target: SprintStatus) -> Result<Option<PhaseOutcome>, WorkflowError> {
        let current = self.store.state()?.sprint.status;
        if current.can_transition_to(target) {
            return Ok(None);
        }
        warn!(from = %current, to = %target, "illegal sprint transition");
        println!(
            "{} Cannot move sprint from '{}' to '{}'.",
            emoji::CROSS,
            current,
            target
        );
        Ok(Some(PhaseOutcome::Failed(format!(
            "illegal transition from {} to {}",
            current, target
        ))))
    }

    fn set_status(&mut self, status: SprintStatus) -> Result<(), WorkflowError> {
        let state = self.store.state_mut()?;
        if state.sprint.status != status {
            info!(from = %state.sprint.status, to = %status, "sprint status");
        }
        state.sprint.status = status;
        self.store.save()?;
        Ok(())
    }

    fn objective(&mut self) -> Result<Option<String>, WorkflowError> {
        Ok(self
            .store
            .state()?
            .sprint
            .objective
            .clone()
            .filter(|o| !o.trim().is_empty()))
    }

    /// Begin a new sprint and create its session log.
    pub fn start(&mut self, objective: &str) -> Result<PhaseOutcome, WorkflowError> {
        let objective = objective.trim();
        if objective.is_empty() {
            println!("{} Sprint objective must not be empty.", emoji::CROSS);
            return Ok(PhaseOutcome::Failed("empty objective".to_string()));
        }
        if let Some(outcome) = self.guard(SprintStatus::ContextAnalysis)? {
            println!("Finish the current sprint or run 'vibe reset' first.");
            return Ok(outcome);
        }

        let sprint_id = self.store.start_sprint(objective)?;
        let log = SessionLog::create(&self.session_logs_dir, &sprint_id, objective)
            .map_err(io_error("create session log in", &self.session_logs_dir))?;
        self.store.state_mut()?.session_log = Some(log.path().display().to_string());
        self.store.save()?;

        info!(sprint_id = %sprint_id, "sprint started");
        println!("\n{} Sprint started: {}", emoji::CHECK, sprint_id);
        println!("{} Objective: {}", emoji::TASK, objective);
        Ok(PhaseOutcome::Completed)
    }

    /// Phase 1: repository analysis by the context agent.
    pub fn phase_1_context(&mut self) -> Result<PhaseOutcome, WorkflowError> {
        let started = Instant::now();
        println!("\n{}", color::banner("PHASE 1: CONTEXT ANALYSIS"));

        let Some(objective) = self.objective()? else {
            println!(
                "{} No active sprint. Run 'vibe sprint start' first.",
                emoji::CROSS
            );
            return Ok(PhaseOutcome::Failed("no active sprint".to_string()));
        };
        if let Some(outcome) = self.guard(SprintStatus::ContextAnalysis)? {
            return Ok(outcome);
        }

        self.set_status(SprintStatus::ContextAnalysis)?;
        self.store.record_agent_invocation(AgentRole::Context)?;

        let response = self.agents.analyze_context(&objective);
        let secs = started.elapsed().as_secs_f64();
        self.store.record_phase_time("context_analysis", secs)?;

        if !response.success {
            let error = response.error_text().to_string();
            println!("{} Context analysis failed: {}", emoji::CROSS, error);
            self.log_phase(Phase::Context, "failed", Some(&error))?;
            self.store.post_blocker(
                AgentRole::Context.as_str(),
                "phase-1",
                &format!("Context analysis failed: {}", error),
                Some(&error),
            )?;
            return Ok(PhaseOutcome::Failed(error));
        }

        let sprint_id = self.store.state()?.sprint.id.clone().unwrap_or_default();
        fs::create_dir_all(&self.session_logs_dir)
            .map_err(io_error("create", &self.session_logs_dir))?;
        let context_file = self
            .session_logs_dir
            .join(format!("{}_context.md", sprint_id));
        fs::write(&context_file, &response.output).map_err(io_error("write", &context_file))?;

        let context_path = context_file.display().to_string();
        self.store.state_mut()?.context.repo_summary_path = Some(context_path.clone());
        self.store.save()?;
        let tokens = self.estimator.estimate(&response.output);
        self.store.record_token_usage(AgentRole::Context, tokens)?;

        println!(
            "\n{} Context analysis complete: {}",
            emoji::CHECK,
            context_path
        );
        println!("{}  Duration: {:.1}s", emoji::TIMER, secs);
        self.log_phase(Phase::Context, "completed", Some(&context_path))?;
        Ok(PhaseOutcome::Completed)
    }

    /// Phase 2: hand the architect prompt to the plan agent.
    pub fn phase_2_plan(&mut self) -> Result<PhaseOutcome, WorkflowError> {
        let started = Instant::now();
        println!("\n{}", color::banner("PHASE 2: PLANNING"));

        let Some(objective) = self.objective()? else {
            println!(
                "{} No active sprint. Run 'vibe sprint start' first.",
                emoji::CROSS
            );
            return Ok(PhaseOutcome::Failed("no active sprint".to_string()));
        };
        let context_path = self.store.state()?.context.repo_summary_path.clone();
        let context_path = match context_path {
            Some(path) if Path::new(&path).is_file() => path,
            _ => {
                println!(
                    "{}  No context summary found. Run phase 1 first.",
                    emoji::WARNING
                );
                return Ok(PhaseOutcome::Failed("no context summary".to_string()));
            }
        };
        if let Some(outcome) = self.guard(SprintStatus::Planning)? {
            return Ok(outcome);
        }
        let context_summary = fs::read_to_string(&context_path)
            .map_err(io_error("read", Path::new(&context_path)))?;

        self.set_status(SprintStatus::Planning)?;
        self.store.record_agent_invocation(AgentRole::Plan)?;

        let blockers = self.store.unresolved_blockers()?;
        if !blockers.is_empty() {
            println!(
                "\n{}",
                color::warning(&format!(
                    "{}  WARNING: {} unresolved blockers from previous phases",
                    emoji::WARNING,
                    blockers.len()
                ))
            );
            println!("Consider addressing these before planning:");
            for blocker in blockers.iter().take(3) {
                println!("  - [{}] {}", blocker.agent, blocker.description);
            }
        }

        let response = self.agents.plan(&objective, &context_summary);
        self.store
            .record_phase_time("planning", started.elapsed().as_secs_f64())?;

        // PLAN.md is written by hand, so the sprint waits for it regardless.
        if !response.success {
            warn!(error = response.error_text(), "plan agent did not deliver the prompt");
            println!(
                "{}",
                color::warning(&format!(
                    "{}  Plan agent reported: {}",
                    emoji::WARNING,
                    response.error_text()
                ))
            );
        }

        println!(
            "\n{} Once you've created {}, run: vibe plan --load {}",
            emoji::MEMO,
            self.plan_display(),
            self.plan_display()
        );
        self.log_phase(Phase::Planning, "awaiting_manual_completion", None)?;
        Ok(PhaseOutcome::AwaitingPlan)
    }

    fn plan_display(&self) -> String {
        self.default_plan
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.default_plan.display().to_string())
    }

    /// Parse the plan document into tasks; the sprint becomes ready for
    /// execution.
    pub fn load_plan(&mut self, path: Option<&Path>) -> Result<PhaseOutcome, WorkflowError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| self.default_plan.clone());
        if !path.is_file() {
            println!("{} Plan not found at {}", emoji::CROSS, path.display());
            return Ok(PhaseOutcome::Failed(format!(
                "plan not found at {}",
                path.display()
            )));
        }
        if let Some(outcome) = self.guard(SprintStatus::ReadyForExecution)? {
            return Ok(outcome);
        }

        println!("{} Loading plan from {}...", emoji::BOOK, path.display());
        let content = fs::read_to_string(&path).map_err(io_error("read", &path))?;

        let tokens = self.estimator.estimate(&content);
        self.store.record_token_usage(AgentRole::Plan, tokens)?;

        let tasks = parse_plan(&content);
        let count = tasks.len();
        debug!(tasks = count, plan = %path.display(), "plan parsed");

        let plan_path = path.display().to_string();
        let state = self.store.state_mut()?;
        state.plan.path = Some(plan_path.clone());
        state.plan.tasks = tasks;
        self.set_status(SprintStatus::ReadyForExecution)?;
        self.store.update_task_stats()?;

        println!("{} Loaded {} tasks from plan", emoji::CHECK, count);
        self.log_phase(Phase::Planning, "completed", Some(&plan_path))?;
        Ok(PhaseOutcome::Completed)
    }

    /// Phase 3: run one task by id, or every pending task in plan order.
    ///
    /// Non-interactive runs stop at the first failed task. Interactive runs
    /// ask before each further task and pause on anything but `y`/`yes`.
    pub fn phase_3_execute(
        &mut self,
        task_id: Option<&str>,
        interactive: bool,
    ) -> Result<PhaseOutcome, WorkflowError> {
        println!("\n{}", color::banner("PHASE 3: EXECUTION"));

        if self.store.state()?.plan.tasks.is_empty() {
            println!("{} No tasks to execute. Load a plan first.", emoji::CROSS);
            return Ok(PhaseOutcome::Failed("no tasks".to_string()));
        }
        let single = match task_id {
            Some(id) => match self.store.task(id)? {
                Some(task) => Some(task),
                None => {
                    println!("{} Task not found: {}", emoji::CROSS, id);
                    return Ok(PhaseOutcome::Failed(format!("task not found: {}", id)));
                }
            },
            None => None,
        };
        if let Some(outcome) = self.guard(SprintStatus::Executing)? {
            return Ok(outcome);
        }
        self.set_status(SprintStatus::Executing)?;

        let (context_path, plan_path) = {
            let state = self.store.state()?;
            (
                state.context.repo_summary_path.clone(),
                state.plan.path.clone(),
            )
        };
        let context_summary = read_optional(context_path.as_deref())?;
        let plan_content = read_optional(plan_path.as_deref())?;

        if let Some(task) = single {
            return Ok(
                if self.execute_task(&task, &context_summary, &plan_content)? {
                    PhaseOutcome::Completed
                } else {
                    PhaseOutcome::Failed(format!("task {} failed", task.id))
                },
            );
        }

        let pending = self.store.pending_tasks()?;
        let total = pending.len();
        println!("{} Found {} pending tasks", emoji::TASK, total);

        for (i, task) in pending.iter().enumerate() {
            if self.shutdown.is_shutdown() {
                return self.pause();
            }

            println!("\n--- Task {}/{} ---", i + 1, total);
            let succeeded = self.execute_task(task, &context_summary, &plan_content)?;

            if self.shutdown.is_shutdown() {
                return self.pause();
            }
            if !succeeded && !interactive {
                println!("{} Task failed. Stopping execution.", emoji::CROSS);
                return Ok(PhaseOutcome::Failed(format!("task {} failed", task.id)));
            }
            if interactive && i + 1 < total && !self.confirm_continue()? {
                return self.pause();
            }
        }

        println!("\n{} All tasks executed!", emoji::CHECK);
        self.set_status(SprintStatus::Completed)?;
        self.log_phase(Phase::Execution, "completed", None)?;
        if let Some(log) = self.session_log()? {
            log.set_sprint_status("completed")
                .map_err(io_error("update", log.path()))?;
        }
        Ok(PhaseOutcome::Completed)
    }

    fn confirm_continue(&self) -> Result<bool, WorkflowError> {
        let answer = self
            .input
            .read_line("\nContinue to next task? (y/n): ")
            .map_err(io_error("read", Path::new("<stdin>")))?;
        Ok(matches!(
            answer.map(|a| a.trim().to_lowercase()).as_deref(),
            Some("y") | Some("yes")
        ))
    }

    fn pause(&mut self) -> Result<PhaseOutcome, WorkflowError> {
        println!("{}  Execution paused.", emoji::PAUSE);
        self.set_status(SprintStatus::Paused)?;
        self.log_phase(Phase::Execution, "paused", None)?;
        Ok(PhaseOutcome::Paused)
    }

    /// Run one task through the exec agent and record the result.
    fn execute_task(
        &mut self,
        task: &Task,
        context_summary: &str,
        plan_content: &str,
    ) -> Result<bool, WorkflowError> {
        println!("\n{} Executing: {}", emoji::TARGET, task.display_name());
        let started = Instant::now();

        let packet = handoff::generate_packet(task, context_summary, plan_content);
        self.store
            .update_task(&task.id, |t| t.status = TaskStatus::InProgress)?;
        self.store.save()?;
        self.store.record_agent_invocation(AgentRole::Exec)?;

        let handoffs = self.handoffs_dir();
        let packet_path = handoff::save_packet(&task.id, &packet, &handoffs)
            .map_err(io_error("write handoff packet in", &handoffs))?;
        debug!(task_id = %task.id, packet = %packet_path.display(), "handoff packet saved");

        let response = self.agents.execute_task(task, &packet);
        let secs = started.elapsed().as_secs_f64();
        self.record_task_result(task, &response, secs)?;

        self.store.update_task_stats()?;
        Ok(response.success)
    }

    fn record_task_result(
        &mut self,
        task: &Task,
        response: &AgentResponse,
        secs: f64,
    ) -> Result<(), WorkflowError> {
        let exec = AgentRole::Exec.as_str();
        let log = self.session_log()?;

        if response.success {
            println!("{} Task completed: {}", emoji::CHECK, task.id);
            println!("{}  Duration: {:.1}s", emoji::TIMER, secs);

            let tokens = self.estimator.estimate(&response.output);
            self.store.record_token_usage(AgentRole::Exec, tokens)?;
            self.store
                .update_task(&task.id, |t| t.status = TaskStatus::Completed)?;
            self.store.save()?;
            if let Some(log) = log {
                log.log_task(task, TaskStatus::Completed.as_str(), None)
                    .map_err(io_error("update", log.path()))?;
            }
            self.store.post_insight(
                exec,
                &format!("Task {} completed successfully in {:.1}s", task.id, secs),
            )?;
            return Ok(());
        }

        let error = response.error_text().to_string();
        warn!(task_id = %task.id, error = %error, "task failed");
        println!("{} Task failed: {}", emoji::CROSS, error);
        println!("{}  Failed after: {:.1}s", emoji::TIMER, secs);

        self.store
            .update_task(&task.id, |t| t.status = TaskStatus::Failed)?;
        self.store.save()?;
        if let Some(log) = log {
            log.log_task(task, TaskStatus::Failed.as_str(), Some(&error))
                .map_err(io_error("update", log.path()))?;
        }
        self.store.post_blocker(
            exec,
            &task.id,
            &format!("Task execution failed: {}", task.display_name()),
            Some(&error),
        )?;
        self.store.post_message(
            exec,
            "task_failure",
            &format!("Task {} failed and may need re-planning", task.id),
            Severity::Error,
        )?;
        Ok(())
    }

    /// Phase 4: deliver an architectural review prompt through the plan
    /// agent. The sprint status does not change.
    pub fn phase_4_verify(&mut self) -> Result<PhaseOutcome, WorkflowError> {
        let started = Instant::now();
        println!("\n{}", color::banner("PHASE 4: VERIFICATION"));

        let (active, plan_path) = {
            let state = self.store.state()?;
            (
                state.has_active_sprint() || state.sprint.status == SprintStatus::Completed,
                state.plan.path.clone(),
            )
        };
        if !active {
            println!("{} No active sprint.", emoji::CROSS);
            return Ok(PhaseOutcome::Failed("no active sprint".to_string()));
        }
        let plan_path = match plan_path {
            Some(path) if Path::new(&path).is_file() => path,
            _ => {
                println!("{} No plan found. Load a plan first.", emoji::CROSS);
                return Ok(PhaseOutcome::Failed("no plan".to_string()));
            }
        };
        let plan_content =
            fs::read_to_string(&plan_path).map_err(io_error("read", Path::new(&plan_path)))?;

        self.store.record_agent_invocation(AgentRole::Plan)?;
        let response = self.agents.verify(&plan_content);
        self.store
            .record_phase_time("verification", started.elapsed().as_secs_f64())?;

        if !response.success {
            let error = response.error_text().to_string();
            println!("{} Verification failed: {}", emoji::CROSS, error);
            self.log_phase(Phase::Verification, "failed", Some(&error))?;
            return Ok(PhaseOutcome::Failed(error));
        }

        println!("\n{} Verification prompt delivered.", emoji::CHECK);
        self.log_phase(Phase::Verification, "completed", None)?;
        Ok(PhaseOutcome::Completed)
    }

    /// Start a sprint and run it through execution, waiting for the
    /// operator to write the plan document between phases 2 and 3.
    pub fn run_full(&mut self, objective: &str, interactive: bool) -> Result<PhaseOutcome, WorkflowError> {
        let outcome = self.start(objective)?;
        if !outcome.is_success() {
            return Ok(outcome);
        }
        let outcome = self.phase_1_context()?;
        if !outcome.is_success() {
            return Ok(outcome);
        }
        let outcome = self.phase_2_plan()?;
        if !outcome.is_success() {
            return Ok(outcome);
        }

        let prompt = format!(
            "\nPress Enter when {} is ready (or Ctrl+C to stop)...",
            self.plan_display()
        );
        self.input
            .read_line(&prompt)
            .map_err(io_error("read", Path::new("<stdin>")))?;
        if self.shutdown.is_shutdown() {
            return Ok(PhaseOutcome::Paused);
        }

        let outcome = self.load_plan(None)?;
        if !outcome.is_success() {
            return Ok(outcome);
        }
        self.phase_3_execute(None, interactive)
    }
}
