//! Typed sprint record persisted in `.vibe_state.json`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Schema version written into every state file.
pub const STATE_VERSION: &str = "1.0";

/// Current local time in the ISO-8601 form used for blackboard entries.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// The three agent roles a sprint drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentRole {
    #[serde(rename = "context-agent")]
    Context,
    #[serde(rename = "plan-agent")]
    Plan,
    #[serde(rename = "exec-agent")]
    Exec,
}

impl AgentRole {
    /// All roles in sprint order.
    pub const ALL: [AgentRole; 3] = [AgentRole::Context, AgentRole::Plan, AgentRole::Exec];

    /// Key used for metrics and blackboard attribution.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "context-agent",
            Self::Plan => "plan-agent",
            Self::Exec => "exec-agent",
        }
    }

    /// Parse a role from its key.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "context-agent" => Some(Self::Context),
            "plan-agent" => Some(Self::Plan),
            "exec-agent" => Some(Self::Exec),
            _ => None,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sprint lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    /// No sprint has been started.
    #[default]
    #[serde(rename = "none")]
    NotStarted,
    ContextAnalysis,
    Planning,
    ReadyForExecution,
    Executing,
    Paused,
    Completed,
}

impl SprintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "none",
            Self::ContextAnalysis => "context_analysis",
            Self::Planning => "planning",
            Self::ReadyForExecution => "ready_for_execution",
            Self::Executing => "executing",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    /// Whether this status counts as an active sprint.
    ///
    /// `context_analysis` and `ready_for_execution` are intentionally not
    /// active: status views treat them as between-phase states.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Planning | Self::Executing | Self::Paused)
    }

    /// Returns `true` when a transition from `self` to `target` is legal.
    ///
    /// This is the single transition table for the sprint workflow:
    /// - none | completed      -> context_analysis (start)
    /// - context_analysis      -> context_analysis | planning
    /// - planning              -> planning | context_analysis | ready_for_execution
    /// - ready_for_execution   -> ready_for_execution | planning | executing
    /// - executing             -> executing | paused | completed | ready_for_execution
    /// - paused                -> executing | ready_for_execution
    /// - completed             -> executing (single task re-run)
    pub fn can_transition_to(&self, target: SprintStatus) -> bool {
        use SprintStatus::*;
        matches!(
            (self, target),
            (NotStarted, ContextAnalysis)
                | (Completed, ContextAnalysis)
                | (ContextAnalysis, ContextAnalysis)
                | (ContextAnalysis, Planning)
                | (Planning, Planning)
                | (Planning, ContextAnalysis)
                | (Planning, ReadyForExecution)
                | (ReadyForExecution, ReadyForExecution)
                | (ReadyForExecution, Planning)
                | (ReadyForExecution, Executing)
                | (Executing, Executing)
                | (Executing, Paused)
                | (Executing, Completed)
                | (Executing, ReadyForExecution)
                | (Paused, Executing)
                | (Paused, ReadyForExecution)
                | (Completed, Executing)
        )
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Older state files store a missing status as `null`.
fn status_or_default<'de, D>(deserializer: D) -> Result<SprintStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<SprintStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// Task execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of execution work parsed from the plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default = "default_assigned_agent")]
    pub assigned_agent: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub files_to_modify: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

fn default_assigned_agent() -> String {
    AgentRole::Exec.as_str().to_string()
}

impl Task {
    /// Create a pending task assigned to the execution agent.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            assigned_agent: default_assigned_agent(),
            dependencies: Vec::new(),
            files_to_modify: Vec::new(),
            acceptance_criteria: Vec::new(),
        }
    }

    /// Title if present, otherwise the id.
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// Blackboard message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: String,
    pub agent: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blocker {
    pub timestamp: String,
    pub agent: String,
    pub task_id: String,
    pub description: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub timestamp: String,
    pub agent: String,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub timestamp: String,
    pub agent: String,
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub answered: bool,
}

/// Inter-agent communication log. Entries are never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blackboard {
    pub messages: Vec<Message>,
    pub blockers: Vec<Blocker>,
    pub insights: Vec<Insight>,
    pub questions: Vec<Question>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Task counts recomputed from the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        Self {
            total: tasks.len(),
            completed: count(TaskStatus::Completed),
            failed: count(TaskStatus::Failed),
            in_progress: count(TaskStatus::InProgress),
            pending: count(TaskStatus::Pending),
        }
    }
}

/// Accumulated sprint counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub token_usage: BTreeMap<String, u64>,
    pub task_stats: TaskStats,
    pub phase_times: BTreeMap<String, f64>,
    pub agent_invocations: BTreeMap<String, u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Metrics {
    fn default() -> Self {
        let zeroed: BTreeMap<String, u64> = AgentRole::ALL
            .iter()
            .map(|role| (role.as_str().to_string(), 0))
            .collect();
        Self {
            token_usage: zeroed.clone(),
            task_stats: TaskStats::default(),
            phase_times: BTreeMap::new(),
            agent_invocations: zeroed,
            extra: Map::new(),
        }
    }
}

/// Metrics snapshot with derived totals, as used by reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintMetrics {
    pub token_usage: BTreeMap<String, u64>,
    pub task_stats: TaskStats,
    pub phase_times: BTreeMap<String, f64>,
    pub agent_invocations: BTreeMap<String, u64>,
    pub total_tokens: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintInfo {
    pub id: Option<String>,
    #[serde(deserialize_with = "status_or_default")]
    pub status: SprintStatus,
    pub objective: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextInfo {
    pub repo_summary_path: Option<String>,
    pub token_budget_used: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanInfo {
    pub path: Option<String>,
    pub tasks: Vec<Task>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Root aggregate: one live instance per project checkout.
///
/// Keys outside the typed schema are kept in the `extra` maps so that
/// path-addressed writes survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintState {
    pub version: String,
    pub sprint: SprintInfo,
    pub context: ContextInfo,
    pub plan: PlanInfo,
    pub session_log: Option<String>,
    pub blackboard: Blackboard,
    pub metrics: Metrics,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SprintState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            sprint: SprintInfo::default(),
            context: ContextInfo::default(),
            plan: PlanInfo::default(),
            session_log: None,
            blackboard: Blackboard::default(),
            metrics: Metrics::default(),
            extra: Map::new(),
        }
    }
}

impl SprintState {
    pub fn has_active_sprint(&self) -> bool {
        self.sprint.status.is_active()
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.plan.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.plan.tasks.iter_mut().find(|t| t.id == task_id)
    }

    pub fn pending_tasks(&self) -> Vec<&Task> {
        self.plan
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect()
    }

    pub fn unresolved_blockers(&self) -> Vec<&Blocker> {
        self.blackboard.blockers.iter().filter(|b| !b.resolved).collect()
    }

    pub fn unanswered_questions(&self) -> Vec<&Question> {
        self.blackboard.questions.iter().filter(|q| !q.answered).collect()
    }

    pub fn total_tokens(&self) -> u64 {
        self.metrics.token_usage.values().sum()
    }

    /// Completed tasks as a percentage of all tasks (0 when there are none).
    pub fn success_rate(&self) -> f64 {
        let stats = &self.metrics.task_stats;
        if stats.total == 0 {
            return 0.0;
        }
        stats.completed as f64 / stats.total as f64 * 100.0
    }

    pub fn sprint_metrics(&self) -> SprintMetrics {
        SprintMetrics {
            token_usage: self.metrics.token_usage.clone(),
            task_stats: self.metrics.task_stats,
            phase_times: self.metrics.phase_times.clone(),
            agent_invocations: self.metrics.agent_invocations.clone(),
            total_tokens: self.total_tokens(),
            success_rate: self.success_rate(),
        }
    }
}
