//! Sprint efficiency reports.
//!
//! Reports are derived from the state record on demand; nothing here mutates
//! sprint state. Saved reports live under
//! `session_logs/telemetry/<sprint id>_telemetry.json` and feed
//! cross-sprint comparisons.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::state::{timestamp, AgentRole, SprintMetrics, SprintState, SprintStatus};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlackboardCounts {
    pub messages: usize,
    pub blockers: usize,
    pub unresolved_blockers: usize,
    pub insights: usize,
    pub questions: usize,
    pub unanswered_questions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Efficiency {
    pub total_cost_usd: f64,
    /// Cost divided by completed tasks, 0 when none completed.
    pub cost_per_task: f64,
    pub tokens_per_task: f64,
    /// Completed tasks per exec-agent invocation.
    pub tasks_per_exec_run: f64,
    pub success_rate: f64,
}

/// Point-in-time efficiency report for one sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintReport {
    pub sprint_id: Option<String>,
    pub objective: Option<String>,
    pub status: SprintStatus,
    pub timestamp: String,
    pub metrics: SprintMetrics,
    pub blackboard: BlackboardCounts,
    pub efficiency: Efficiency,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonAverages {
    pub avg_cost_per_sprint: f64,
    pub avg_tokens_per_sprint: f64,
    pub avg_success_rate: f64,
    pub total_sprints: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintComparison {
    pub sprints: Vec<SprintReport>,
    pub averages: ComparisonAverages,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `1234567` as `1,234,567`.
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `context_analysis` as `Context Analysis`.
fn phase_title(phase: &str) -> String {
    phase
        .split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Report generation and storage for one project.
#[derive(Debug, Clone)]
pub struct Telemetry {
    dir: PathBuf,
    cost_per_million: f64,
}

impl Telemetry {
    pub fn new(session_logs_dir: &Path, cost_per_million: f64) -> Self {
        Self {
            dir: session_logs_dir.join("telemetry"),
            cost_per_million,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.session_logs_dir(), config.telemetry_cost_per_million)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn report_path(&self, sprint_id: &str) -> PathBuf {
        self.dir.join(format!("{}_telemetry.json", sprint_id))
    }

    pub fn generate_report(&self, state: &SprintState) -> SprintReport {
        let metrics = state.sprint_metrics();
        let board = &state.blackboard;
        SprintReport {
            sprint_id: state.sprint.id.clone(),
            objective: state.sprint.objective.clone(),
            status: state.sprint.status,
            timestamp: timestamp(),
            blackboard: BlackboardCounts {
                messages: board.messages.len(),
                blockers: board.blockers.len(),
                unresolved_blockers: state.unresolved_blockers().len(),
                insights: board.insights.len(),
                questions: board.questions.len(),
                unanswered_questions: state.unanswered_questions().len(),
            },
            efficiency: self.efficiency(&metrics),
            metrics,
        }
    }

    fn efficiency(&self, metrics: &SprintMetrics) -> Efficiency {
        let total_tokens = metrics.total_tokens as f64;
        let completed = metrics.task_stats.completed as f64;
        let total_cost = total_tokens / 1_000_000.0 * self.cost_per_million;
        let per_completed = |value: f64| {
            if completed > 0.0 {
                value / completed
            } else {
                0.0
            }
        };
        let exec_runs = metrics
            .agent_invocations
            .get(AgentRole::Exec.as_str())
            .copied()
            .unwrap_or(0)
            .max(1) as f64;

        Efficiency {
            total_cost_usd: round_to(total_cost, 2),
            cost_per_task: round_to(per_completed(total_cost), 2),
            tokens_per_task: round_to(per_completed(total_tokens), 0),
            tasks_per_exec_run: round_to(completed / exec_runs, 2),
            success_rate: metrics.success_rate,
        }
    }

    /// Write the current report as JSON. `None` when no sprint was started.
    pub fn save_report(&self, state: &SprintState) -> Result<Option<PathBuf>, TelemetryError> {
        let Some(ref sprint_id) = state.sprint.id else {
            return Ok(None);
        };
        let report = self.generate_report(state);
        fs::create_dir_all(&self.dir).map_err(|source| TelemetryError::Io {
            action: "create",
            path: self.dir.clone(),
            source,
        })?;
        let path = self.report_path(sprint_id);
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json).map_err(|source| TelemetryError::Io {
            action: "write",
            path: path.clone(),
            source,
        })?;
        Ok(Some(path))
    }

    /// Saved reports for `sprint_ids` with their averages. Sprints without a
    /// readable report are skipped; `None` when nothing was found.
    pub fn compare(&self, sprint_ids: &[String]) -> Option<SprintComparison> {
        let sprints: Vec<SprintReport> = sprint_ids
            .iter()
            .filter_map(|id| self.load_report(id))
            .collect();
        if sprints.is_empty() {
            return None;
        }

        let count = sprints.len() as f64;
        let total_cost: f64 = sprints.iter().map(|r| r.efficiency.total_cost_usd).sum();
        let total_tokens: u64 = sprints.iter().map(|r| r.metrics.total_tokens).sum();
        let success: f64 = sprints.iter().map(|r| r.efficiency.success_rate).sum();
        let averages = ComparisonAverages {
            avg_cost_per_sprint: round_to(total_cost / count, 2),
            avg_tokens_per_sprint: round_to(total_tokens as f64 / count, 0),
            avg_success_rate: round_to(success / count, 1),
            total_sprints: sprints.len(),
        };
        Some(SprintComparison { sprints, averages })
    }

    fn load_report(&self, sprint_id: &str) -> Option<SprintReport> {
        let path = self.report_path(sprint_id);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable telemetry report");
                None
            }
        }
    }
}

/// Markdown rendering of `report`. Blocker and question details come from
/// `state`.
pub fn render_markdown(report: &SprintReport, state: &SprintState) -> String {
    let metrics = &report.metrics;
    let efficiency = &report.efficiency;
    let board = &report.blackboard;
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        "# Sprint Efficiency Report".to_string(),
        String::new(),
        format!("**Sprint ID:** {}", or_dash(&report.sprint_id)),
        format!("**Objective:** {}", or_dash(&report.objective)),
        format!("**Status:** {}", report.status),
        format!("**Generated:** {}", report.timestamp),
        String::new(),
        "## Token Usage".to_string(),
        String::new(),
        "| Agent | Tokens | Invocations | Tokens/Invocation |".to_string(),
        "|-------|--------|-------------|-------------------|".to_string(),
    ];

    for role in AgentRole::ALL {
        let tokens = metrics.token_usage.get(role.as_str()).copied().unwrap_or(0);
        let invocations = metrics
            .agent_invocations
            .get(role.as_str())
            .copied()
            .unwrap_or(0);
        let per_invocation = if invocations > 0 {
            (tokens as f64 / invocations as f64).round() as u64
        } else {
            0
        };
        lines.push(format!(
            "| {} | {} | {} | {} |",
            role,
            thousands(tokens),
            invocations,
            thousands(per_invocation)
        ));
    }

    let stats = &metrics.task_stats;
    lines.extend([
        format!("| **Total** | **{}** | - | - |", thousands(metrics.total_tokens)),
        String::new(),
        "## Task Statistics".to_string(),
        String::new(),
        format!("- **Total Tasks:** {}", stats.total),
        format!("- **Completed:** {}", stats.completed),
        format!("- **Failed:** {}", stats.failed),
        format!("- **In Progress:** {}", stats.in_progress),
        format!("- **Pending:** {}", stats.pending),
        format!("- **Success Rate:** {:.1}%", efficiency.success_rate),
        String::new(),
        "## Efficiency Metrics".to_string(),
        String::new(),
        format!("- **Estimated Cost:** ${:.2}", efficiency.total_cost_usd),
        format!("- **Cost per Task:** ${:.2}", efficiency.cost_per_task),
        format!(
            "- **Tokens per Task:** {}",
            thousands(efficiency.tokens_per_task as u64)
        ),
        format!(
            "- **Tasks per Exec Run:** {:.2}",
            efficiency.tasks_per_exec_run
        ),
        String::new(),
        "## Phase Timing".to_string(),
        String::new(),
    ]);

    if metrics.phase_times.is_empty() {
        lines.push("_No phase timing data available_".to_string());
    } else {
        for (phase, secs) in &metrics.phase_times {
            let secs = secs.max(0.0) as u64;
            lines.push(format!(
                "- **{}:** {}m {}s",
                phase_title(phase),
                secs / 60,
                secs % 60
            ));
        }
    }

    lines.extend([
        String::new(),
        "## Blackboard Activity".to_string(),
        String::new(),
        format!("- **Messages:** {}", board.messages),
        format!(
            "- **Blockers:** {} ({} unresolved)",
            board.blockers, board.unresolved_blockers
        ),
        format!("- **Insights:** {}", board.insights),
        format!(
            "- **Questions:** {} ({} unanswered)",
            board.questions, board.unanswered_questions
        ),
        String::new(),
    ]);

    let blockers = state.unresolved_blockers();
    if !blockers.is_empty() {
        lines.extend([
            String::new(),
            "## ⚠️ Unresolved Blockers".to_string(),
            String::new(),
        ]);
        for (i, blocker) in blockers.iter().enumerate() {
            lines.push(format!(
                "{}. **[{}]** {}",
                i + 1,
                blocker.agent.to_uppercase(),
                blocker.description
            ));
            if let Some(ref error) = blocker.error {
                lines.push(format!("   - Error: `{}`", error));
            }
            lines.push(format!("   - Task: {}", blocker.task_id));
            lines.push(String::new());
        }
    }

    let questions = state.unanswered_questions();
    if !questions.is_empty() {
        lines.extend(["## ❓ Unanswered Questions".to_string(), String::new()]);
        for (i, question) in questions.iter().enumerate() {
            lines.push(format!(
                "{}. **[{}]** {}",
                i + 1,
                question.agent.to_uppercase(),
                question.question
            ));
            if let Some(ref context) = question.context {
                lines.push(format!("   - Context: {}", context));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

/// Markdown table of a comparison, or a placeholder when there is none.
pub fn render_comparison_markdown(comparison: Option<&SprintComparison>) -> String {
    let Some(comparison) = comparison else {
        return "No history data".to_string();
    };

    let mut lines = vec![
        "# Sprint Comparison".to_string(),
        String::new(),
        "| Sprint | Status | Tasks | Success Rate | Tokens | Cost |".to_string(),
        "|--------|--------|-------|--------------|--------|------|".to_string(),
    ];
    for report in &comparison.sprints {
        let stats = &report.metrics.task_stats;
        lines.push(format!(
            "| {} | {} | {}/{} | {:.1}% | {} | ${:.2} |",
            report.sprint_id.as_deref().unwrap_or("-"),
            report.status,
            stats.completed,
            stats.total,
            report.efficiency.success_rate,
            thousands(report.metrics.total_tokens),
            report.efficiency.total_cost_usd
        ));
    }

    let averages = &comparison.averages;
    lines.extend([
        String::new(),
        "## Averages".to_string(),
        String::new(),
        format!("- **Sprints:** {}", averages.total_sprints),
        format!("- **Avg Cost per Sprint:** ${:.2}", averages.avg_cost_per_sprint),
        format!(
            "- **Avg Tokens per Sprint:** {}",
            thousands(averages.avg_tokens_per_sprint as u64)
        ),
        format!("- **Avg Success Rate:** {:.1}%", averages.avg_success_rate),
    ]);
    lines.join("\n")
}
