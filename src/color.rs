//! Terminal color utilities using ANSI escape codes.
//!
//! Provides colored output for phase banners, statuses and agent roles.

use crate::state::{AgentRole, Severity, SprintStatus, TaskStatus};

/// ANSI color codes
pub mod codes {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const WHITE: &str = "\x1b[37m";
}

use codes::*;

fn paint(style: &str, text: &str) -> String {
    format!("{}{}{}", style, text, RESET)
}

/// Color an agent role name.
pub fn agent(role: AgentRole) -> String {
    let color = match role {
        AgentRole::Context => MAGENTA,
        AgentRole::Plan => BLUE,
        AgentRole::Exec => CYAN,
    };
    format!("{}{}{}{}", BOLD, color, role.as_str(), RESET)
}

/// Color a timestamp (dim white).
pub fn timestamp(ts: &str) -> String {
    paint(DIM, ts)
}

/// Color "Completed" status (green + bold).
pub fn completed(text: &str) -> String {
    format!("{}{}{}{}", BOLD, GREEN, text, RESET)
}

/// Color "Failed" status (red + bold).
pub fn failed(text: &str) -> String {
    format!("{}{}{}{}", BOLD, RED, text, RESET)
}

pub fn error(text: &str) -> String {
    paint(RED, text)
}

pub fn warning(text: &str) -> String {
    paint(YELLOW, text)
}

pub fn info(text: &str) -> String {
    paint(CYAN, text)
}

/// Color a label (bold).
pub fn label(text: &str) -> String {
    paint(BOLD, text)
}

/// Color a number/count.
pub fn number(n: impl std::fmt::Display) -> String {
    format!("{}{}{}", CYAN, n, RESET)
}

/// Task status in the same palette as the status table.
pub fn task_status(status: TaskStatus) -> String {
    let color = match status {
        TaskStatus::Pending => YELLOW,
        TaskStatus::InProgress => BLUE,
        TaskStatus::Completed => GREEN,
        TaskStatus::Failed => RED,
    };
    paint(color, status.as_str())
}

pub fn sprint_status(status: SprintStatus) -> String {
    let color = match status {
        SprintStatus::NotStarted => DIM,
        SprintStatus::Completed => GREEN,
        SprintStatus::Paused => YELLOW,
        _ => CYAN,
    };
    paint(color, status.as_str())
}

pub fn severity(severity: Severity, text: &str) -> String {
    let color = match severity {
        Severity::Info => WHITE,
        Severity::Warning => YELLOW,
        Severity::Error => RED,
    };
    paint(color, text)
}

/// Full-width phase banner: `=` rule, title, `=` rule.
pub fn banner(title: &str) -> String {
    let rule = "=".repeat(80);
    format!("{}\n{}\n{}", rule, label(title), rule)
}

/// Emoji constants for consistent usage
pub mod emoji {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARNING: &str = "⚠️";
    pub const PAUSE: &str = "⏸️";
    pub const TIMER: &str = "⏱️";
    pub const TASK: &str = "📋";
    pub const TARGET: &str = "🎯";
    pub const MEMO: &str = "📝";
    pub const BOOK: &str = "📖";
    pub const SEARCH: &str = "🔍";
    pub const GEAR: &str = "⚙️";
    pub const BULB: &str = "💡";
    pub const QUESTION: &str = "❓";
    pub const MAIL: &str = "📨";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_roles_get_distinct_colors() {
        let context = agent(AgentRole::Context);
        let exec = agent(AgentRole::Exec);
        assert!(context.contains("context-agent"));
        assert!(exec.contains("exec-agent"));
        assert_ne!(context.replace("context-agent", ""), exec.replace("exec-agent", ""));
    }

    #[test]
    fn test_completed_green_bold() {
        let text = completed("Completed");
        assert!(text.contains(GREEN));
        assert!(text.contains(BOLD));
        assert!(text.ends_with(RESET));
    }

    #[test]
    fn test_failed_red_bold() {
        let text = failed("Failed");
        assert!(text.contains(RED));
        assert!(text.contains(BOLD));
    }

    #[test]
    fn test_task_status_palette() {
        assert!(task_status(TaskStatus::Pending).contains(YELLOW));
        assert!(task_status(TaskStatus::InProgress).contains(BLUE));
        assert!(task_status(TaskStatus::Completed).contains(GREEN));
        assert!(task_status(TaskStatus::Failed).contains(RED));
        assert!(task_status(TaskStatus::Failed).contains("failed"));
    }

    #[test]
    fn test_banner_has_rules() {
        let text = banner("PHASE 1: CONTEXT ANALYSIS");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "=".repeat(80));
        assert!(lines[1].contains("PHASE 1"));
    }
}
