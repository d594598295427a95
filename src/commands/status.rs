use std::sync::Arc;

use vibe::agents::InputSource;
use vibe::color::{self, emoji};
use vibe::config::Config;
use vibe::state::{AgentRole, SprintStatus, StateStore};
use vibe::tui;

use super::open_store;

/// Show the current sprint and its tasks.
pub fn cmd_status(config: &Config) -> Result<(), String> {
    let mut store = open_store(config)?;
    let state = store.state().map_err(|e| e.to_string())?;

    // Between-phase and finished sprints are shown too.
    if state.sprint.status == SprintStatus::NotStarted {
        println!("\n{}", color::warning("No active sprint"));
        println!("Start a new sprint with: {}\n", color::info("vibe sprint start"));
        return Ok(());
    }

    let sprint = &state.sprint;
    println!();
    println!("{} {}", color::label("Sprint:"), sprint.id.as_deref().unwrap_or("-"));
    println!("{} {}", color::label("Status:"), color::sprint_status(sprint.status));
    println!(
        "{} {}\n",
        color::label("Objective:"),
        sprint.objective.as_deref().unwrap_or("-")
    );

    let tasks = &state.plan.tasks;
    if tasks.is_empty() {
        println!("{}", color::warning("No tasks loaded yet"));
    } else {
        let id_width = tasks.iter().map(|t| t.id.len()).max().unwrap_or(2).max(2);
        let title_width = tasks
            .iter()
            .map(|t| t.title.chars().count())
            .max()
            .unwrap_or(5)
            .clamp(5, 50);

        println!("{} {}", emoji::TASK, color::label("Tasks"));
        println!(
            "  {:<id_width$}  {:<title_width$}  {:<11}  Agent",
            "ID", "Title", "Status"
        );
        for task in tasks {
            let title: String = task.title.chars().take(title_width).collect();
            // Escape codes would skew `{:<11}`, so pad by hand.
            let pad = " ".repeat(11usize.saturating_sub(task.status.as_str().len()));
            println!(
                "  {:<id_width$}  {:<title_width$}  {}{}  {}",
                task.id,
                title,
                color::task_status(task.status),
                pad,
                AgentRole::parse(&task.assigned_agent)
                    .map(color::agent)
                    .unwrap_or_else(|| task.assigned_agent.clone())
            );
        }
        let stats = state.metrics.task_stats;
        println!(
            "\n  {} of {} completed, {} failed",
            color::number(stats.completed),
            color::number(stats.total),
            color::number(stats.failed)
        );
    }

    let blockers = state.unresolved_blockers().len();
    let questions = state.unanswered_questions().len();
    if blockers > 0 || questions > 0 {
        println!(
            "\n{}",
            color::warning(&format!(
                "{}  Attention needed: {} blockers, {} questions (see: vibe blackboard)",
                emoji::WARNING,
                blockers,
                questions
            ))
        );
    }
    println!();
    Ok(())
}

/// Discard all sprint state after confirmation.
pub fn cmd_reset(config: &Config, input: Arc<dyn InputSource>, force: bool) -> Result<(), String> {
    if !force {
        let answer = input
            .read_line(&format!(
                "{}  This will reset all sprint state. Continue? [y/N]: ",
                emoji::WARNING
            ))
            .map_err(|e| format!("failed to read confirmation: {}", e))?
            .unwrap_or_default();
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("{}", color::warning("Reset cancelled"));
            return Ok(());
        }
    }

    let mut store = StateStore::at(config.state_path());
    store.reset().map_err(|e| e.to_string())?;
    println!("{} State reset successfully", emoji::CHECK);
    Ok(())
}

/// Live terminal view of the state file.
pub fn cmd_dashboard(config: &Config) -> Result<(), String> {
    tui::run_dashboard(StateStore::at(config.state_path()))
        .map_err(|e| format!("dashboard error: {}", e))
}
