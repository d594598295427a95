use std::path::Path;
use std::sync::Arc;

use vibe::agents::InputSource;
use vibe::color::{self, emoji};
use vibe::config::Config;
use vibe::workflow::PhaseOutcome;

use super::{build_sprint, finish, project_path};

fn next_step(text: &str) {
    println!("\n{}\n", color::info(&format!("Next step: {}", text)));
}

/// Begin a new sprint.
pub fn cmd_sprint_start(
    config: &Config,
    input: Arc<dyn InputSource>,
    objective: &str,
) -> Result<(), String> {
    let mut sprint = build_sprint(config, input);
    let outcome = sprint.start(objective).map_err(|e| e.to_string())?;
    if outcome.is_success() {
        next_step("vibe context");
    }
    finish(outcome, "sprint start")
}

/// Start a sprint and drive it through execution.
pub fn cmd_sprint_full(
    config: &Config,
    input: Arc<dyn InputSource>,
    objective: &str,
    interactive: bool,
) -> Result<(), String> {
    let mut sprint = build_sprint(config, input);
    let outcome = sprint
        .run_full(objective, interactive)
        .map_err(|e| e.to_string())?;
    match outcome {
        PhaseOutcome::Completed => {
            println!("\n{} Sprint completed successfully!", emoji::CHECK);
        }
        PhaseOutcome::Paused => {
            println!("\n{}", color::warning("Resume with: vibe exec"));
        }
        _ => {}
    }
    finish(outcome, "sprint")
}

/// Phase 1: context analysis.
pub fn cmd_context(config: &Config, input: Arc<dyn InputSource>) -> Result<(), String> {
    let mut sprint = build_sprint(config, input);
    let outcome = sprint.phase_1_context().map_err(|e| e.to_string())?;
    if outcome.is_success() {
        next_step("vibe plan");
    }
    finish(outcome, "context phase")
}

/// Phase 2: send the planning prompt, or load a finished plan with `--load`.
pub fn cmd_plan(
    config: &Config,
    input: Arc<dyn InputSource>,
    load: Option<&Path>,
) -> Result<(), String> {
    let mut sprint = build_sprint(config, input);
    match load {
        Some(path) => {
            let path = project_path(config, path);
            let outcome = sprint.load_plan(Some(&path)).map_err(|e| e.to_string())?;
            if outcome.is_success() {
                next_step("vibe exec");
            }
            finish(outcome, "plan load")
        }
        None => {
            let outcome = sprint.phase_2_plan().map_err(|e| e.to_string())?;
            finish(outcome, "planning phase")
        }
    }
}

/// Phase 3: execute one task or every pending task.
pub fn cmd_exec(
    config: &Config,
    input: Arc<dyn InputSource>,
    task_id: Option<&str>,
    interactive: bool,
) -> Result<(), String> {
    let mut sprint = build_sprint(config, input);
    let outcome = sprint
        .phase_3_execute(task_id, interactive)
        .map_err(|e| e.to_string())?;
    match outcome {
        PhaseOutcome::Completed => println!("\n{} Execution complete!\n", emoji::CHECK),
        PhaseOutcome::Paused => println!("\n{}\n", color::warning("Resume with: vibe exec")),
        _ => {}
    }
    finish(outcome, "execution")
}

/// Phase 4: architectural review of the finished work.
pub fn cmd_verify(config: &Config, input: Arc<dyn InputSource>) -> Result<(), String> {
    let mut sprint = build_sprint(config, input);
    let outcome = sprint.phase_4_verify().map_err(|e| e.to_string())?;
    if outcome.is_success() {
        println!(
            "\n{}\n",
            color::info("Review the changes and create a verification report")
        );
    }
    finish(outcome, "verification")
}
