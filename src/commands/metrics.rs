use vibe::color::{self, emoji};
use vibe::config::Config;
use vibe::telemetry::{render_comparison_markdown, render_markdown, Telemetry};

use super::open_store;

/// Print the efficiency report for the current sprint, optionally saving it.
///
/// Works for finished sprints too; only a record that never started a
/// sprint has nothing to report.
pub fn cmd_metrics(config: &Config, save: bool) -> Result<(), String> {
    let mut store = open_store(config)?;
    let state = store.state().map_err(|e| e.to_string())?;
    if state.sprint.id.is_none() {
        println!("{}", color::warning("No active sprint"));
        return Ok(());
    }

    let telemetry = Telemetry::from_config(config);
    let report = telemetry.generate_report(state);
    println!("\n{}\n", render_markdown(&report, state));

    if save {
        if let Some(path) = telemetry.save_report(state).map_err(|e| e.to_string())? {
            println!("{} Report saved to: {}\n", emoji::CHECK, path.display());
        }
    }
    Ok(())
}

/// Side-by-side view of saved sprint reports.
pub fn cmd_compare(config: &Config, sprint_ids: &[String]) -> Result<(), String> {
    let telemetry = Telemetry::from_config(config);
    let comparison = telemetry.compare(sprint_ids);
    println!("\n{}\n", render_comparison_markdown(comparison.as_ref()));
    Ok(())
}
