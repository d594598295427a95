pub mod blackboard;
pub mod init;
pub mod metrics;
pub mod sprint;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vibe::agents::{AgentSet, InputSource};
use vibe::config::Config;
use vibe::shutdown::ShutdownSignal;
use vibe::state::StateStore;
use vibe::workflow::{PhaseOutcome, Sprint};

pub use blackboard::{cmd_answer, cmd_ask, cmd_blackboard, cmd_resolve, BoardFilter};
pub use init::cmd_init;
pub use metrics::{cmd_compare, cmd_metrics};
pub use sprint::{cmd_context, cmd_exec, cmd_plan, cmd_sprint_full, cmd_sprint_start, cmd_verify};
pub use status::{cmd_dashboard, cmd_reset, cmd_status};

/// Load the state file, surfacing corruption recovery as a plain error string.
pub(crate) fn open_store(config: &Config) -> Result<StateStore, String> {
    let mut store = StateStore::at(config.state_path());
    store
        .load()
        .map_err(|e| format!("failed to load {}: {}", config.state_path().display(), e))?;
    Ok(store)
}

/// Engine wired to the configured agents and the process-wide Ctrl+C flag.
pub(crate) fn build_sprint(config: &Config, input: Arc<dyn InputSource>) -> Sprint {
    let agents = AgentSet::from_config(config, Arc::clone(&input));
    Sprint::new(config, agents, input).with_shutdown(ShutdownSignal::global())
}

/// Relative paths given on the command line are taken from the project root.
pub(crate) fn project_path(config: &Config, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config.project_root.join(path)
    }
}

/// Map a phase result onto the process exit status.
///
/// Pauses and the wait for a plan are normal stops; failures already printed
/// their diagnostic and only need a non-zero exit.
pub(crate) fn finish(outcome: PhaseOutcome, what: &str) -> Result<(), String> {
    match outcome {
        PhaseOutcome::Completed | PhaseOutcome::AwaitingPlan | PhaseOutcome::Paused => Ok(()),
        PhaseOutcome::Failed(reason) => Err(format!("{} failed: {}", what, reason)),
    }
}
