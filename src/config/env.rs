use std::env;

use super::types::Config;

pub(super) fn apply_env(config: &mut Config) {
    apply_env_from(config, |key| env::var(key).ok());
}

/// Apply `VIBE_*` variables read through `lookup`. Unparseable numbers are
/// ignored and leave the lower layer's value.
pub(super) fn apply_env_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("VIBE_STATE_FILE") {
        config.files_state = val;
    }
    if let Some(val) = lookup("VIBE_SESSION_LOGS_DIR") {
        config.files_session_logs = val;
    }
    if let Some(val) = lookup("VIBE_PLAN_FILE") {
        config.files_plan = val;
    }
    if let Some(val) = lookup("VIBE_STUB_MODE") {
        config.agents_stub_mode = val == "true" || val == "1";
    }
    if let Some(n) = lookup("VIBE_PROBE_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.agents_probe_timeout_secs = n;
    }
    if let Some(val) = lookup("VIBE_CONTEXT_COMMAND") {
        config.agents_context.command = val;
    }
    if let Some(n) = lookup("VIBE_CONTEXT_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.agents_context.timeout_secs = n;
    }
    if let Some(val) = lookup("VIBE_PLAN_COMMAND") {
        config.agents_plan.command = val;
    }
    if let Some(val) = lookup("VIBE_EXEC_COMMAND") {
        config.agents_exec.command = val;
    }
    if let Some(n) = lookup("VIBE_EXEC_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.agents_exec.timeout_secs = n;
    }
    if let Some(rate) = lookup("VIBE_COST_PER_MILLION").and_then(|v| v.parse().ok()) {
        config.telemetry_cost_per_million = rate;
    }
}
