use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::types::{AgentSettings, Config, ConfigError};

/// On-disk shape of `vibe.toml`. Every key is optional; absent keys keep
/// the value from the lower-precedence layer.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct FileConfig {
    files: FilesSection,
    agents: AgentsSection,
    telemetry: TelemetrySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FilesSection {
    state: Option<String>,
    session_logs: Option<String>,
    plan: Option<String>,
    prompts: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AgentsSection {
    stub_mode: Option<bool>,
    probe_timeout: Option<u64>,
    context: AgentSection,
    plan: AgentSection,
    exec: AgentSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AgentSection {
    command: Option<String>,
    args: Option<Vec<String>>,
    timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TelemetrySection {
    cost_per_million: Option<f64>,
}

impl AgentSection {
    fn apply_to(self, settings: &mut AgentSettings) {
        if let Some(command) = self.command {
            settings.command = command;
        }
        if let Some(args) = self.args {
            settings.args = args;
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
    }
}

impl FileConfig {
    pub(super) fn apply_to(self, config: &mut Config) {
        let FileConfig {
            files,
            agents,
            telemetry,
        } = self;

        if let Some(state) = files.state {
            config.files_state = state;
        }
        if let Some(dir) = files.session_logs {
            config.files_session_logs = dir;
        }
        if let Some(plan) = files.plan {
            config.files_plan = plan;
        }
        if let Some(prompts) = files.prompts {
            config.files_prompts = prompts;
        }

        if let Some(stub) = agents.stub_mode {
            config.agents_stub_mode = stub;
        }
        if let Some(secs) = agents.probe_timeout {
            config.agents_probe_timeout_secs = secs;
        }
        agents.context.apply_to(&mut config.agents_context);
        agents.plan.apply_to(&mut config.agents_plan);
        agents.exec.apply_to(&mut config.agents_exec);

        if let Some(rate) = telemetry.cost_per_million {
            config.telemetry_cost_per_million = rate;
        }
    }
}

pub(super) fn load_from_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml(&content, path)
}

pub(super) fn parse_toml(content: &str, path: &Path) -> Result<FileConfig, ConfigError> {
    ::toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
