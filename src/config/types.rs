use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{env, file};

/// Config file looked up at the project root when `--config` is not given.
pub const CONFIG_FILE: &str = "vibe.toml";

/// Version probe timeout in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
/// Context analysis timeout in seconds (5 minutes).
pub const DEFAULT_CONTEXT_TIMEOUT_SECS: u64 = 300;
/// Plan agent timeout in seconds. Only used for availability-adjacent calls.
pub const DEFAULT_PLAN_TIMEOUT_SECS: u64 = 300;
/// Execution timeout in seconds (10 minutes).
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 600;
/// Estimated cost in USD per million tokens.
pub const DEFAULT_COST_PER_MILLION: f64 = 2.0;

/// How one external agent CLI is invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Program name or path.
    pub command: String,
    /// Extra arguments placed before `--prompt <text>`.
    pub args: Vec<String>,
    /// Hard timeout for one invocation in seconds.
    pub timeout_secs: u64,
}

impl AgentSettings {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Command-line values that take precedence over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub stub: bool,
    pub verbose: bool,
}

/// Resolved vibe configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory every relative path is resolved against.
    pub project_root: PathBuf,
    /// State file, relative to the project root.
    pub files_state: String,
    /// Directory for session logs, context summaries, handoffs and reports.
    pub files_session_logs: String,
    /// Default plan document.
    pub files_plan: String,
    /// Prompt templates directory.
    pub files_prompts: String,
    pub agents_context: AgentSettings,
    pub agents_plan: AgentSettings,
    pub agents_exec: AgentSettings,
    /// Timeout for `<command> --version` probes in seconds.
    pub agents_probe_timeout_secs: u64,
    /// Replace every agent with the deterministic stub.
    pub agents_stub_mode: bool,
    pub telemetry_cost_per_million: f64,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            files_state: crate::state::STATE_FILE.to_string(),
            files_session_logs: "session_logs".to_string(),
            files_plan: "PLAN.md".to_string(),
            files_prompts: crate::prompt::DEFAULT_PROMPTS_DIR.to_string(),
            agents_context: AgentSettings::new("gemini", DEFAULT_CONTEXT_TIMEOUT_SECS),
            agents_plan: AgentSettings::new("claude", DEFAULT_PLAN_TIMEOUT_SECS),
            agents_exec: AgentSettings::new("codex", DEFAULT_EXEC_TIMEOUT_SECS),
            agents_probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            agents_stub_mode: false,
            telemetry_cost_per_million: DEFAULT_COST_PER_MILLION,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from all sources with proper precedence.
    ///
    /// Precedence: CLI args > env vars > config file > defaults.
    ///
    /// An explicit `--config` path must exist; the implicit `vibe.toml` at the
    /// project root is optional.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let project_root = overrides
            .project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let mut config = Self {
            project_root: project_root.clone(),
            ..Self::default()
        };

        match overrides.config {
            Some(ref path) => file::load_from_file(path)?.apply_to(&mut config),
            None => {
                let implicit = project_root.join(CONFIG_FILE);
                if implicit.is_file() {
                    file::load_from_file(&implicit)?.apply_to(&mut config);
                }
            }
        }

        env::apply_env(&mut config);
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Parse TOML content on top of the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        file::parse_toml(content, Path::new(CONFIG_FILE))?.apply_to(&mut config);
        Ok(config)
    }

    pub(super) fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(ref root) = overrides.project_root {
            self.project_root = root.clone();
        }
        if overrides.stub {
            self.agents_stub_mode = true;
        }
        if overrides.verbose {
            self.verbose = true;
        }
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.project_root.join(relative)
    }

    pub fn state_path(&self) -> PathBuf {
        self.resolve(&self.files_state)
    }

    pub fn session_logs_dir(&self) -> PathBuf {
        self.resolve(&self.files_session_logs)
    }

    pub fn plan_path(&self) -> PathBuf {
        self.resolve(&self.files_plan)
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.resolve(&self.files_prompts)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.agents_probe_timeout_secs)
    }

    /// Generate default vibe.toml content.
    pub fn default_toml() -> String {
        format!(
            r#"# vibe configuration

[files]
state = "{state}"
session_logs = "session_logs"
plan = "PLAN.md"
prompts = "{prompts}"

[agents]
stub_mode = false
probe_timeout = {probe}  # seconds

[agents.context]
command = "gemini"
timeout = {context}  # seconds (5 minutes)

[agents.plan]
command = "claude"

[agents.exec]
command = "codex"
timeout = {exec}  # seconds (10 minutes)

[telemetry]
cost_per_million = {cost:.1}  # USD
"#,
            state = crate::state::STATE_FILE,
            prompts = crate::prompt::DEFAULT_PROMPTS_DIR,
            probe = DEFAULT_PROBE_TIMEOUT_SECS,
            context = DEFAULT_CONTEXT_TIMEOUT_SECS,
            exec = DEFAULT_EXEC_TIMEOUT_SECS,
            cost = DEFAULT_COST_PER_MILLION,
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading config file.
    #[error("config I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Parse error in config file.
    #[error("config parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ::toml::de::Error,
    },
}
