//! Configuration loading for vibe.
//!
//! Supports vibe.toml, CLI flags, and environment variables.
//! Precedence (highest to lowest): CLI flags > env vars > config file > defaults.

mod env;
mod file;
mod types;

pub use types::{
    AgentSettings, Config, ConfigError, Overrides, CONFIG_FILE, DEFAULT_CONTEXT_TIMEOUT_SECS,
    DEFAULT_COST_PER_MILLION, DEFAULT_EXEC_TIMEOUT_SECS, DEFAULT_PROBE_TIMEOUT_SECS,
};

#[cfg(test)]
mod tests;
