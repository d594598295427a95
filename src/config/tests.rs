use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use super::env::apply_env_from;
use super::*;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.files_state, ".vibe_state.json");
    assert_eq!(config.files_session_logs, "session_logs");
    assert_eq!(config.files_plan, "PLAN.md");
    assert_eq!(config.agents_context.command, "gemini");
    assert_eq!(config.agents_context.timeout_secs, 300);
    assert_eq!(config.agents_plan.command, "claude");
    assert_eq!(config.agents_exec.command, "codex");
    assert_eq!(config.agents_exec.timeout_secs, 600);
    assert_eq!(config.agents_probe_timeout_secs, 5);
    assert!(!config.agents_stub_mode);
    assert_eq!(config.telemetry_cost_per_million, 2.0);
}

#[test]
fn test_parse_toml_sections() {
    let content = r#"
[files]
plan = "docs/PLAN.md"

[agents]
stub_mode = true

[agents.exec]
command = "/opt/bin/codex"
args = ["--quiet"]
timeout = 1200

[telemetry]
cost_per_million = 3.5
"#;
    let config = Config::from_toml_str(content).unwrap();
    assert_eq!(config.files_plan, "docs/PLAN.md");
    assert!(config.agents_stub_mode);
    assert_eq!(config.agents_exec.command, "/opt/bin/codex");
    assert_eq!(config.agents_exec.args, vec!["--quiet".to_string()]);
    assert_eq!(config.agents_exec.timeout_secs, 1200);
    assert_eq!(config.telemetry_cost_per_million, 3.5);
    // Untouched sections keep their defaults.
    assert_eq!(config.agents_context.command, "gemini");
    assert_eq!(config.files_state, ".vibe_state.json");
}

#[test]
fn test_parse_toml_rejects_unknown_keys() {
    let err = Config::from_toml_str("[agents]\nmax_count = 4\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_parse_toml_rejects_wrong_types() {
    let err = Config::from_toml_str("[agents.context]\ntimeout = \"soon\"\n").unwrap_err();
    assert!(err.to_string().contains("config parse error"));
}

#[test]
fn test_default_toml_round_trips() {
    let config = Config::from_toml_str(&Config::default_toml()).unwrap();
    let defaults = Config::default();
    assert_eq!(config.files_state, defaults.files_state);
    assert_eq!(config.agents_context, defaults.agents_context);
    assert_eq!(config.agents_exec, defaults.agents_exec);
    assert_eq!(config.telemetry_cost_per_million, defaults.telemetry_cost_per_million);
}

#[test]
fn test_env_overrides_file_values() {
    let mut config = Config::from_toml_str("[agents.context]\ncommand = \"from-file\"\n").unwrap();
    apply_env_from(&mut config, |key| match key {
        "VIBE_CONTEXT_COMMAND" => Some("from-env".to_string()),
        "VIBE_EXEC_TIMEOUT" => Some("42".to_string()),
        "VIBE_CONTEXT_TIMEOUT" => Some("not-a-number".to_string()),
        "VIBE_STUB_MODE" => Some("1".to_string()),
        _ => None,
    });
    assert_eq!(config.agents_context.command, "from-env");
    assert_eq!(config.agents_exec.timeout_secs, 42);
    assert_eq!(config.agents_context.timeout_secs, 300);
    assert!(config.agents_stub_mode);
}

#[test]
fn test_cli_overrides_take_precedence() {
    let mut config = Config::from_toml_str("[agents]\nstub_mode = false\n").unwrap();
    config.apply_overrides(&Overrides {
        project_root: Some(PathBuf::from("/work/app")),
        config: None,
        stub: true,
        verbose: true,
    });
    assert!(config.agents_stub_mode);
    assert!(config.verbose);
    assert_eq!(config.state_path(), PathBuf::from("/work/app/.vibe_state.json"));
    assert_eq!(config.plan_path(), PathBuf::from("/work/app/PLAN.md"));
}

#[test]
fn test_load_reads_vibe_toml_from_project_root() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(CONFIG_FILE),
        "[files]\nsession_logs = \"logs\"\n",
    )
    .unwrap();

    let config = Config::load(&Overrides {
        project_root: Some(tmp.path().to_path_buf()),
        ..Overrides::default()
    })
    .unwrap();
    if std::env::var("VIBE_SESSION_LOGS_DIR").is_err() {
        assert_eq!(config.session_logs_dir(), tmp.path().join("logs"));
    }
}

#[test]
fn test_load_missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    let err = Config::load(&Overrides {
        project_root: Some(tmp.path().to_path_buf()),
        config: Some(tmp.path().join("missing.toml")),
        ..Overrides::default()
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_load_without_config_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load(&Overrides {
        project_root: Some(tmp.path().to_path_buf()),
        ..Overrides::default()
    })
    .unwrap();
    assert_eq!(config.project_root, tmp.path());
}
