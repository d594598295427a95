use std::fs;
use std::path::Path;

use vibe::config::{Config, CONFIG_FILE};

/// Scaffold a project: `vibe.toml`, the prompts directory and session logs.
pub fn cmd_init(config: &Config) -> Result<(), String> {
    println!("Initializing vibe project in {}...", config.project_root.display());

    let config_path = config.project_root.join(CONFIG_FILE);
    if config_path.exists() {
        println!("  Config already exists: {}", CONFIG_FILE);
    } else {
        ensure_parent_dir(&config_path)?;
        fs::write(&config_path, Config::default_toml())
            .map_err(|e| format!("failed to create {}: {}", config_path.display(), e))?;
        println!("  Created {}", CONFIG_FILE);
    }

    create_dir(&config.prompts_dir(), &config.files_prompts)?;
    create_dir(&config.session_logs_dir(), &config.files_session_logs)?;

    println!("\nvibe project initialized.");
    println!(
        "  Add prompt templates (made_librarian.md, made_architect.md, made_executor.md) to {}/",
        config.files_prompts
    );
    println!("  Use 'vibe sprint start \"<objective>\"' to begin a sprint.");
    Ok(())
}

fn create_dir(path: &Path, shown: &str) -> Result<(), String> {
    if shown.is_empty() {
        return Err("directory path is empty".to_string());
    }
    fs::create_dir_all(path)
        .map_err(|e| format!("failed to create directory {}: {}", path.display(), e))?;
    println!("  Created directory: {}", shown);
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create directory {}: {}", parent.display(), e))?;
        }
    }
    Ok(())
}
