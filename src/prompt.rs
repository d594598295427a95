//! Prompt template loading and rendering.
//!
//! Templates are markdown files named `<name>.md` in the prompts directory
//! (`<project>/.agents/prompts` unless configured otherwise). Placeholders
//! are written as `{{variable_name}}`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Default prompts directory relative to the project root.
pub const DEFAULT_PROMPTS_DIR: &str = ".agents/prompts";

/// Environment override for the prompts directory.
pub const PROMPTS_DIR_ENV: &str = "VIBE_PROMPTS_DIR";

/// Named prompt templates rooted at one directory.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Library for a project.
    ///
    /// Looks for the prompts directory in the following order:
    /// 1. VIBE_PROMPTS_DIR environment variable (if it is a directory)
    /// 2. `configured`, resolved against the project root
    /// 3. `<project_root>/.agents/prompts`
    pub fn for_project(project_root: &Path, configured: Option<&Path>) -> Self {
        if let Ok(dir) = std::env::var(PROMPTS_DIR_ENV) {
            let path = PathBuf::from(dir);
            if path.is_dir() {
                return Self::new(path);
            }
        }
        match configured {
            Some(dir) => Self::new(project_root.join(dir)),
            None => Self::new(project_root.join(DEFAULT_PROMPTS_DIR)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the template file for `name`, if it exists.
    pub fn template_path(&self, name: &str) -> Option<PathBuf> {
        let path = self.dir.join(format!("{}.md", name));
        path.is_file().then_some(path)
    }

    /// Load a template, falling back to a self-describing placeholder.
    pub fn load(&self, name: &str) -> String {
        let loaded = self
            .template_path(name)
            .and_then(|path| fs::read_to_string(path).ok());
        match loaded {
            Some(template) => template,
            None => {
                debug!(name, dir = %self.dir.display(), "prompt template not found");
                not_found_sentinel(name)
            }
        }
    }

    /// Load `name` and substitute `vars`.
    pub fn load_and_render(&self, name: &str, vars: &HashMap<&str, String>) -> String {
        render(&self.load(name), vars)
    }
}

/// Placeholder returned for a missing template: `# Made Librarian` etc.
pub fn not_found_sentinel(name: &str) -> String {
    format!("# {}\n\n[Prompt template not found]", title_case(name))
}

fn title_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a prompt template with variable substitution.
///
/// Variables are specified as `{{variable_name}}` in the template. Unknown
/// placeholders are left in place.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_multiple_vars() {
        let template = "Objective: {{objective}} in {{repo_path}}";
        let mut vars = HashMap::new();
        vars.insert("objective", "Add auth".to_string());
        vars.insert("repo_path", "/src/app".to_string());

        assert_eq!(render(template, &vars), "Objective: Add auth in /src/app");
    }

    #[test]
    fn test_render_missing_var() {
        let template = "Hello {{name}} and {{other}}!";
        let mut vars = HashMap::new();
        vars.insert("name", "World".to_string());

        assert_eq!(render(template, &vars), "Hello World and {{other}}!");
    }

    #[test]
    fn test_load_missing_template_returns_sentinel() {
        let tmp = TempDir::new().unwrap();
        let library = PromptLibrary::new(tmp.path());

        assert_eq!(
            library.load("made_librarian"),
            "# Made Librarian\n\n[Prompt template not found]"
        );
    }

    #[test]
    fn test_load_and_render_from_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("made_executor.md"),
            "Task: {{task_title}}\n\n{{handoff_packet}}",
        )
        .unwrap();
        let library = PromptLibrary::new(tmp.path());

        let mut vars = HashMap::new();
        vars.insert("task_title", "Build login form".to_string());
        vars.insert("handoff_packet", "# Handoff Packet".to_string());

        assert_eq!(
            library.load_and_render("made_executor", &vars),
            "Task: Build login form\n\n# Handoff Packet"
        );
    }

    #[test]
    fn test_for_project_uses_default_dir() {
        let tmp = TempDir::new().unwrap();
        let configured = PathBuf::from("prompts");
        let library = PromptLibrary::for_project(tmp.path(), Some(&configured));
        if std::env::var(PROMPTS_DIR_ENV).is_err() {
            assert_eq!(library.dir(), tmp.path().join("prompts"));
            let library = PromptLibrary::for_project(tmp.path(), None);
            assert_eq!(library.dir(), tmp.path().join(DEFAULT_PROMPTS_DIR));
        }
    }

    #[test]
    fn test_title_case_sentinel_names() {
        assert_eq!(title_case("made_verifier"), "Made Verifier");
        assert_eq!(title_case("plan"), "Plan");
    }
}
