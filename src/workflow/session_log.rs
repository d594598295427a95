//! Per-sprint markdown session log.
//!
//! Created at sprint start under the session logs directory as
//! `<YYYY-MM-DD>_sprint-<sprint id>.md`. Phase headings are rewritten in
//! place as phases progress; task results are appended.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::state::Task;

/// Sprint phases that own a section in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Context,
    Planning,
    Execution,
    Verification,
}

impl Phase {
    pub fn number(&self) -> u8 {
        match self {
            Self::Context => 1,
            Self::Planning => 2,
            Self::Execution => 3,
            Self::Verification => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Context => "Context",
            Self::Planning => "Planning",
            Self::Execution => "Execution",
            Self::Verification => "Verification",
        }
    }

    fn heading_prefix(&self) -> String {
        format!("## Phase {}:", self.number())
    }
}

/// Handle on one sprint's session log file.
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    /// Wrap an existing log path.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write a fresh log for `sprint_id` under `dir`.
    pub fn create(dir: &Path, sprint_id: &str, objective: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let date = Local::now().format("%Y-%m-%d").to_string();
        let path = dir.join(format!("{}_sprint-{}.md", date, sprint_id));
        fs::write(&path, initial_content(&date, sprint_id, objective))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Rewrite the heading and `Status:` line of `phase`.
    ///
    /// `detail` (an output path or an error) is appended to the status line.
    /// A missing log is ignored.
    pub fn set_phase_status(
        &self,
        phase: Phase,
        status: &str,
        detail: Option<&str>,
    ) -> io::Result<()> {
        if !self.exists() {
            return Ok(());
        }
        let content = fs::read_to_string(&self.path)?;
        let prefix = phase.heading_prefix();
        let status_line = match detail {
            Some(detail) => format!("Status: {} ({})", status, detail),
            None => format!("Status: {}", status),
        };

        let mut lines: Vec<String> = Vec::new();
        let mut in_phase = false;
        for line in content.lines() {
            if line.starts_with(&prefix) {
                in_phase = true;
                lines.push(format!(
                    "{} {} - {}",
                    prefix,
                    phase.name(),
                    status.to_uppercase()
                ));
                continue;
            }
            if line.starts_with("## ") {
                in_phase = false;
            }
            if in_phase && line.starts_with("Status:") {
                lines.push(status_line.clone());
                continue;
            }
            lines.push(line.to_string());
        }

        let mut updated = lines.join("\n");
        updated.push('\n');
        fs::write(&self.path, updated)
    }

    /// Append a task result entry.
    pub fn log_task(&self, task: &Task, status: &str, error: Option<&str>) -> io::Result<()> {
        let mut entry = format!(
            "\n### Task: {}\n- **ID:** {}\n- **Status:** {}\n",
            task.display_name(),
            task.id,
            status
        );
        if let Some(error) = error {
            entry.push_str(&format!("- **Error:** {}\n", error));
        }
        self.append(&entry)
    }

    /// Append a timestamped line to the notes at the end of the log.
    pub fn note(&self, text: &str) -> io::Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.append(&format!("- {} {}\n", timestamp, text))
    }

    /// Set the front-matter `status:` field.
    pub fn set_sprint_status(&self, status: &str) -> io::Result<()> {
        if !self.exists() {
            return Ok(());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut fence_count = 0;
        let mut lines: Vec<String> = Vec::new();
        for line in content.lines() {
            if line == "---" {
                fence_count += 1;
            }
            if fence_count == 1 && line.starts_with("status:") {
                lines.push(format!("status: {}", status));
            } else {
                lines.push(line.to_string());
            }
        }
        let mut updated = lines.join("\n");
        updated.push('\n');
        fs::write(&self.path, updated)
    }

    fn append(&self, text: &str) -> io::Result<()> {
        if !self.exists() {
            return Ok(());
        }
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(text.as_bytes())?;
        file.flush()
    }
}

fn initial_content(date: &str, sprint_id: &str, objective: &str) -> String {
    let mut out = format!(
        "---\ndate: {date}\nsprint_id: {sprint_id}\nobjective: {objective}\nagents_used: []\nstatus: in_progress\n---\n\n# Sprint: {sprint_id}\n\n## Objective\n{objective}\n\n"
    );
    for phase in [
        Phase::Context,
        Phase::Planning,
        Phase::Execution,
        Phase::Verification,
    ] {
        out.push_str(&format!(
            "{} {}\nStatus: pending\n\n",
            phase.heading_prefix(),
            phase.name()
        ));
    }
    out.push_str("## Tasks\n(Tasks will be added during planning phase)\n\n## Notes\n");
    out
}
