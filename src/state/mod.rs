//! Persistent sprint state.
//!
//! The store owns `.vibe_state.json` at the project root. Every other part of
//! the crate reads and writes sprint data through [`StateStore`]; nothing else
//! parses the file directly.
//!
//! Writes are save-on-write for the blackboard and metrics mutators. The
//! previous file is copied to `.vibe_state.json.bak` before each write, and a
//! file that fails to parse is copied to `.vibe_state.json.backup` and
//! replaced by the default record.

mod model;
mod path;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;
use tracing::{debug, warn};

pub use model::{
    timestamp, AgentRole, Blackboard, Blocker, ContextInfo, Insight, Message, Metrics, PlanInfo,
    Question, Severity, SprintInfo, SprintMetrics, SprintState, SprintStatus, Task, TaskStats,
    TaskStatus, STATE_VERSION,
};

/// State file name at the project root.
pub const STATE_FILE: &str = ".vibe_state.json";

/// State store errors.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Reading, writing or backing up the state file failed.
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid state key '{0}'")]
    InvalidKey(String),
    /// A path-addressed write produced a record that no longer fits the schema.
    #[error("value for '{key}' does not fit the state schema: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// The schema would store the value in a different form (e.g. `3` as `3.0`).
    #[error("value for '{key}' would be stored as {stored}")]
    Coerced { key: String, stored: String },
}

fn io_error<'a>(
    action: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> StateError + 'a {
    move |source| StateError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// Handle on the persisted sprint record.
///
/// The record is loaded lazily on first access and held in memory until the
/// next [`load`](Self::load). Mutations through `set`/`update_task` are not
/// persisted until [`save`](Self::save); the blackboard and metrics mutators
/// save immediately.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: Option<SprintState>,
}

impl StateStore {
    /// Store for the default state file under `project_root`.
    pub fn new(project_root: &Path) -> Self {
        Self::at(project_root.join(STATE_FILE))
    }

    /// Store for an explicit state file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the previous on-disk version, refreshed before every save.
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    /// Copy of a state file that could not be parsed.
    pub fn corrupt_backup_path(&self) -> PathBuf {
        self.path.with_extension("json.backup")
    }

    /// Read the persisted record, replacing the in-memory copy.
    ///
    /// A missing file yields the default record (not written until the next
    /// save). A file that is not valid JSON, or does not match the schema, is
    /// copied aside and the default record is returned.
    pub fn load(&mut self) -> Result<&SprintState, StateError> {
        let state = match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<SprintState>(&bytes) {
                Ok(state) => state,
                Err(err) => {
                    let backup = self.corrupt_backup_path();
                    fs::copy(&self.path, &backup).map_err(io_error("back up", &backup))?;
                    warn!(
                        path = %self.path.display(),
                        backup = %backup.display(),
                        error = %err,
                        "state file unreadable, starting from defaults"
                    );
                    SprintState::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, using defaults");
                SprintState::default()
            }
            Err(source) => {
                return Err(StateError::Io {
                    action: "read",
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(self.state.insert(state))
    }

    /// Write the in-memory record.
    ///
    /// The previous file is copied to [`backup_path`](Self::backup_path), the
    /// new content goes to a temporary sibling which is then renamed over the
    /// state file. Does nothing if the record was never loaded.
    pub fn save(&mut self) -> Result<(), StateError> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error("create", parent))?;
            }
        }

        if self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup).map_err(io_error("back up", &backup))?;
        }

        let mut content = serde_json::to_string_pretty(state)?;
        content.push('\n');
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(io_error("write", &tmp))?;
        fs::rename(&tmp, &self.path).map_err(io_error("replace", &self.path))?;
        Ok(())
    }

    /// The current record, loading it first if needed.
    pub fn state(&mut self) -> Result<&SprintState, StateError> {
        if self.state.is_none() {
            self.load()?;
        }
        Ok(self.state.get_or_insert_with(SprintState::default))
    }

    /// Mutable access to the current record. Callers must [`save`](Self::save).
    pub fn state_mut(&mut self) -> Result<&mut SprintState, StateError> {
        if self.state.is_none() {
            self.load()?;
        }
        Ok(self.state.get_or_insert_with(SprintState::default))
    }

    /// Read a value by dotted key (e.g. `sprint.status`).
    ///
    /// Returns `None` when any segment is missing, an intermediate value is
    /// not a mapping, or the value is `null`.
    pub fn get(&mut self, key: &str) -> Result<Option<Value>, StateError> {
        let segments = path::split_key(key)?;
        let root = serde_json::to_value(self.state()?)?;
        Ok(path::lookup(&root, &segments).cloned())
    }

    /// Read a value by dotted key, falling back to `default`.
    pub fn get_or(&mut self, key: &str, default: Value) -> Result<Value, StateError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Write a value by dotted key, creating intermediate mappings.
    ///
    /// The whole record is re-validated. A value that breaks the schema (for
    /// example an unknown status) or that the schema would store in another
    /// form is rejected and nothing changes, so an accepted write always reads
    /// back unchanged. `null` means absent: `get` returns `None` afterwards.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), StateError> {
        let segments = path::split_key(key)?;
        let mut root = serde_json::to_value(self.state()?)?;
        path::insert(&mut root, &segments, value.clone());
        let updated: SprintState =
            serde_json::from_value(root).map_err(|source| StateError::InvalidValue {
                key: key.to_string(),
                source,
            })?;

        let stored = serde_json::to_value(&updated)?;
        let expected = if value.is_null() { None } else { Some(&value) };
        let actual = path::lookup(&stored, &segments);
        if actual != expected {
            return Err(StateError::Coerced {
                key: key.to_string(),
                stored: actual.map_or_else(|| "nothing".to_string(), Value::to_string),
            });
        }

        *self.state_mut()? = updated;
        Ok(())
    }

    pub fn has_active_sprint(&mut self) -> Result<bool, StateError> {
        Ok(self.state()?.has_active_sprint())
    }

    pub fn task(&mut self, task_id: &str) -> Result<Option<Task>, StateError> {
        Ok(self.state()?.task(task_id).cloned())
    }

    pub fn pending_tasks(&mut self) -> Result<Vec<Task>, StateError> {
        Ok(self.state()?.pending_tasks().into_iter().cloned().collect())
    }

    /// Apply `update` to the task with `task_id`. Returns `false` if absent.
    pub fn update_task<F>(&mut self, task_id: &str, update: F) -> Result<bool, StateError>
    where
        F: FnOnce(&mut Task),
    {
        match self.state_mut()?.task_mut(task_id) {
            Some(task) => {
                update(task);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), StateError> {
        self.state_mut()?.plan.tasks.push(task);
        Ok(())
    }

    /// Replace the record with the default one and persist it.
    pub fn reset(&mut self) -> Result<(), StateError> {
        self.state = Some(SprintState::default());
        self.save()
    }

    /// Begin a new sprint record and persist it.
    ///
    /// The previous sprint's tasks, blackboard and metrics are dropped; keys
    /// outside the schema are kept. Status moves to `context_analysis`.
    pub fn start_sprint(&mut self, objective: &str) -> Result<String, StateError> {
        let sprint_id = format!("sprint-{}", Local::now().format("%Y-%m-%d-%H%M%S"));
        let extra = std::mem::take(&mut self.state_mut()?.extra);

        let mut fresh = SprintState {
            extra,
            ..SprintState::default()
        };
        fresh.sprint.id = Some(sprint_id.clone());
        fresh.sprint.objective = Some(objective.to_string());
        fresh.sprint.status = SprintStatus::ContextAnalysis;

        self.state = Some(fresh);
        self.save()?;
        Ok(sprint_id)
    }

    pub fn unresolved_blockers(&mut self) -> Result<Vec<Blocker>, StateError> {
        Ok(self.state()?.unresolved_blockers().into_iter().cloned().collect())
    }

    pub fn unanswered_questions(&mut self) -> Result<Vec<Question>, StateError> {
        Ok(self.state()?.unanswered_questions().into_iter().cloned().collect())
    }

    pub fn sprint_metrics(&mut self) -> Result<SprintMetrics, StateError> {
        Ok(self.state()?.sprint_metrics())
    }

    // Blackboard

    pub fn post_message(
        &mut self,
        agent: &str,
        kind: &str,
        content: &str,
        severity: Severity,
    ) -> Result<(), StateError> {
        self.state_mut()?.blackboard.messages.push(Message {
            timestamp: timestamp(),
            agent: agent.to_string(),
            kind: kind.to_string(),
            content: content.to_string(),
            severity,
        });
        self.save()
    }

    pub fn post_blocker(
        &mut self,
        agent: &str,
        task_id: &str,
        description: &str,
        error: Option<&str>,
    ) -> Result<(), StateError> {
        self.state_mut()?.blackboard.blockers.push(Blocker {
            timestamp: timestamp(),
            agent: agent.to_string(),
            task_id: task_id.to_string(),
            description: description.to_string(),
            error: error.map(str::to_string),
            resolved: false,
            resolution: None,
            resolved_at: None,
        });
        self.save()
    }

    pub fn post_insight(&mut self, agent: &str, insight: &str) -> Result<(), StateError> {
        self.state_mut()?.blackboard.insights.push(Insight {
            timestamp: timestamp(),
            agent: agent.to_string(),
            insight: insight.to_string(),
        });
        self.save()
    }

    pub fn post_question(
        &mut self,
        agent: &str,
        question: &str,
        context: Option<&str>,
    ) -> Result<(), StateError> {
        self.state_mut()?.blackboard.questions.push(Question {
            timestamp: timestamp(),
            agent: agent.to_string(),
            question: question.to_string(),
            context: context.map(str::to_string),
            answered: false,
        });
        self.save()
    }

    /// Mark the blocker at `index` resolved. Returns `false` if out of range.
    pub fn resolve_blocker(&mut self, index: usize, resolution: &str) -> Result<bool, StateError> {
        let Some(blocker) = self.state_mut()?.blackboard.blockers.get_mut(index) else {
            return Ok(false);
        };
        blocker.resolved = true;
        blocker.resolution = Some(resolution.to_string());
        blocker.resolved_at = Some(timestamp());
        self.save()?;
        Ok(true)
    }

    /// Mark the question at `index` answered. Returns `false` if out of range.
    pub fn answer_question(&mut self, index: usize) -> Result<bool, StateError> {
        let Some(question) = self.state_mut()?.blackboard.questions.get_mut(index) else {
            return Ok(false);
        };
        question.answered = true;
        self.save()?;
        Ok(true)
    }

    // Metrics

    pub fn record_token_usage(&mut self, role: AgentRole, tokens: u64) -> Result<(), StateError> {
        *self
            .state_mut()?
            .metrics
            .token_usage
            .entry(role.as_str().to_string())
            .or_insert(0) += tokens;
        self.save()
    }

    pub fn record_agent_invocation(&mut self, role: AgentRole) -> Result<(), StateError> {
        *self
            .state_mut()?
            .metrics
            .agent_invocations
            .entry(role.as_str().to_string())
            .or_insert(0) += 1;
        self.save()
    }

    /// Record the latest duration of `phase`, overwriting any earlier value.
    pub fn record_phase_time(&mut self, phase: &str, seconds: f64) -> Result<(), StateError> {
        self.state_mut()?
            .metrics
            .phase_times
            .insert(phase.to_string(), seconds);
        self.save()
    }

    /// Recompute task statistics from the current plan.
    pub fn update_task_stats(&mut self) -> Result<TaskStats, StateError> {
        let state = self.state_mut()?;
        let stats = TaskStats::from_tasks(&state.plan.tasks);
        state.metrics.task_stats = stats;
        self.save()?;
        Ok(stats)
    }
}
