use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use crate::state::{SprintState, StateStore};

/// How often the state file is re-read.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Dashboard state: the latest snapshot of the sprint record.
pub struct DashboardApp {
    store: StateStore,
    /// Last successfully loaded record.
    pub(super) snapshot: SprintState,
    /// Error from the most recent refresh, if it failed.
    pub(super) error: Option<String>,
    /// First visible row of the task list.
    pub(super) task_offset: usize,
    pub(super) should_quit: bool,
    last_refresh: Option<Instant>,
}

impl DashboardApp {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            snapshot: SprintState::default(),
            error: None,
            task_offset: 0,
            should_quit: false,
            last_refresh: None,
        }
    }

    pub fn snapshot(&self) -> &SprintState {
        &self.snapshot
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Re-read the state file now.
    pub fn refresh(&mut self) {
        self.last_refresh = Some(Instant::now());
        self.reload();
    }

    fn reload(&mut self) {
        match self.store.load() {
            Ok(state) => {
                self.snapshot = state.clone();
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
        let max = self.snapshot.plan.tasks.len().saturating_sub(1);
        self.task_offset = self.task_offset.min(max);
    }

    /// Refresh if `REFRESH_INTERVAL` has passed since the last one.
    pub fn tick(&mut self, now: Instant) {
        let due = match self.last_refresh {
            Some(last) => now.duration_since(last) >= REFRESH_INTERVAL,
            None => true,
        };
        if due {
            self.last_refresh = Some(now);
            self.reload();
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.task_offset + 1 < self.snapshot.plan.tasks.len() {
                    self.task_offset += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.task_offset = self.task_offset.saturating_sub(1);
            }
            KeyCode::Home | KeyCode::Char('g') => self.task_offset = 0,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SprintStatus, Task};
    use tempfile::TempDir;

    fn store_with_tasks(tmp: &TempDir, count: usize) -> StateStore {
        let mut store = StateStore::new(tmp.path());
        store.start_sprint("Add auth").unwrap();
        for i in 1..=count {
            store
                .add_task(Task::new(format!("task-{:03}", i), format!("Task {}", i)))
                .unwrap();
        }
        store.save().unwrap();
        StateStore::new(tmp.path())
    }

    #[test]
    fn test_first_tick_loads_state() {
        let tmp = TempDir::new().unwrap();
        let mut app = DashboardApp::new(store_with_tasks(&tmp, 2));

        app.tick(Instant::now());
        assert_eq!(app.snapshot().sprint.status, SprintStatus::ContextAnalysis);
        assert_eq!(app.snapshot().plan.tasks.len(), 2);
        assert!(app.error.is_none());
    }

    #[test]
    fn test_tick_waits_for_interval() {
        let tmp = TempDir::new().unwrap();
        let mut app = DashboardApp::new(store_with_tasks(&tmp, 1));
        let start = Instant::now();
        app.tick(start);

        let mut writer = StateStore::new(tmp.path());
        writer.add_task(Task::new("task-002", "Later")).unwrap();
        writer.save().unwrap();

        app.tick(start);
        assert_eq!(app.snapshot().plan.tasks.len(), 1);

        app.tick(start + REFRESH_INTERVAL + Duration::from_millis(10));
        assert_eq!(app.snapshot().plan.tasks.len(), 2);
    }

    #[test]
    fn test_quit_keys() {
        for key in [KeyCode::Char('q'), KeyCode::Esc] {
            let tmp = TempDir::new().unwrap();
            let mut app = DashboardApp::new(StateStore::new(tmp.path()));
            app.handle_key(key);
            assert!(app.should_quit());
        }
    }

    #[test]
    fn test_scroll_is_clamped() {
        let tmp = TempDir::new().unwrap();
        let mut app = DashboardApp::new(store_with_tasks(&tmp, 2));
        app.refresh();

        app.handle_key(KeyCode::Up);
        assert_eq!(app.task_offset, 0);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Down);
        assert_eq!(app.task_offset, 1);
        app.handle_key(KeyCode::Char('g'));
        assert_eq!(app.task_offset, 0);
    }
}
