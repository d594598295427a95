//! Plan document parsing.
//!
//! A plan is markdown authored outside vibe. Each task opens with a
//! `## Task` or `### Task` heading; bold-label bullets inside it fill the
//! task's fields:
//!
//! ```text
//! ### Task 1: Build login form
//! - **ID:** login-form
//! - **Description:** wire up form
//! - **Dependencies:** task-000
//! - **Files:** `src/login.rs`, `src/routes.rs`
//! - **Acceptance Criteria:**
//!   - [ ] Form submits
//! ```
//!
//! Lines that match nothing are ignored; a malformed plan yields fewer
//! populated fields, never an error.

use crate::state::Task;

/// Which multi-line section of the current task we are inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    AcceptanceCriteria,
}

/// `## Task 1: ...` / `### Task: ...` / `## Task` but not `## Tasks`.
fn is_task_heading(line: &str) -> bool {
    let rest = match line
        .strip_prefix("### Task")
        .or_else(|| line.strip_prefix("## Task"))
    {
        Some(rest) => rest,
        None => return false,
    };
    match rest.chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || c == ':' || c.is_ascii_digit(),
    }
}

fn heading_title(line: &str) -> String {
    match line.split_once(':') {
        Some((_, title)) => title.trim().to_string(),
        None => line.trim_start_matches('#').trim().to_string(),
    }
}

fn is_heading(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Split `- **Label:** value` (or `**Label:** value`) into label and value.
fn bold_label(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix("- **")
        .or_else(|| trimmed.strip_prefix("**"))?;
    let end = rest.find("**")?;
    let label = rest[..end].trim().trim_end_matches(':').trim();
    let value = rest[end + 2..].trim_start_matches(':').trim();
    Some((label, value))
}

/// `Acceptance Criteria:` written as plain text, optionally as a list item.
fn is_plain_criteria_label(line: &str) -> bool {
    let text = line.trim_start().trim_start_matches(['-', '*']).trim_start();
    text.get(..19)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("acceptance criteria"))
}

fn split_list(value: &str) -> Vec<String> {
    if value.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    value
        .split(',')
        .map(|item| item.trim().trim_matches('`').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse every task in `content`, in document order.
///
/// Ids default to `task-001`, `task-002`, ... by position. Parsing is pure:
/// the same document always yields the same tasks.
pub fn parse_plan(content: &str) -> Vec<Task> {
    let mut tasks = Vec::new();
    let mut current: Option<Task> = None;
    let mut section = Section::Other;

    for line in content.lines() {
        if is_task_heading(line) {
            if let Some(task) = current.take() {
                tasks.push(task);
            }
            let id = format!("task-{:03}", tasks.len() + 1);
            current = Some(Task::new(id, heading_title(line)));
            section = Section::Other;
            continue;
        }

        let Some(task) = current.as_mut() else {
            continue;
        };

        if let Some((label, value)) = bold_label(line) {
            section = Section::Other;
            if label.to_ascii_lowercase().contains("acceptance criteria") {
                section = Section::AcceptanceCriteria;
            } else if label.eq_ignore_ascii_case("id") {
                if !value.is_empty() {
                    task.id = value.to_string();
                }
            } else if label.eq_ignore_ascii_case("description") {
                task.description = value.to_string();
            } else if label.eq_ignore_ascii_case("dependencies") {
                task.dependencies = split_list(value);
            } else if label.eq_ignore_ascii_case("files")
                || label.eq_ignore_ascii_case("files to modify")
            {
                task.files_to_modify = split_list(value);
            }
            continue;
        }

        if is_plain_criteria_label(line) {
            section = Section::AcceptanceCriteria;
            continue;
        }

        if is_heading(line) {
            section = if line.contains("Acceptance Criteria") {
                Section::AcceptanceCriteria
            } else {
                Section::Other
            };
            continue;
        }

        if section == Section::AcceptanceCriteria {
            if let Some(criterion) = line.trim_start().strip_prefix("- [ ]") {
                let criterion = criterion.trim();
                if !criterion.is_empty() {
                    task.acceptance_criteria.push(criterion.to_string());
                }
            }
        }
    }

    if let Some(task) = current {
        tasks.push(task);
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskStatus;

    #[test]
    fn test_parse_title_and_description() {
        let plan = "### Task 1: Build login form\n- **Description:** wire up form\n";
        let tasks = parse_plan(plan);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "task-001");
        assert_eq!(tasks[0].title, "Build login form");
        assert_eq!(tasks[0].description, "wire up form");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert_eq!(tasks[0].assigned_agent, "exec-agent");
    }

    #[test]
    fn test_heading_without_colon_uses_header_text() {
        let tasks = parse_plan("## Task 3\n");
        assert_eq!(tasks[0].title, "Task 3");
    }

    #[test]
    fn test_sequential_ids_and_id_override() {
        let plan = "\
## Task 1: First
## Task 2: Second
- **ID:** custom-id
### Task 3: Third
";
        let ids: Vec<String> = parse_plan(plan).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["task-001", "custom-id", "task-003"]);
    }

    #[test]
    fn test_tasks_section_heading_is_not_a_task() {
        let plan = "## Tasks\n\n### Task 1: Real\n";
        let tasks = parse_plan(plan);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Real");
    }

    #[test]
    fn test_lists_are_comma_separated() {
        let plan = "\
### Task 2: Wire routes
- **Dependencies:** task-001, task-000
- **Files to Modify:** `src/routes.rs`, src/main.rs
";
        let task = &parse_plan(plan)[0];
        assert_eq!(task.dependencies, vec!["task-001", "task-000"]);
        assert_eq!(task.files_to_modify, vec!["src/routes.rs", "src/main.rs"]);

        let none = parse_plan("### Task 1: x\n- **Dependencies:** None\n");
        assert!(none[0].dependencies.is_empty());
    }

    #[test]
    fn test_acceptance_criteria_scoped_to_section() {
        let plan = "\
# Plan

### Task 1: Login
- [ ] not a criterion, no section yet
- **Acceptance Criteria:**
  - [ ] Form submits
  - [ ] Errors are shown
- **Files:** src/login.rs
- [ ] after another label, ignored

### Task 2: Logout
- [ ] new task closes the section
#### Acceptance Criteria
- [ ] Session cleared
";
        let tasks = parse_plan(plan);
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks[0].acceptance_criteria,
            vec!["Form submits", "Errors are shown"]
        );
        assert_eq!(tasks[0].files_to_modify, vec!["src/login.rs"]);
        assert_eq!(tasks[1].acceptance_criteria, vec!["Session cleared"]);
    }

    #[test]
    fn test_plain_acceptance_criteria_label_opens_section() {
        let plan = "\
### Task 1: Login
Acceptance Criteria:
- [ ] Form submits
- [ ] Errors are shown

### Task 2: Logout
- acceptance criteria
- [ ] Session cleared
- **Files:** src/logout.rs
- [ ] after another label, ignored
";
        let tasks = parse_plan(plan);
        assert_eq!(
            tasks[0].acceptance_criteria,
            vec!["Form submits", "Errors are shown"]
        );
        assert_eq!(tasks[1].acceptance_criteria, vec!["Session cleared"]);
    }

    #[test]
    fn test_acceptance_mention_elsewhere_does_not_leak() {
        let plan = "\
Acceptance Criteria are listed per task.

### Task 1: Only task
- [ ] stray checkbox
";
        let tasks = parse_plan(plan);
        assert!(tasks[0].acceptance_criteria.is_empty());
    }

    #[test]
    fn test_lines_before_first_task_are_ignored() {
        let plan = "- **Description:** orphan\n### Task 1: Real\n";
        let tasks = parse_plan(plan);
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].description.is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let plan = "\
### Task 1: A
- **Description:** first
- **Acceptance Criteria:**
- [ ] done
### Task 2: B
";
        assert_eq!(parse_plan(plan), parse_plan(plan));
    }

    #[test]
    fn test_empty_document_has_no_tasks() {
        assert!(parse_plan("").is_empty());
        assert!(parse_plan("# Just a title\n\nSome prose.").is_empty());
    }
}
