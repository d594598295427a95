//! Handoff packets: one self-contained instruction document per task.
//!
//! Packet assembly is pure. [`save_packet`] is the only disk write.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::state::Task;

/// Characters of the context summary copied into a packet.
pub const CONTEXT_EXCERPT_CHARS: usize = 2000;
/// Characters of the plan copied into a packet.
pub const PLAN_EXCERPT_CHARS: usize = 3000;

const CLOSING_LINE: &str =
    "Execute this task following the guidelines in the MADE Executor prompt.";

/// First `max_chars` characters of `text`, never splitting a character.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

/// Build the handoff packet for `task`.
///
/// Dependencies, files and acceptance criteria sections are omitted when
/// their lists are empty.
pub fn generate_packet(task: &Task, context_summary: &str, plan_content: &str) -> String {
    let mut lines: Vec<String> = vec![
        "# Handoff Packet".into(),
        String::new(),
        "## Task Context".into(),
        format!("**Task ID:** {}", or_placeholder(&task.id, "unknown")),
        format!("**Title:** {}", or_placeholder(&task.title, "untitled")),
        format!("**Status:** {}", task.status),
        String::new(),
        "## Task Description".into(),
        or_placeholder(&task.description, "No description provided.").into(),
        String::new(),
    ];

    if !task.dependencies.is_empty() {
        lines.push("## Dependencies".into());
        lines.push("The following tasks must be completed before this one:".into());
        lines.push(String::new());
        lines.extend(task.dependencies.iter().map(|dep| format!("- {}", dep)));
        lines.push(String::new());
    }

    if !task.files_to_modify.is_empty() {
        lines.push("## Files to Modify".into());
        lines.push(String::new());
        lines.extend(task.files_to_modify.iter().map(|f| format!("- `{}`", f)));
        lines.push(String::new());
    }

    if !task.acceptance_criteria.is_empty() {
        lines.push("## Acceptance Criteria".into());
        lines.push(String::new());
        lines.extend(task.acceptance_criteria.iter().map(|c| format!("- [ ] {}", c)));
        lines.push(String::new());
    }

    let context = if context_summary.is_empty() {
        "No context summary available."
    } else {
        excerpt(context_summary, CONTEXT_EXCERPT_CHARS)
    };
    let plan = if plan_content.is_empty() {
        "No plan available."
    } else {
        excerpt(plan_content, PLAN_EXCERPT_CHARS)
    };

    lines.extend([
        "## Repository Context (Summary)".into(),
        String::new(),
        context.into(),
        String::new(),
        "## Full Plan Reference".into(),
        String::new(),
        "For complete context, see the full plan:".into(),
        "```markdown".into(),
        plan.into(),
        "```".into(),
        String::new(),
        "---".into(),
        String::new(),
        CLOSING_LINE.into(),
    ]);

    lines.join("\n")
}

/// One packet per task, keyed by task id. Tasks without an id get
/// `task-<n>`, where `n` is the number of packets generated so far.
pub fn generate_batch_packets(
    tasks: &[Task],
    context_summary: &str,
    plan_content: &str,
) -> BTreeMap<String, String> {
    let mut packets = BTreeMap::new();
    for task in tasks {
        let key = if task.id.is_empty() {
            format!("task-{}", packets.len())
        } else {
            task.id.clone()
        };
        packets.insert(key, generate_packet(task, context_summary, plan_content));
    }
    packets
}

/// Write `packet` to `<output_dir>/<task_id>_handoff.md`, creating the
/// directory if needed.
pub fn save_packet(task_id: &str, packet: &str, output_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}_handoff.md", task_id));
    fs::write(&path, packet)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskStatus;
    use tempfile::TempDir;

    fn full_task() -> Task {
        let mut task = Task::new("task-002", "Build login form");
        task.description = "wire up form".into();
        task.dependencies = vec!["task-001".into()];
        task.files_to_modify = vec!["src/login.rs".into()];
        task.acceptance_criteria = vec!["Form submits".into()];
        task
    }

    #[test]
    fn test_packet_includes_every_section() {
        let packet = generate_packet(&full_task(), "summary text", "plan text");

        assert!(packet.starts_with("# Handoff Packet\n\n## Task Context\n"));
        assert!(packet.contains("**Task ID:** task-002"));
        assert!(packet.contains("**Title:** Build login form"));
        assert!(packet.contains("**Status:** pending"));
        assert!(packet.contains("## Task Description\nwire up form\n"));
        assert!(packet.contains(
            "## Dependencies\nThe following tasks must be completed before this one:\n\n- task-001\n"
        ));
        assert!(packet.contains("## Files to Modify\n\n- `src/login.rs`\n"));
        assert!(packet.contains("## Acceptance Criteria\n\n- [ ] Form submits\n"));
        assert!(packet.contains("## Repository Context (Summary)\n\nsummary text\n"));
        assert!(packet.contains("```markdown\nplan text\n```"));
        assert!(packet.ends_with("---\n\nExecute this task following the guidelines in the MADE Executor prompt."));
    }

    #[test]
    fn test_empty_lists_omit_sections() {
        let task = Task::new("task-001", "Bare");
        let packet = generate_packet(&task, "", "");

        assert!(!packet.contains("## Dependencies"));
        assert!(!packet.contains("## Files to Modify"));
        assert!(!packet.contains("## Acceptance Criteria"));
        assert!(packet.contains("No description provided."));
        assert!(packet.contains("No context summary available."));
        assert!(packet.contains("No plan available."));
    }

    #[test]
    fn test_excerpts_are_truncated_by_characters() {
        let context = "é".repeat(2500);
        let plan = "ü".repeat(3500);
        let packet = generate_packet(&Task::new("t", "t"), &context, &plan);

        assert!(packet.contains(&"é".repeat(2000)));
        assert!(!packet.contains(&"é".repeat(2001)));
        assert!(packet.contains(&"ü".repeat(3000)));
        assert!(!packet.contains(&"ü".repeat(3001)));
    }

    #[test]
    fn test_excerpt_shorter_than_limit() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef", 3), "abc");
        assert_eq!(excerpt("", 3), "");
    }

    #[test]
    fn test_status_reflects_task() {
        let mut task = Task::new("task-001", "t");
        task.status = TaskStatus::InProgress;
        assert!(generate_packet(&task, "", "").contains("**Status:** in_progress"));
    }

    #[test]
    fn test_batch_packets_synthesize_missing_ids() {
        let tasks = vec![Task::new("task-001", "a"), Task::new("", "b")];
        let packets = generate_batch_packets(&tasks, "", "");

        assert_eq!(packets.len(), 2);
        assert!(packets.contains_key("task-001"));
        assert!(packets["task-1"].contains("**Title:** b"));
    }

    #[test]
    fn test_save_packet_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("session_logs").join("handoffs");

        let path = save_packet("task-001", "# Handoff Packet", &dir).unwrap();
        assert_eq!(path, dir.join("task-001_handoff.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "# Handoff Packet");
    }
}
