use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::state::{AgentRole, Severity, SprintStatus, TaskStatus};

use super::app::DashboardApp;

/// Recent blackboard messages shown in the activity panel.
const RECENT_MESSAGES: usize = 5;

fn border() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(border())
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(Color::White))
}

fn status_color(status: SprintStatus) -> Color {
    match status {
        SprintStatus::NotStarted => Color::DarkGray,
        SprintStatus::Completed => Color::Green,
        SprintStatus::Paused => Color::Yellow,
        _ => Color::Cyan,
    }
}

fn task_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::InProgress => Color::Blue,
        TaskStatus::Completed => Color::Green,
        TaskStatus::Failed => Color::Red,
    }
}

fn task_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
        TaskStatus::Failed => "[!]",
    }
}

/// Draw the whole dashboard.
pub(super) fn draw_dashboard(f: &mut Frame, app: &DashboardApp) {
    let size = f.area();
    f.render_widget(Clear, size);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(f, rows[0], app);
    draw_progress(f, rows[1], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[2]);
    draw_tasks(f, body[0], app);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(body[1]);
    draw_metrics(f, side[0], app);
    draw_blackboard(f, side[1], app);

    draw_footer(f, rows[3], app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let sprint = &app.snapshot.sprint;
    let lines = vec![
        Line::from(vec![
            Span::styled(
                "vibe ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(sprint.id.as_deref().unwrap_or("no sprint")),
            Span::raw("  "),
            Span::styled(
                sprint.status.as_str(),
                Style::default()
                    .fg(status_color(sprint.status))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Objective: ", Style::default().fg(Color::DarkGray)),
            Span::raw(sprint.objective.as_deref().unwrap_or("-")),
        ]),
    ];
    let header = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(border()),
    );
    f.render_widget(header, area);
}

fn draw_progress(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let stats = app.snapshot.metrics.task_stats;
    let ratio = if stats.total == 0 {
        0.0
    } else {
        (stats.completed as f64 / stats.total as f64).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .block(panel("Progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{}/{} tasks completed", stats.completed, stats.total));
    f.render_widget(gauge, area);
}

fn draw_tasks(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let tasks = &app.snapshot.plan.tasks;
    let items: Vec<ListItem> = if tasks.is_empty() {
        vec![ListItem::new(Span::styled(
            "No tasks loaded",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        tasks
            .iter()
            .skip(app.task_offset)
            .map(|task| {
                let color = task_color(task.status);
                ListItem::new(Line::from(vec![
                    Span::styled(task_marker(task.status), Style::default().fg(color)),
                    Span::raw(" "),
                    Span::styled(task.id.as_str(), Style::default().fg(Color::DarkGray)),
                    Span::raw(" "),
                    Span::raw(task.display_name()),
                ]))
            })
            .collect()
    };
    f.render_widget(List::new(items).block(panel("Tasks")), area);
}

fn draw_metrics(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let state = &app.snapshot;
    let mut lines: Vec<Line> = AgentRole::ALL
        .iter()
        .map(|role| {
            let tokens = state
                .metrics
                .token_usage
                .get(role.as_str())
                .copied()
                .unwrap_or(0);
            let runs = state
                .metrics
                .agent_invocations
                .get(role.as_str())
                .copied()
                .unwrap_or(0);
            Line::from(format!(
                "{:<14}{:>10} tokens {:>4} runs",
                role.as_str(),
                tokens,
                runs
            ))
        })
        .collect();
    lines.push(Line::from(format!(
        "{:<14}{:>10} tokens",
        "total",
        state.total_tokens()
    )));
    lines.push(Line::from(format!(
        "success rate  {:>9.1}%",
        state.success_rate()
    )));
    f.render_widget(Paragraph::new(lines).block(panel("Metrics")), area);
}

fn draw_blackboard(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let state = &app.snapshot;
    let mut lines: Vec<Line> = Vec::new();

    let blockers = state.unresolved_blockers();
    lines.push(Line::from(Span::styled(
        format!("Blockers ({} unresolved)", blockers.len()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for blocker in blockers {
        lines.push(Line::from(Span::styled(
            format!("  [{}] {}", blocker.agent, blocker.description),
            Style::default().fg(Color::Red),
        )));
    }

    let questions = state.unanswered_questions();
    lines.push(Line::from(Span::styled(
        format!("Questions ({} unanswered)", questions.len()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for question in questions {
        lines.push(Line::from(Span::styled(
            format!("  [{}] {}", question.agent, question.question),
            Style::default().fg(Color::Yellow),
        )));
    }

    let messages = &state.blackboard.messages;
    lines.push(Line::from(Span::styled(
        "Recent messages",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    let skip = messages.len().saturating_sub(RECENT_MESSAGES);
    for message in messages.iter().skip(skip) {
        let color = match message.severity {
            Severity::Info => Color::White,
            Severity::Warning => Color::Yellow,
            Severity::Error => Color::Red,
        };
        lines.push(Line::from(Span::styled(
            format!("  [{}] {}", message.agent, message.content),
            Style::default().fg(color),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(panel("Blackboard"))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let line = match app.error {
        Some(ref error) => Line::from(Span::styled(
            format!(" error: {}", error),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(
            " q/Esc quit  r refresh  j/k scroll",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
    use tempfile::TempDir;

    use super::*;
    use crate::state::{StateStore, Task};

    fn buffer_to_string(buf: &Buffer) -> String {
        let area = buf.area;
        let mut lines = Vec::new();
        for y in area.y..area.y + area.height {
            let mut line = String::new();
            for x in area.x..area.x + area.width {
                line.push_str(buf[(x, y)].symbol());
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    fn render(app: &DashboardApp) -> String {
        let backend = TestBackend::new(120, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw_dashboard(f, app)).unwrap();
        buffer_to_string(terminal.backend().buffer())
    }

    #[test]
    fn test_renders_empty_state() {
        let tmp = TempDir::new().unwrap();
        let mut app = DashboardApp::new(StateStore::new(tmp.path()));
        app.refresh();

        let screen = render(&app);
        assert!(screen.contains("no sprint"));
        assert!(screen.contains("No tasks loaded"));
        assert!(screen.contains("0/0 tasks completed"));
    }

    #[test]
    fn test_renders_sprint_tasks_and_blockers() {
        let tmp = TempDir::new().unwrap();
        let mut store = StateStore::new(tmp.path());
        store.start_sprint("Add auth").unwrap();
        let mut done = Task::new("task-001", "Build login form");
        done.status = TaskStatus::Completed;
        store.add_task(done).unwrap();
        store.add_task(Task::new("task-002", "Wire routes")).unwrap();
        store.update_task_stats().unwrap();
        store
            .post_blocker("exec-agent", "task-002", "Routes missing", None)
            .unwrap();

        let mut app = DashboardApp::new(StateStore::new(tmp.path()));
        app.refresh();
        let screen = render(&app);

        assert!(screen.contains("context_analysis"));
        assert!(screen.contains("Objective: Add auth"));
        assert!(screen.contains("[x] task-001 Build login form"));
        assert!(screen.contains("[ ] task-002 Wire routes"));
        assert!(screen.contains("1/2 tasks completed"));
        assert!(screen.contains("Blockers (1 unresolved)"));
        assert!(screen.contains("[exec-agent] Routes missing"));
    }
}
