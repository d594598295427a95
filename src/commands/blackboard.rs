use clap::ValueEnum;

use vibe::color::{self, emoji};
use vibe::config::Config;
use vibe::state::SprintState;

use super::open_store;

/// Blackboard entries shown per message listing.
const RECENT_MESSAGES: usize = 10;

/// Longest error or context excerpt printed per entry.
const EXCERPT_CHARS: usize = 100;

/// Which blackboard sections `vibe blackboard` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BoardFilter {
    #[default]
    All,
    Blockers,
    Questions,
    Insights,
    Messages,
}

impl BoardFilter {
    fn shows(self, section: BoardFilter) -> bool {
        self == BoardFilter::All || self == section
    }
}

fn excerpt(text: &str) -> String {
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut)
}

/// 1-based index from the command line to the stored 0-based one.
fn zero_based(n: usize, kind: &str) -> Result<usize, String> {
    n.checked_sub(1)
        .ok_or_else(|| format!("{} numbers start at 1", kind))
}

/// Print blackboard sections and the attention summary.
pub fn cmd_blackboard(config: &Config, filter: BoardFilter) -> Result<(), String> {
    let mut store = open_store(config)?;
    let state = store.state().map_err(|e| e.to_string())?;

    println!("\n{} {}\n", emoji::TASK, color::label("Agent Blackboard"));
    if filter.shows(BoardFilter::Blockers) {
        print_blockers(state);
    }
    if filter.shows(BoardFilter::Questions) {
        print_questions(state);
    }
    if filter.shows(BoardFilter::Insights) {
        print_insights(state);
    }
    if filter.shows(BoardFilter::Messages) {
        print_messages(state);
    }

    let unresolved = state.unresolved_blockers().len();
    let unanswered = state.unanswered_questions().len();
    if unresolved > 0 || unanswered > 0 {
        println!(
            "{}\n",
            color::warning(&format!(
                "{}  Attention needed: {} blockers, {} questions",
                emoji::WARNING,
                unresolved,
                unanswered
            ))
        );
    }
    Ok(())
}

fn print_blockers(state: &SprintState) {
    let blockers = &state.blackboard.blockers;
    if blockers.is_empty() {
        return;
    }
    println!("{}", color::error(&format!("{}  Blockers", emoji::WARNING)));
    for (i, blocker) in blockers.iter().enumerate() {
        let status = if blocker.resolved {
            color::completed("✓ Resolved")
        } else {
            color::failed(&format!("{}  UNRESOLVED", emoji::WARNING))
        };
        println!("\n{}. [{}] {}", i + 1, blocker.agent.to_uppercase(), status);
        println!("   Task: {}", blocker.task_id);
        println!("   Description: {}", blocker.description);
        if let Some(ref error) = blocker.error {
            println!("   Error: {}", excerpt(error));
        }
        if let Some(ref resolution) = blocker.resolution {
            println!("   Resolution: {}", resolution);
        }
        println!("   Time: {}", color::timestamp(&blocker.timestamp));
    }
    println!();
}

fn print_questions(state: &SprintState) {
    let questions = &state.blackboard.questions;
    if questions.is_empty() {
        return;
    }
    println!("{}", color::warning(&format!("{} Questions", emoji::QUESTION)));
    for (i, question) in questions.iter().enumerate() {
        let status = if question.answered {
            color::completed("✓ Answered")
        } else {
            color::warning(&format!("{} UNANSWERED", emoji::QUESTION))
        };
        println!("\n{}. [{}] {}", i + 1, question.agent.to_uppercase(), status);
        println!("   Question: {}", question.question);
        if let Some(ref context) = question.context {
            println!("   Context: {}", excerpt(context));
        }
        println!("   Time: {}", color::timestamp(&question.timestamp));
    }
    println!();
}

fn print_insights(state: &SprintState) {
    let insights = &state.blackboard.insights;
    if insights.is_empty() {
        return;
    }
    println!("{}", color::info(&format!("{} Insights", emoji::BULB)));
    for (i, insight) in insights.iter().enumerate() {
        println!("\n{}. [{}]", i + 1, insight.agent.to_uppercase());
        println!("   {}", insight.insight);
        println!("   Time: {}", color::timestamp(&insight.timestamp));
    }
    println!();
}

fn print_messages(state: &SprintState) {
    let messages = &state.blackboard.messages;
    if messages.is_empty() {
        return;
    }
    println!("{}", color::label(&format!("{} Messages", emoji::MAIL)));
    let skip = messages.len().saturating_sub(RECENT_MESSAGES);
    for (i, message) in messages.iter().skip(skip).enumerate() {
        println!("\n{}. [{}] {}", i + 1, message.agent.to_uppercase(), message.kind);
        println!("   {}", color::severity(message.severity, &message.content));
        println!("   Time: {}", color::timestamp(&message.timestamp));
    }
    println!();
}

/// Mark blocker `number` (1-based) resolved.
pub fn cmd_resolve(config: &Config, number: usize, resolution: &str) -> Result<(), String> {
    let index = zero_based(number, "blocker")?;
    let mut store = open_store(config)?;
    if !store
        .resolve_blocker(index, resolution)
        .map_err(|e| e.to_string())?
    {
        return Err(format!("no blocker #{}", number));
    }
    println!("{} Blocker #{} resolved", emoji::CHECK, number);
    Ok(())
}

/// Record an operator question on the blackboard.
pub fn cmd_ask(config: &Config, question: &str, context: Option<&str>) -> Result<(), String> {
    let question = question.trim();
    if question.is_empty() {
        return Err("question must not be empty".to_string());
    }
    let mut store = open_store(config)?;
    store
        .post_question("operator", question, context)
        .map_err(|e| e.to_string())?;
    let count = store
        .state()
        .map_err(|e| e.to_string())?
        .blackboard
        .questions
        .len();
    println!("{} Question #{} posted", emoji::QUESTION, count);
    Ok(())
}

/// Mark question `number` (1-based) answered.
pub fn cmd_answer(config: &Config, number: usize) -> Result<(), String> {
    let index = zero_based(number, "question")?;
    let mut store = open_store(config)?;
    if !store.answer_question(index).map_err(|e| e.to_string())? {
        return Err(format!("no question #{}", number));
    }
    println!("{} Question #{} marked answered", emoji::CHECK, number);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_all_shows_every_section() {
        for section in [
            BoardFilter::Blockers,
            BoardFilter::Questions,
            BoardFilter::Insights,
            BoardFilter::Messages,
        ] {
            assert!(BoardFilter::All.shows(section));
            assert!(section.shows(section));
        }
        assert!(!BoardFilter::Blockers.shows(BoardFilter::Messages));
    }

    #[test]
    fn test_excerpt_truncates_by_chars() {
        let long = "é".repeat(150);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_zero_based_rejects_zero() {
        assert_eq!(zero_based(1, "blocker"), Ok(0));
        assert!(zero_based(0, "blocker").is_err());
    }
}
