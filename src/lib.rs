//! vibe: a sprint orchestrator for AI coding agents.
//!
//! A sprint walks through four phases, each driven by an external AI CLI:
//! the context agent summarizes the repository, the plan agent is asked for
//! a `PLAN.md`, the exec agent works through the parsed tasks one by one,
//! and the plan agent optionally reviews the result.
//!
//! All progress lives in one JSON state file at the project root:
//! - `.vibe_state.json` - sprint record, tasks, blackboard and metrics
//! - `session_logs/` - per-sprint markdown logs and context summaries
//! - `session_logs/handoffs/` - the packet each task was handed off with
//! - `session_logs/telemetry/` - saved efficiency reports

pub mod agents;
pub mod color;
pub mod config;
pub mod handoff;
pub mod logging;
pub mod plan;
pub mod process;
pub mod process_registry;
pub mod prompt;
pub mod shutdown;
pub mod state;
pub mod telemetry;
pub mod tui;
pub mod workflow;
