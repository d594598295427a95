//! Read-only terminal dashboard over the sprint state file.

mod app;
mod render;
mod run;

pub use app::{DashboardApp, REFRESH_INTERVAL};
pub use run::run_dashboard;
