//! Outcome tracking and run reports.

mod event;
mod run_report;
mod tracker;

pub use event::OutcomeEvent;
pub use run_report::RunReport;
pub use tracker::OutcomeTracker;
