//! Run report types.

use crate::discovery::SelectionMode;
use crate::summary::OutcomeEvent;
use crate::types::RepositoryDescriptor;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Snapshot of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Repositories per event. Only events that occurred are present.
    pub events: BTreeMap<OutcomeEvent, Vec<RepositoryDescriptor>>,

    /// Opened pull request URLs by repository full name.
    pub pull_requests: BTreeMap<String, String>,

    /// Opened draft pull request URLs by repository full name.
    pub draft_pull_requests: BTreeMap<String, String>,

    /// How the repositories were selected, if known.
    pub selection_mode: Option<SelectionMode>,

    /// Command that was run in every repository.
    pub command: Vec<String>,

    /// Wall time of the run.
    pub elapsed: Duration,

    /// Whether changes were pushed directly instead of via pull requests.
    pub skip_pull_requests: bool,
}

impl RunReport {
    /// Returns the repositories recorded under `event`.
    #[must_use]
    pub fn repositories(&self, event: OutcomeEvent) -> &[RepositoryDescriptor] {
        self.events.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns how many repositories were recorded under `event`.
    #[must_use]
    pub fn count(&self, event: OutcomeEvent) -> usize {
        self.repositories(event).len()
    }

    /// Returns true if any repository hit a failure event.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.events
            .iter()
            .any(|(event, repos)| event.is_failure() && !repos.is_empty())
    }

    /// Returns true if no repository hit a failure event.
    #[must_use]
    pub fn all_success(&self) -> bool {
        !self.has_failures()
    }
}
