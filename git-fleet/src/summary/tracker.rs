//! Concurrency-safe ledger of per-repository outcomes.

use crate::discovery::SelectionMode;
use crate::summary::{OutcomeEvent, RunReport};
use crate::types::RepositoryDescriptor;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::trace;

/// Repositories recorded under one event, in recording order.
#[derive(Debug, Default)]
struct EventLedger {
    repos: Vec<Arc<RepositoryDescriptor>>,
    names: HashSet<String>,
}

impl EventLedger {
    fn insert(&mut self, repo: &Arc<RepositoryDescriptor>) -> bool {
        if !self.names.insert(repo.full_name()) {
            return false;
        }
        self.repos.push(Arc::clone(repo));
        true
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    events: BTreeMap<OutcomeEvent, EventLedger>,
    pull_requests: BTreeMap<String, String>,
    draft_pull_requests: BTreeMap<String, String>,
}

/// Records what happened to every repository in a run.
///
/// Shared by all pipelines; every method takes `&self`. A repository is
/// recorded at most once per event, keyed by its full name.
#[derive(Debug)]
pub struct OutcomeTracker {
    state: Mutex<TrackerState>,
    started: Instant,
}

impl Default for OutcomeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeTracker {
    /// Creates an empty tracker; the run clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            started: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `event` for `repo`. Returns false if it was already recorded.
    pub fn record(&self, event: OutcomeEvent, repo: &Arc<RepositoryDescriptor>) -> bool {
        let recorded = self.lock().events.entry(event).or_default().insert(repo);
        if recorded {
            trace!(repo = %repo.full_name(), event = %event, "Recording outcome");
        }
        recorded
    }

    /// Records `event` for every repository in `repos`.
    pub fn record_all(&self, event: OutcomeEvent, repos: &[Arc<RepositoryDescriptor>]) {
        let mut state = self.lock();
        let ledger = state.events.entry(event).or_default();
        let recorded = repos.iter().filter(|repo| ledger.insert(repo)).count();
        trace!(event = %event, recorded, "Recording outcomes");
    }

    /// Remembers the URL of an opened pull request.
    pub fn record_pull_request(&self, repo_name: &str, url: &str) {
        self.lock()
            .pull_requests
            .insert(repo_name.to_string(), url.to_string());
    }

    /// Remembers the URL of an opened draft pull request.
    pub fn record_draft_pull_request(&self, repo_name: &str, url: &str) {
        self.lock()
            .draft_pull_requests
            .insert(repo_name.to_string(), url.to_string());
    }

    /// Returns the repositories recorded under `event`, in recording order.
    pub fn repositories(&self, event: OutcomeEvent) -> Vec<Arc<RepositoryDescriptor>> {
        self.lock()
            .events
            .get(&event)
            .map(|ledger| ledger.repos.clone())
            .unwrap_or_default()
    }

    /// Snapshots the ledger into a report.
    pub fn report(
        &self,
        command: &[String],
        selection_mode: Option<SelectionMode>,
        skip_pull_requests: bool,
    ) -> RunReport {
        let state = self.lock();
        let events = state
            .events
            .iter()
            .filter(|(_, ledger)| !ledger.repos.is_empty())
            .map(|(event, ledger)| {
                let repos: Vec<RepositoryDescriptor> =
                    ledger.repos.iter().map(|repo| repo.as_ref().clone()).collect();
                (*event, repos)
            })
            .collect();

        RunReport {
            events,
            pull_requests: state.pull_requests.clone(),
            draft_pull_requests: state.draft_pull_requests.clone(),
            selection_mode,
            command: command.to_vec(),
            elapsed: self.started.elapsed(),
            skip_pull_requests,
        }
    }
}
