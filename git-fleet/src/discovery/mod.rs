//! Repository selection.
//!
//! Turns a [`RepoSelection`] into the list of repositories a run processes,
//! by listing an organization, running a search, or resolving `org/name`
//! entries from a file, flags or stdin. Entries that cannot be used are
//! recorded in the [`OutcomeTracker`] rather than dropped.

mod error;
mod selection;

pub use error::DiscoveryError;
pub use selection::{RepoSelection, SelectionMode};

use crate::github::{RepositoriesApi, PER_PAGE};
use crate::summary::{OutcomeEvent, OutcomeTracker};
use crate::types::{AllowedRepo, RepositoryDescriptor};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Maximum results GitHub search will return for one query.
const MAX_SEARCH_RESULTS: usize = 1000;

/// Qualifiers that only make sense for code search.
const CODE_SEARCH_QUALIFIERS: [&str; 5] = ["path:", "filename:", "extension:", "in:file", "in:path"];

/// Allow-list entries split into usable and malformed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRepos {
    pub valid: Vec<AllowedRepo>,
    pub malformed: Vec<String>,
}

/// Parses `org/name` entries. Blank entries are ignored.
pub fn parse_allowed_repos<I, S>(entries: I) -> ParsedRepos
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedRepos::default();
    for entry in entries {
        let entry = entry.as_ref().trim();
        if entry.is_empty() {
            continue;
        }
        match AllowedRepo::parse(entry) {
            Some(repo) => parsed.valid.push(repo),
            None => parsed.malformed.push(entry.to_string()),
        }
    }
    parsed
}

/// Splits piped input into entries on any whitespace.
pub fn parse_stdin_repos(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

/// Reads and parses an allow-list file with one `org/name` per line.
///
/// # Errors
///
/// Returns [`DiscoveryError::IoError`] if the file cannot be read.
pub fn read_allowed_repos_file(path: &Path) -> Result<ParsedRepos, DiscoveryError> {
    let content = std::fs::read_to_string(path).map_err(|e| DiscoveryError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_allowed_repos(content.lines()))
}

/// Returns true if `query` uses a qualifier that requires code search.
pub fn is_code_search_query(query: &str) -> bool {
    CODE_SEARCH_QUALIFIERS
        .iter()
        .any(|qualifier| query.contains(qualifier))
}

/// Appends an `org:` qualifier when an organization is given.
fn build_search_query(query: &str, org: Option<&str>) -> String {
    match org {
        Some(org) => format!("{} org:{}", query.trim(), org),
        None => query.trim().to_string(),
    }
}

/// Resolves a selection into the repositories to process.
///
/// # Errors
///
/// Returns [`DiscoveryError`] on API failures other than 404, an unreadable
/// allow-list file, an empty organization, or when nothing usable remains.
pub async fn select_repositories<A>(
    api: &A,
    selection: &RepoSelection,
    skip_archived: bool,
    tracker: &OutcomeTracker,
) -> Result<Vec<Arc<RepositoryDescriptor>>, DiscoveryError>
where
    A: RepositoriesApi + ?Sized,
{
    let span = info_span!("select_repositories", mode = %selection.mode());

    async {
        let repositories = match selection {
            RepoSelection::Organization { org } => {
                fetch_org_repositories(api, org, skip_archived, tracker).await?
            }
            RepoSelection::Search { query, org } => {
                search(api, query, org.as_deref(), skip_archived, tracker).await?
            }
            RepoSelection::ReposFile { path } => {
                let parsed = read_allowed_repos_file(path)?;
                resolve_allowed_repos(api, parsed, tracker).await?
            }
            RepoSelection::Explicit { repos } | RepoSelection::Stdin { repos } => {
                resolve_allowed_repos(api, parse_allowed_repos(repos), tracker).await?
            }
        };

        if repositories.is_empty() {
            return Err(DiscoveryError::NoValidRepos);
        }

        info!(count = repositories.len(), "Repository selection complete");
        Ok(repositories)
    }
    .instrument(span)
    .await
}

/// Lists every repository of an organization.
async fn fetch_org_repositories<A>(
    api: &A,
    org: &str,
    skip_archived: bool,
    tracker: &OutcomeTracker,
) -> Result<Vec<Arc<RepositoryDescriptor>>, DiscoveryError>
where
    A: RepositoriesApi + ?Sized,
{
    let mut fetched = Vec::new();
    let mut page = 1;
    loop {
        let repos = api.list_org_repositories(org, page).await?;
        let last_page = repos.len() < PER_PAGE;
        debug!(org, page, count = repos.len(), "Fetched organization page");
        fetched.extend(repos);
        if last_page {
            break;
        }
        page += 1;
    }

    if fetched.is_empty() {
        return Err(DiscoveryError::NoReposFound {
            org: org.to_string(),
        });
    }

    Ok(filter_archived(
        fetched.into_iter().map(Arc::new).collect(),
        skip_archived,
        tracker,
    ))
}

/// Runs a repository or code search.
async fn search<A>(
    api: &A,
    query: &str,
    org: Option<&str>,
    skip_archived: bool,
    tracker: &OutcomeTracker,
) -> Result<Vec<Arc<RepositoryDescriptor>>, DiscoveryError>
where
    A: RepositoriesApi + ?Sized,
{
    let query = build_search_query(query, org);

    if !is_code_search_query(&query) {
        debug!(query = %query, "Executing repository search");
        let mut fetched = Vec::new();
        let mut page = 1;
        loop {
            let repos = api.search_repositories(&query, page).await?;
            let last_page = repos.len() < PER_PAGE;
            fetched.extend(repos);
            if last_page || fetched.len() >= MAX_SEARCH_RESULTS {
                break;
            }
            page += 1;
        }
        return Ok(filter_archived(
            fetched.into_iter().map(Arc::new).collect(),
            skip_archived,
            tracker,
        ));
    }

    debug!(query = %query, "Executing code search");
    let mut hits = Vec::new();
    let mut page = 1;
    loop {
        let page_hits = api.search_code(&query, page).await?;
        let last_page = page_hits.len() < PER_PAGE;
        hits.extend(page_hits);
        if hits.len() >= MAX_SEARCH_RESULTS {
            warn!(max = MAX_SEARCH_RESULTS, "Reached maximum search results limit");
            break;
        }
        if last_page {
            break;
        }
        page += 1;
    }

    let parsed = ParsedRepos {
        valid: deduplicate_results(hits),
        malformed: Vec::new(),
    };
    let resolved = resolve_allowed_repos(api, parsed, tracker).await?;
    Ok(filter_archived(resolved, skip_archived, tracker))
}

/// Deduplicates search hits by repository full name, keeping the first.
fn deduplicate_results(results: Vec<AllowedRepo>) -> Vec<AllowedRepo> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|repo| seen.insert(repo.to_string()))
        .collect()
}

/// Looks up every valid entry and records the unusable ones.
async fn resolve_allowed_repos<A>(
    api: &A,
    parsed: ParsedRepos,
    tracker: &OutcomeTracker,
) -> Result<Vec<Arc<RepositoryDescriptor>>, DiscoveryError>
where
    A: RepositoriesApi + ?Sized,
{
    for entry in &parsed.malformed {
        warn!(entry = %entry, "Skipping malformed repository entry");
        let placeholder = Arc::new(RepositoryDescriptor::placeholder("", entry.as_str()));
        tracker.record(OutcomeEvent::MalformedInput, &placeholder);
    }

    let mut repositories = Vec::with_capacity(parsed.valid.len());
    for allowed in &parsed.valid {
        match api.get_repository(&allowed.organization, &allowed.name).await {
            Ok(repo) => repositories.push(Arc::new(repo)),
            Err(e) if e.is_not_found() => {
                warn!(repo = %allowed, "Repository not found, skipping");
                let placeholder = Arc::new(RepositoryDescriptor::placeholder(
                    allowed.organization.as_str(),
                    allowed.name.as_str(),
                ));
                tracker.record(OutcomeEvent::RepoNotFound, &placeholder);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(repositories)
}

/// Records every listed repository and drops archived ones when asked.
fn filter_archived(
    fetched: Vec<Arc<RepositoryDescriptor>>,
    skip_archived: bool,
    tracker: &OutcomeTracker,
) -> Vec<Arc<RepositoryDescriptor>> {
    let mut kept = Vec::with_capacity(fetched.len());
    for repo in fetched {
        tracker.record(OutcomeEvent::FetchedViaApi, &repo);
        if skip_archived && repo.archived {
            debug!(repo = %repo, "Skipping archived repository");
            tracker.record(OutcomeEvent::ArchivedSkipped, &repo);
            continue;
        }
        kept.push(repo);
    }
    kept
}
