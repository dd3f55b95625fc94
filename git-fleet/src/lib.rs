#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod config;
pub mod discovery;
pub mod git;
pub mod github;
pub mod pipeline;
pub mod pull_requests;
pub mod rate_limit;
pub mod runner;
pub mod summary;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, FileConfig, RunConfig, ValidationError};
pub use discovery::{
    parse_allowed_repos, select_repositories, DiscoveryError, ParsedRepos, RepoSelection,
    SelectionMode,
};
pub use git::{GitCli, GitError, GitProvider};
pub use github::{ApiError, GitHubApi, GitHubClient};
pub use pipeline::{process_repository, PipelineContext, PipelineOutcome, StageError};
pub use pull_requests::{DispatchOutcome, DispatchSettings, PullRequestDispatcher};
pub use rate_limit::{RateLimitInfo, RateLimitSignal, RateLimitedTransport};
pub use runner::{Runner, RunnerError};
pub use summary::{OutcomeEvent, OutcomeTracker, RunReport};
pub use types::{AllowedRepo, RepositoryDescriptor};
