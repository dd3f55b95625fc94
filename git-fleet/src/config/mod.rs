//! Run configuration and pre-run validation.
//!
//! A [`RunConfig`] is built once before the fleet run starts and is read-only
//! afterwards. Values can come from CLI flags or from an optional TOML file
//! ([`FileConfig`]); flags win.

mod error;
mod file;

pub use error::{ConfigError, ValidationError};
pub use file::FileConfig;

use std::time::Duration;

/// Environment variable holding the GitHub API token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_OAUTH_TOKEN";

/// Environment variable selecting a GitHub Enterprise host.
pub const HOSTNAME_ENV_VAR: &str = "GITHUB_HOSTNAME";

pub const DEFAULT_COMMIT_MESSAGE: &str = "git-fleet programmatic commit";
pub const DEFAULT_PULL_REQUEST_TITLE: &str = "git-fleet programmatic pull request";
pub const DEFAULT_PULL_REQUEST_DESCRIPTION: &str = "git-fleet programmatic pull request";
pub const DEFAULT_MAX_CONCURRENT_REPOS: usize = 0;
pub const DEFAULT_MAX_CONCURRENT_CLONES: usize = 4;
pub const DEFAULT_SECONDS_BETWEEN_PRS: u64 = 1;
pub const DEFAULT_MAX_PR_RETRIES: u32 = 3;
pub const DEFAULT_SECONDS_TO_WAIT_WHEN_RATE_LIMITED: u64 = 60;

/// Configuration for a single fleet run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Branch to create (or reuse) in every repository.
    branch_name: String,
    /// Base branch for pull requests; the repo default branch when unset.
    base_branch_name: Option<String>,
    /// Commit message for the single commit per repository.
    commit_message: String,
    /// Pull request title.
    pull_request_title: String,
    /// Pull request body.
    pull_request_description: String,
    /// Whether to skip pushing and opening pull requests.
    dry_run: bool,
    /// Whether to push directly to the branch instead of opening pull requests.
    skip_pull_requests: bool,
    /// Whether to open pull requests as drafts.
    draft: bool,
    /// Whether archived repositories are dropped during selection.
    skip_archived_repos: bool,
    /// Maximum repositories processed at once (0 = unbounded).
    max_concurrent_repos: usize,
    /// Maximum clones running at once (0 = unbounded).
    max_concurrent_clones: usize,
    /// Minimum spacing between pull request creations.
    seconds_between_prs: u64,
    /// Maximum retries for a rate-limited pull request.
    max_pr_retries: u32,
    /// Fallback wait when a rate-limit response gives no usable delay.
    seconds_to_wait_when_rate_limited: u64,
    /// Users asked to review each pull request.
    reviewers: Vec<String>,
    /// Teams asked to review each pull request.
    team_reviewers: Vec<String>,
    /// Users assigned to each pull request.
    assignees: Vec<String>,
    /// Program and arguments run inside every clone.
    command: Vec<String>,
}

impl RunConfig {
    /// Creates a configuration with defaults for everything but the branch and command.
    pub fn new(branch_name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            branch_name: branch_name.into(),
            base_branch_name: None,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            pull_request_title: DEFAULT_PULL_REQUEST_TITLE.to_string(),
            pull_request_description: DEFAULT_PULL_REQUEST_DESCRIPTION.to_string(),
            dry_run: false,
            skip_pull_requests: false,
            draft: false,
            skip_archived_repos: false,
            max_concurrent_repos: DEFAULT_MAX_CONCURRENT_REPOS,
            max_concurrent_clones: DEFAULT_MAX_CONCURRENT_CLONES,
            seconds_between_prs: DEFAULT_SECONDS_BETWEEN_PRS,
            max_pr_retries: DEFAULT_MAX_PR_RETRIES,
            seconds_to_wait_when_rate_limited: DEFAULT_SECONDS_TO_WAIT_WHEN_RATE_LIMITED,
            reviewers: Vec::new(),
            team_reviewers: Vec::new(),
            assignees: Vec::new(),
            command,
        }
    }

    /// Sets the base branch pull requests target. Empty strings are ignored.
    #[must_use]
    pub fn with_base_branch_name(mut self, base_branch_name: Option<String>) -> Self {
        self.base_branch_name = base_branch_name.filter(|name| !name.is_empty());
        self
    }

    #[must_use]
    pub fn with_commit_message(mut self, commit_message: impl Into<String>) -> Self {
        self.commit_message = commit_message.into();
        self
    }

    #[must_use]
    pub fn with_pull_request_title(mut self, title: impl Into<String>) -> Self {
        self.pull_request_title = title.into();
        self
    }

    #[must_use]
    pub fn with_pull_request_description(mut self, description: impl Into<String>) -> Self {
        self.pull_request_description = description.into();
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_skip_pull_requests(mut self, skip_pull_requests: bool) -> Self {
        self.skip_pull_requests = skip_pull_requests;
        self
    }

    #[must_use]
    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    #[must_use]
    pub fn with_skip_archived_repos(mut self, skip_archived_repos: bool) -> Self {
        self.skip_archived_repos = skip_archived_repos;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_repos(mut self, max: usize) -> Self {
        self.max_concurrent_repos = max;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_clones(mut self, max: usize) -> Self {
        self.max_concurrent_clones = max;
        self
    }

    /// Sets the pull request pacing interval. Values below one second are raised to one.
    #[must_use]
    pub fn with_seconds_between_prs(mut self, seconds: u64) -> Self {
        self.seconds_between_prs = seconds.max(DEFAULT_SECONDS_BETWEEN_PRS);
        self
    }

    #[must_use]
    pub fn with_max_pr_retries(mut self, retries: u32) -> Self {
        self.max_pr_retries = retries;
        self
    }

    #[must_use]
    pub fn with_seconds_to_wait_when_rate_limited(mut self, seconds: u64) -> Self {
        self.seconds_to_wait_when_rate_limited = seconds;
        self
    }

    #[must_use]
    pub fn with_reviewers(mut self, reviewers: Vec<String>, team_reviewers: Vec<String>) -> Self {
        self.reviewers = reviewers;
        self.team_reviewers = team_reviewers;
        self
    }

    #[must_use]
    pub fn with_assignees(mut self, assignees: Vec<String>) -> Self {
        self.assignees = assignees;
        self
    }

    /// Fills every setting the CLI left unset from a config file.
    ///
    /// Only settings still at their defaults are overwritten.
    #[must_use]
    pub fn merge_file(mut self, file: &FileConfig) -> Self {
        if self.base_branch_name.is_none() {
            self = self.with_base_branch_name(file.base_branch_name.clone());
        }
        if self.commit_message == DEFAULT_COMMIT_MESSAGE {
            if let Some(message) = &file.commit_message {
                self.commit_message = message.clone();
            }
        }
        if self.pull_request_title == DEFAULT_PULL_REQUEST_TITLE {
            if let Some(title) = &file.pull_request_title {
                self.pull_request_title = title.clone();
            }
        }
        if self.pull_request_description == DEFAULT_PULL_REQUEST_DESCRIPTION {
            if let Some(description) = &file.pull_request_description {
                self.pull_request_description = description.clone();
            }
        }
        self.dry_run |= file.dry_run.unwrap_or(false);
        self.skip_pull_requests |= file.skip_pull_requests.unwrap_or(false);
        self.draft |= file.draft.unwrap_or(false);
        self.skip_archived_repos |= file.skip_archived_repos.unwrap_or(false);
        if self.max_concurrent_repos == DEFAULT_MAX_CONCURRENT_REPOS {
            self.max_concurrent_repos = file.max_concurrent_repos.unwrap_or(self.max_concurrent_repos);
        }
        if self.max_concurrent_clones == DEFAULT_MAX_CONCURRENT_CLONES {
            self.max_concurrent_clones =
                file.max_concurrent_clones.unwrap_or(self.max_concurrent_clones);
        }
        if self.seconds_between_prs == DEFAULT_SECONDS_BETWEEN_PRS {
            if let Some(seconds) = file.seconds_between_prs {
                self = self.with_seconds_between_prs(seconds);
            }
        }
        if self.max_pr_retries == DEFAULT_MAX_PR_RETRIES {
            self.max_pr_retries = file.max_pr_retries.unwrap_or(self.max_pr_retries);
        }
        if self.seconds_to_wait_when_rate_limited == DEFAULT_SECONDS_TO_WAIT_WHEN_RATE_LIMITED {
            self.seconds_to_wait_when_rate_limited = file
                .seconds_to_wait_when_rate_limited
                .unwrap_or(self.seconds_to_wait_when_rate_limited);
        }
        if self.reviewers.is_empty() {
            self.reviewers = file.reviewers.clone();
        }
        if self.team_reviewers.is_empty() {
            self.team_reviewers = file.team_reviewers.clone();
        }
        if self.assignees.is_empty() {
            self.assignees = file.assignees.clone();
        }
        self
    }

    /// Checks the settings that must be right before any repository is touched.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a missing command or a missing or invalid branch name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(ValidationError::NoCommand);
        }
        if self.branch_name.trim().is_empty() {
            return Err(ValidationError::NoBranchName);
        }
        validate_branch_name(&self.branch_name)
    }

    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    pub fn base_branch_name(&self) -> Option<&str> {
        self.base_branch_name.as_deref()
    }

    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    /// Returns the pull request title, falling back to a custom commit message.
    pub fn pull_request_title(&self) -> &str {
        if self.pull_request_title == DEFAULT_PULL_REQUEST_TITLE
            && self.commit_message != DEFAULT_COMMIT_MESSAGE
        {
            return &self.commit_message;
        }
        &self.pull_request_title
    }

    /// Returns the pull request body, falling back to a custom commit message.
    pub fn pull_request_description(&self) -> &str {
        if self.pull_request_description == DEFAULT_PULL_REQUEST_DESCRIPTION
            && self.commit_message != DEFAULT_COMMIT_MESSAGE
        {
            return &self.commit_message;
        }
        &self.pull_request_description
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn skip_pull_requests(&self) -> bool {
        self.skip_pull_requests
    }

    pub fn draft(&self) -> bool {
        self.draft
    }

    pub fn skip_archived_repos(&self) -> bool {
        self.skip_archived_repos
    }

    /// Returns the repository concurrency limit, `None` when unbounded.
    pub fn max_concurrent_repos(&self) -> Option<usize> {
        (self.max_concurrent_repos > 0).then_some(self.max_concurrent_repos)
    }

    /// Returns the clone concurrency limit, `None` when unbounded.
    pub fn max_concurrent_clones(&self) -> Option<usize> {
        (self.max_concurrent_clones > 0).then_some(self.max_concurrent_clones)
    }

    pub fn pr_interval(&self) -> Duration {
        Duration::from_secs(self.seconds_between_prs)
    }

    pub fn max_pr_retries(&self) -> u32 {
        self.max_pr_retries
    }

    pub fn rate_limit_fallback(&self) -> Duration {
        Duration::from_secs(self.seconds_to_wait_when_rate_limited)
    }

    pub fn reviewers(&self) -> &[String] {
        &self.reviewers
    }

    pub fn team_reviewers(&self) -> &[String] {
        &self.team_reviewers
    }

    pub fn assignees(&self) -> &[String] {
        &self.assignees
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }
}

/// Checks that `name` can be used as a branch name.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidBranchName`] when git would reject the name.
pub fn validate_branch_name(name: &str) -> Result<(), ValidationError> {
    gix_validate::reference::name_partial(bstr::BStr::new(name))
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidBranchName {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

/// Reads the API token from [`TOKEN_ENV_VAR`].
///
/// # Errors
///
/// Returns [`ValidationError::MissingToken`] if the variable is unset or empty.
pub fn token_from_env() -> Result<String, ValidationError> {
    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ValidationError::MissingToken {
            env_var: TOKEN_ENV_VAR,
        }),
    }
}

/// Returns the REST API base URL, honouring [`HOSTNAME_ENV_VAR`] for GitHub Enterprise.
pub fn api_base_from_env() -> String {
    match std::env::var(HOSTNAME_ENV_VAR) {
        Ok(host) if !host.trim().is_empty() => format!("https://{}/api/v3", host.trim()),
        _ => crate::github::DEFAULT_API_BASE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Vec<String> {
        vec!["touch".to_string(), "file.txt".to_string()]
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = RunConfig::new("fleet-branch", command());

        assert_eq!(config.commit_message(), DEFAULT_COMMIT_MESSAGE);
        assert_eq!(config.pull_request_title(), DEFAULT_PULL_REQUEST_TITLE);
        assert_eq!(config.max_concurrent_repos(), None);
        assert_eq!(config.max_concurrent_clones(), Some(4));
        assert_eq!(config.pr_interval(), Duration::from_secs(1));
        assert_eq!(config.max_pr_retries(), 3);
        assert_eq!(config.rate_limit_fallback(), Duration::from_secs(60));
        assert!(config.reviewers().is_empty());
        assert!(config.assignees().is_empty());
    }

    #[test]
    fn custom_commit_message_becomes_title_and_description() {
        let config = RunConfig::new("fleet-branch", command()).with_commit_message("Bump deps");

        assert_eq!(config.pull_request_title(), "Bump deps");
        assert_eq!(config.pull_request_description(), "Bump deps");

        let config = config.with_pull_request_title("Custom title");
        assert_eq!(config.pull_request_title(), "Custom title");
        assert_eq!(config.pull_request_description(), "Bump deps");
    }

    #[test]
    fn seconds_between_prs_has_floor_of_one() {
        let config = RunConfig::new("fleet-branch", command()).with_seconds_between_prs(0);
        assert_eq!(config.pr_interval(), Duration::from_secs(1));
    }

    #[test]
    fn zero_concurrency_means_unbounded() {
        let config = RunConfig::new("fleet-branch", command())
            .with_max_concurrent_repos(0)
            .with_max_concurrent_clones(0);
        assert_eq!(config.max_concurrent_repos(), None);
        assert_eq!(config.max_concurrent_clones(), None);
    }

    #[test]
    fn empty_base_branch_is_ignored() {
        let config =
            RunConfig::new("fleet-branch", command()).with_base_branch_name(Some(String::new()));
        assert_eq!(config.base_branch_name(), None);
    }

    #[test]
    fn validate_rejects_missing_command() {
        let config = RunConfig::new("fleet-branch", Vec::new());
        assert!(matches!(config.validate(), Err(ValidationError::NoCommand)));
    }

    #[test]
    fn validate_rejects_missing_branch() {
        let config = RunConfig::new("  ", command());
        assert!(matches!(config.validate(), Err(ValidationError::NoBranchName)));
    }

    #[test]
    fn validate_rejects_invalid_branch() {
        let config = RunConfig::new("bad..branch", command());
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBranchName { .. })
        ));
    }

    #[test]
    fn validate_accepts_nested_branch() {
        let config = RunConfig::new("fleet/update-ci", command());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn merge_file_only_fills_defaults() {
        let file = FileConfig {
            commit_message: Some("From file".to_string()),
            max_pr_retries: Some(9),
            reviewers: vec!["carol".to_string()],
            dry_run: Some(true),
            ..Default::default()
        };

        let config = RunConfig::new("fleet-branch", command())
            .with_max_pr_retries(5)
            .merge_file(&file);

        assert_eq!(config.commit_message(), "From file");
        assert_eq!(config.max_pr_retries(), 5);
        assert_eq!(config.reviewers(), ["carol".to_string()]);
        assert!(config.dry_run());
    }

    #[test]
    fn token_from_env_requires_value() {
        temp_env::with_var(TOKEN_ENV_VAR, None::<&str>, || {
            assert!(matches!(
                token_from_env(),
                Err(ValidationError::MissingToken { .. })
            ));
        });

        temp_env::with_var(TOKEN_ENV_VAR, Some(""), || {
            assert!(token_from_env().is_err());
        });

        temp_env::with_var(TOKEN_ENV_VAR, Some("ghp_example"), || {
            assert_eq!(token_from_env().unwrap(), "ghp_example");
        });
    }

    #[test]
    fn api_base_honours_enterprise_hostname() {
        temp_env::with_var(HOSTNAME_ENV_VAR, Some("github.example.com"), || {
            assert_eq!(api_base_from_env(), "https://github.example.com/api/v3");
        });

        temp_env::with_var(HOSTNAME_ENV_VAR, None::<&str>, || {
            assert_eq!(api_base_from_env(), "https://api.github.com");
        });
    }
}
