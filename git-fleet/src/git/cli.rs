//! [`GitProvider`] backed by the `git` command line.

use crate::git::{GitError, GitProvider, PullOutcome, WorktreeStatus};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Drives the system `git` binary.
///
/// When a token is set it is embedded into http(s) clone URLs, so later
/// pushes to `origin` authenticate too.
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    token: Option<String>,
    identity: Option<(String, String)>,
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticates clones with a GitHub token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|token: &String| !token.is_empty());
        self
    }

    /// Commits as the given author instead of the ambient git config.
    #[must_use]
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.identity = Some((name.into(), email.into()));
        self
    }

    /// Runs git in `dir`, returning stdout on success.
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        let command = self.redact(&args.join(" "));
        debug!(dir = %dir.display(), %command, "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GitError::Spawn {
                command: command.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::CommandFailed {
                command,
                stderr: self.redact(stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) => text.replace(token.as_str(), "***"),
            None => text.to_string(),
        }
    }
}

/// Embeds `token` as `x-access-token` credentials into an http(s) URL.
///
/// Other URLs (ssh, file, local paths) are returned unchanged.
///
/// # Errors
///
/// Returns [`GitError::InvalidUrl`] if an http(s) URL cannot carry credentials.
pub fn authenticated_url(url: &str, token: &str) -> Result<String, GitError> {
    let Ok(mut parsed) = Url::parse(url) else {
        return Ok(url.to_string());
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return Ok(url.to_string());
    }

    let invalid = || GitError::InvalidUrl {
        url: url.to_string(),
    };
    parsed.set_username("x-access-token").map_err(|()| invalid())?;
    parsed.set_password(Some(token)).map_err(|()| invalid())?;
    Ok(parsed.into())
}

#[async_trait]
impl GitProvider for GitCli {
    async fn clone_repository(&self, url: &str, dir: &Path) -> Result<(), GitError> {
        let url = match &self.token {
            Some(token) => authenticated_url(url, token)?,
            None => url.to_string(),
        };
        self.run(dir, &["clone", &url, "."]).await.map(|_| ())
    }

    async fn head(&self, dir: &Path) -> Result<String, GitError> {
        let stdout = self.run(dir, &["rev-parse", "HEAD"]).await?;
        Ok(stdout.trim().to_string())
    }

    async fn create_branch(
        &self,
        dir: &Path,
        branch: &str,
        start_point: &str,
    ) -> Result<(), GitError> {
        match self.run(dir, &["checkout", "-b", branch, start_point]).await {
            Err(GitError::CommandFailed { stderr, .. }) if stderr.contains("already exists") => {
                Err(GitError::BranchAlreadyExists {
                    branch: branch.to_string(),
                })
            }
            result => result.map(|_| ()),
        }
    }

    async fn pull_branch(&self, dir: &Path, branch: &str) -> Result<PullOutcome, GitError> {
        match self.run(dir, &["pull", "--ff-only", "origin", branch]).await {
            Ok(stdout) if stdout.contains("Already up to date") || stdout.contains("Already up-to-date") => {
                Ok(PullOutcome::AlreadyUpToDate)
            }
            Ok(_) => Ok(PullOutcome::Updated),
            Err(GitError::CommandFailed { stderr, .. })
                if stderr.contains("couldn't find remote ref") =>
            {
                Ok(PullOutcome::RemoteBranchMissing)
            }
            Err(e) => Err(e),
        }
    }

    async fn status(&self, dir: &Path) -> Result<WorktreeStatus, GitError> {
        let stdout = self
            .run(dir, &["status", "--porcelain=v1", "-z", "--untracked-files=all"])
            .await?;
        Ok(WorktreeStatus::parse_porcelain(&stdout))
    }

    async fn add(&self, dir: &Path, path: &str) -> Result<(), GitError> {
        self.run(dir, &["add", "--", path]).await.map(|_| ())
    }

    async fn commit_all(&self, dir: &Path, message: &str) -> Result<(), GitError> {
        let mut args: Vec<String> = Vec::new();
        if let Some((name, email)) = &self.identity {
            args.extend([
                "-c".to_string(),
                format!("user.name={name}"),
                "-c".to_string(),
                format!("user.email={email}"),
            ]);
        }
        args.extend(["commit", "-a", "-m", message].map(String::from));

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(dir, &args).await.map(|_| ())
    }

    async fn push_branch(&self, dir: &Path, branch: &str) -> Result<(), GitError> {
        self.run(dir, &["push", "origin", branch]).await.map(|_| ())
    }
}
