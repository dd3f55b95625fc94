//! CLI for git-fleet.
//!
//! Runs a command in a clone of every selected repository and opens a pull
//! request for each repository the command changed.

use clap::Parser;
use git_fleet::config::{api_base_from_env, token_from_env};
use git_fleet::discovery::parse_stdin_repos;
use git_fleet::{FileConfig, RepoSelection, RunConfig, RunReport, Runner};
use std::error::Error;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// git-fleet - Run a command across many GitHub repositories and open pull requests with the changes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Branch to create in every repository.
    #[arg(long, short = 'b')]
    branch_name: Option<String>,

    /// Branch pull requests target. Defaults to each repository's default branch.
    #[arg(long)]
    base_branch_name: Option<String>,

    /// Commit message for the changes.
    #[arg(long, short = 'm')]
    commit_message: Option<String>,

    /// Pull request title. Defaults to the commit message when that is set.
    #[arg(long)]
    pull_request_title: Option<String>,

    /// Pull request body. Defaults to the commit message when that is set.
    #[arg(long)]
    pull_request_description: Option<String>,

    /// Run the command and commit locally, but never push or open pull requests.
    #[arg(long)]
    dry_run: bool,

    /// Push changes straight to the branch instead of opening pull requests.
    #[arg(long)]
    skip_pull_requests: bool,

    /// Open pull requests as drafts.
    #[arg(long)]
    draft: bool,

    /// Ignore archived repositories when selecting by organization or search.
    #[arg(long)]
    skip_archived_repos: bool,

    /// Maximum repositories processed at once (0 = unbounded).
    #[arg(long)]
    max_concurrent_repos: Option<usize>,

    /// Maximum clones running at once (0 = unbounded).
    #[arg(long)]
    max_concurrent_clones: Option<usize>,

    /// Minimum seconds between pull request creations.
    #[arg(long)]
    seconds_between_prs: Option<u64>,

    /// Maximum retries for a rate-limited pull request.
    #[arg(long)]
    max_pr_retries: Option<u32>,

    /// Seconds to wait when a rate-limit response gives no usable delay.
    #[arg(long)]
    seconds_to_wait_when_rate_limited: Option<u64>,

    /// Users to request reviews from (comma separated).
    #[arg(long, value_delimiter = ',')]
    reviewers: Vec<String>,

    /// Teams to request reviews from (comma separated).
    #[arg(long, value_delimiter = ',')]
    team_reviewers: Vec<String>,

    /// Users to assign to each pull request (comma separated).
    #[arg(long, value_delimiter = ',')]
    assignees: Vec<String>,

    /// Process every repository of this organization.
    #[arg(long, short = 'o', env = "GIT_FLEET_GITHUB_ORG")]
    github_org: Option<String>,

    /// Process repositories matching this GitHub search query.
    #[arg(long)]
    github_search: Option<String>,

    /// File listing repositories to process, one `owner/name` per line.
    #[arg(long)]
    repos: Option<PathBuf>,

    /// A repository to process (`owner/name`). May be repeated.
    #[arg(long = "repo", short = 'r')]
    repo: Vec<String>,

    /// TOML file with defaults for any of the flags above.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,

    /// Log level filter, overriding `RUST_LOG`.
    #[arg(long)]
    loglevel: Option<String>,

    /// Command (and arguments) to run in every repository.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.loglevel.as_deref());

    // reqwest's rustls backend needs a process-wide crypto provider.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let (runner, selection) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(1);
        }
    };

    match runner.execute(&selection).await {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        error!(error = %e, "Failed to serialize run report");
                        return ExitCode::from(2);
                    }
                }
            } else {
                print_report(&report);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Installs a compact fmt subscriber.
///
/// `--loglevel` wins over `RUST_LOG`; without either, `info` is used.
fn init_tracing(level: Option<&str>) {
    let filter = level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(filter)
        .init();
}

/// Validates inputs and builds the runner and repository selection.
fn prepare(args: &Args) -> Result<(Runner, RepoSelection), Box<dyn Error>> {
    let file = args.config.as_deref().map(FileConfig::load).transpose()?;
    let config = build_config(args, file.as_ref());
    config.validate()?;

    let token = token_from_env()?;
    let selection = RepoSelection::from_inputs(
        args.github_org.clone(),
        args.github_search.clone(),
        args.repos.clone(),
        args.repo.clone(),
        read_stdin_repos(args)?,
    )?;

    let runner = Runner::from_token(config, &token, &api_base_from_env())?;
    Ok((runner, selection))
}

fn build_config(args: &Args, file: Option<&FileConfig>) -> RunConfig {
    let branch_name = args
        .branch_name
        .clone()
        .or_else(|| file.and_then(|file| file.branch_name.clone()))
        .unwrap_or_default();

    let mut config = RunConfig::new(branch_name, args.command.clone())
        .with_base_branch_name(args.base_branch_name.clone())
        .with_dry_run(args.dry_run)
        .with_skip_pull_requests(args.skip_pull_requests)
        .with_draft(args.draft)
        .with_skip_archived_repos(args.skip_archived_repos)
        .with_reviewers(args.reviewers.clone(), args.team_reviewers.clone())
        .with_assignees(args.assignees.clone());

    if let Some(message) = &args.commit_message {
        config = config.with_commit_message(message);
    }
    if let Some(title) = &args.pull_request_title {
        config = config.with_pull_request_title(title);
    }
    if let Some(description) = &args.pull_request_description {
        config = config.with_pull_request_description(description);
    }
    if let Some(max) = args.max_concurrent_repos {
        config = config.with_max_concurrent_repos(max);
    }
    if let Some(max) = args.max_concurrent_clones {
        config = config.with_max_concurrent_clones(max);
    }
    if let Some(seconds) = args.seconds_between_prs {
        config = config.with_seconds_between_prs(seconds);
    }
    if let Some(retries) = args.max_pr_retries {
        config = config.with_max_pr_retries(retries);
    }
    if let Some(seconds) = args.seconds_to_wait_when_rate_limited {
        config = config.with_seconds_to_wait_when_rate_limited(seconds);
    }

    match file {
        Some(file) => config.merge_file(file),
        None => config,
    }
}

/// Reads repositories piped on stdin when no other selection was given.
fn read_stdin_repos(args: &Args) -> std::io::Result<Vec<String>> {
    let selected = args.github_org.is_some()
        || args.github_search.is_some()
        || args.repos.is_some()
        || !args.repo.is_empty();
    let stdin = std::io::stdin();
    if selected || stdin.is_terminal() {
        return Ok(Vec::new());
    }

    let mut input = String::new();
    stdin.lock().read_to_string(&mut input)?;
    Ok(parse_stdin_repos(&input))
}

/// Prints the run report as text.
fn print_report(report: &RunReport) {
    println!("\nRun summary");
    if let Some(mode) = report.selection_mode {
        println!("  Selection: {mode}");
    }
    println!("  Command: {}", report.command.join(" "));
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());

    for (event, repos) in &report.events {
        println!("\n  {} ({}):", event.description(), repos.len());
        for repo in repos {
            println!("    - {}", repo.full_name());
        }
    }

    if !report.pull_requests.is_empty() {
        println!("\n  Pull requests opened:");
        for (repo, url) in &report.pull_requests {
            println!("    - {repo}: {url}");
        }
    }
    if !report.draft_pull_requests.is_empty() {
        println!("\n  Draft pull requests opened:");
        for (repo, url) in &report.draft_pull_requests {
            println!("    - {repo}: {url}");
        }
    }
    if report.skip_pull_requests {
        println!("\n  Pull requests were skipped; changes were pushed directly.");
    }
}
