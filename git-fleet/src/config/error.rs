//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("Failed to parse config file '{path}': {source}")]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Missing required file.
    #[error("Missing required file: {path}")]
    MissingFile { path: String },
}

/// Fatal problems detected before any repository is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No API token was exported.
    #[error("You must export a valid GitHub personal access token as {env_var}")]
    MissingToken { env_var: &'static str },

    /// No command or script to run.
    #[error("You must supply a valid command or script to execute")]
    NoCommand,

    /// No repository selection method was supplied.
    #[error(
        "You must target some repos for processing either via stdin or by providing one of the \
         --github-org, --github-search, --repos, or --repo flags"
    )]
    NoSelection,

    /// No branch name was supplied.
    #[error("You must pass a branch name to use via the --branch-name flag")]
    NoBranchName,

    /// The branch name is not a valid git reference name.
    #[error("Branch name '{name}' is not a valid git reference: {reason}")]
    InvalidBranchName { name: String, reason: String },
}
