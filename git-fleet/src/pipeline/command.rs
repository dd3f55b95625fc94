//! Running the user command inside a clone.

use super::error::CommandError;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Runs `command` (program followed by arguments) with `dir` as working directory.
///
/// `env` is added on top of the inherited environment.
///
/// # Errors
///
/// Returns [`CommandError`] if the command is empty, cannot be started or
/// exits unsuccessfully.
pub async fn run_command(
    command: &[String],
    dir: &Path,
    env: &[(&str, String)],
) -> Result<CommandOutput, CommandError> {
    let (program, args) = command.split_first().ok_or(CommandError::Empty)?;
    let started = Instant::now();

    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .envs(env.iter().map(|(key, value)| (*key, value.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CommandError::Spawn {
            program: program.clone(),
            source: e,
        })?;

    let elapsed = started.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    debug!(
        program = %program,
        elapsed_ms = elapsed.as_millis() as u64,
        stdout = %stdout.trim_end(),
        stderr = %stderr.trim_end(),
        "Command finished"
    );

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.clone(),
            code: output.status.code(),
            stdout,
            stderr,
            elapsed,
        });
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_output_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "present").unwrap();

        let output = run_command(&argv(&["cat", "marker.txt"]), dir.path(), &[])
            .await
            .unwrap();

        assert_eq!(output.stdout, "present");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn passes_extra_environment() {
        let dir = tempfile::tempdir().unwrap();
        let env = [("GIT_FLEET_REPO_NAME", "infra".to_string())];

        let output = run_command(
            &argv(&["sh", "-c", "printf %s \"$GIT_FLEET_REPO_NAME\""]),
            dir.path(),
            &env,
        )
        .await
        .unwrap();

        assert_eq!(output.stdout, "infra");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = run_command(&argv(&["sh", "-c", "echo oops >&2; exit 3"]), dir.path(), &[])
            .await
            .unwrap_err();

        match err {
            CommandError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = run_command(&argv(&["git-fleet-no-such-program"]), dir.path(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_command(&[], dir.path(), &[]).await.unwrap_err();
        assert!(matches!(err, CommandError::Empty));
    }
}
