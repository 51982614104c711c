// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-attempt execution of a target against the external runner.
//!
//! This is the only place a process is spawned. Everything above it deals
//! in [`ExecuteStatus`] values.

use crate::{config::RunConfig, errors::SpawnError, target::Target};
use std::{
    process::Stdio,
    time::{Duration, Instant},
};
use tokio::process::Command;
use tracing::debug;

/// Pass/fail classification of one execution attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The runner exited with status zero.
    Pass,
    /// The runner exited with a non-zero status, or was killed by a signal.
    Fail {
        /// The exit code, if there was one.
        exit_code: Option<i32>,
    },
}

impl ExecutionResult {
    /// True for a passing attempt.
    pub fn is_success(self) -> bool {
        matches!(self, ExecutionResult::Pass)
    }
}

/// Everything captured about one execution attempt.
#[derive(Clone, Debug)]
pub struct ExecuteStatus {
    /// Combined stdout and stderr of the runner, stdout first.
    pub output: String,
    /// Pass/fail classification.
    pub result: ExecutionResult,
    /// Wall-clock duration of the attempt.
    pub time_taken: Duration,
}

/// Invokes the runner once for `target`, consuming one unit of its trial
/// budget regardless of the outcome.
///
/// The task is blocked for the process's full duration; no timeout is
/// enforced at this layer.
pub(super) async fn execute(
    target: &mut Target,
    config: &RunConfig,
) -> Result<ExecuteStatus, SpawnError> {
    target.record_trial();

    let command = config.command();
    let selector = target.selector();
    let rendered = format!("{command} {}", shell_words::join(&selector));
    debug!("spawning `{rendered}`");

    let mut cmd = Command::new(command.program());
    cmd.args(command.args())
        .args(&selector)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let start = Instant::now();
    let child = cmd.spawn().map_err(|error| SpawnError {
        command: rendered.clone(),
        error,
    })?;
    let output = child.wait_with_output().await.map_err(|error| SpawnError {
        command: rendered,
        error,
    })?;
    let time_taken = start.elapsed();

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    let result = if output.status.success() {
        ExecutionResult::Pass
    } else {
        ExecutionResult::Fail {
            exit_code: output.status.code(),
        }
    };

    Ok(ExecuteStatus {
        output: combined,
        result,
        time_taken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupConfig;
    use camino::Utf8Path;

    fn config_with_command(command: &str) -> RunConfig {
        let contents = format!("default-trials = 3\ncommand = '{command}'\n");
        RunConfig::from_toml(Utf8Path::new("tests.toml"), &contents, None).unwrap()
    }

    fn group_target(name: &str) -> Target {
        Target::group(&GroupConfig {
            name: name.to_owned(),
            any_failing: false,
            trials: None,
            cases: Vec::new(),
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passing_run_captures_output() {
        let config = config_with_command("echo");
        let mut target = group_target("hello");

        let status = execute(&mut target, &config).await.unwrap();
        assert!(status.result.is_success());
        assert_eq!(status.output, "hello\n");
        assert_eq!(target.trials_done(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_run_reports_the_exit_code() {
        let config = config_with_command("false");
        let mut target = group_target("ignored");

        let status = execute(&mut target, &config).await.unwrap();
        assert_eq!(
            status.result,
            ExecutionResult::Fail { exit_code: Some(1) }
        );
        assert_eq!(target.trials_done(), 1);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let config = config_with_command("/this/program/does/not/exist");
        let mut target = group_target("./pkg");

        let error = execute(&mut target, &config).await.unwrap_err();
        assert!(error.command.contains("/this/program/does/not/exist"));
        // The attempt still consumed a trial.
        assert_eq!(target.trials_done(), 1);
    }
}
