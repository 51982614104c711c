// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::StderrStyles;
use owo_colors::OwoColorize;
use schroedinger_runner::errors::{ConfigError, RunnerBuildError, TargetFailure};
use std::error::Error;
use thiserror::Error;

/// Exit codes returned by the schroedinger binary.
pub(crate) mod exit_codes {
    /// Every target passed within its budget.
    pub(crate) const OK: i32 = 0;
    /// No targets survived filtering.
    pub(crate) const NO_TARGETS_RUN: i32 = 4;
    /// Configuration or environment error.
    pub(crate) const SETUP_ERROR: i32 = 96;
    /// A target exhausted its trial budget without passing.
    pub(crate) const TEST_RUN_FAILED: i32 = 100;
    /// A group failed without any attributable failing case.
    pub(crate) const FAILURE_NOT_ATTRIBUTED: i32 = 104;
    /// Failed to write results to stdout or stderr.
    pub(crate) const WRITE_OUTPUT_ERROR: i32 = 110;
}

/// An error expected during normal operation, mapped to an exit code.
#[derive(Debug, Error)]
pub(crate) enum ExpectedError {
    #[error("failed to load configuration")]
    Config {
        #[from]
        err: ConfigError,
    },

    #[error("failed to build the runner")]
    RunnerBuild {
        #[from]
        err: RunnerBuildError,
    },

    #[error("no targets to run")]
    NoTargetsRun,

    #[error("test run failed")]
    RunFailed {
        #[from]
        failure: TargetFailure,
    },

    #[error("error writing to output")]
    WriteOutput {
        #[from]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// The exit code for the process.
    pub(crate) fn process_exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::RunnerBuild { .. } => exit_codes::SETUP_ERROR,
            Self::NoTargetsRun => exit_codes::NO_TARGETS_RUN,
            Self::RunFailed { failure } => match failure {
                TargetFailure::Exhausted { .. } => exit_codes::TEST_RUN_FAILED,
                TargetFailure::NotAttributed { .. } => exit_codes::FAILURE_NOT_ATTRIBUTED,
                TargetFailure::Spawn { .. } => exit_codes::SETUP_ERROR,
            },
            Self::WriteOutput { .. } => exit_codes::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr, along with its causes.
    pub(crate) fn display_to_stderr(&self, styles: &StderrStyles) {
        eprintln!("{}: {self}", "error".style(styles.error));
        let mut source = self.source();
        while let Some(error) = source {
            eprintln!("{}: {error}", "caused by".style(styles.warning));
            source = error.source();
        }
    }
}
