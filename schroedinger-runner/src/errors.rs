// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for schroedinger-runner.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while loading or validating the run configuration.
///
/// All of these are fatal: the run never starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The tests file could not be read.
    #[error("failed to read tests file `{path}`")]
    Read {
        /// The path that could not be read.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The tests file is not valid TOML, or does not match the expected
    /// shape.
    #[error("failed to parse tests file `{path}`")]
    Parse {
        /// The path that failed to parse.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },

    /// The effective global trial count is not positive.
    ///
    /// Set `default-trials` in the tests file or pass a positive count on
    /// the command line.
    #[error("default-trials must be positive")]
    InvalidDefaultTrials,

    /// The runner command could not be split into program and arguments.
    #[error("invalid runner command `{command}`")]
    CommandParse {
        /// The configured command string.
        command: String,
        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },

    /// The runner command is empty.
    #[error("runner command is empty")]
    EmptyCommand,

    /// A group was declared with an empty name.
    #[error("group at index {index} has an empty name")]
    EmptyGroupName {
        /// Position of the group in the tests file.
        index: usize,
    },

    /// A case was declared with an empty name.
    #[error("group `{group}` declares a case with an empty name")]
    EmptyCaseName {
        /// The group the case belongs to.
        group: String,
    },

    /// A group declares two cases with the same name.
    #[error("group `{group}` declares case `{case}` more than once")]
    DuplicateCase {
        /// The group the cases belong to.
        group: String,
        /// The duplicated case name.
        case: String,
    },
}

/// The external test runner could not be started or waited on.
///
/// This is an environment problem (missing executable, permission error),
/// distinct from the runner running and reporting failing tests.
#[derive(Debug, Error)]
#[error("failed to run `{command}`")]
pub struct SpawnError {
    /// The rendered command line that failed.
    pub command: String,
    /// The underlying error.
    #[source]
    pub error: io::Error,
}

/// A terminal, per-target failure reported through the outcome channel.
///
/// The first of these observed by the orchestrator becomes the run's
/// failure.
#[derive(Debug, Error)]
pub enum TargetFailure {
    /// The target consumed its whole trial budget without a passing attempt.
    #[error("FAIL {name} ({trials} trials)")]
    Exhausted {
        /// Fully-qualified name of the exhausted target.
        name: String,
        /// Attempts consumed.
        trials: usize,
    },

    /// A group run failed, but no individually failing case could be carved
    /// out of its output, so there is nothing to selectively retry.
    ///
    /// This usually means the runner's output format changed, or the group
    /// failed before reaching any test (e.g. a build failure).
    #[error("{name} reported failure, but no failing cases were found in its output")]
    NotAttributed {
        /// Name of the failing group.
        name: String,
    },

    /// The runner process could not be launched for this target.
    #[error("could not launch runner for {name}")]
    Spawn {
        /// Name of the target being executed.
        name: String,
        /// The underlying error.
        #[source]
        error: SpawnError,
    },
}

/// An error that occurred while building a [`Runner`](crate::runner::Runner).
#[derive(Debug, Error)]
pub enum RunnerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] io::Error),
}
