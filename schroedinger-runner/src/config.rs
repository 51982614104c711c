// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run configuration: the tests file and the knobs that shape a run.
//!
//! The tests file is TOML. A minimal example:
//!
//! ```toml
//! default-trials = 3
//!
//! [[groups]]
//! name = "./pkg/downloader/..."
//! trials = 5
//! cases = [
//!     { name = "TestFetch", trials = 10 },
//!     { name = "TestResume" },
//! ]
//! ```
//!
//! A trial override of `0` at any level means "unset, fall through": case
//! overrides fall through to the group override, which falls through to
//! `default-trials`.

use crate::errors::ConfigError;
use camino::Utf8Path;
use serde::Deserialize;
use std::{collections::HashSet, fmt, fs, num::NonZeroUsize};

/// The runner command used when the tests file does not configure one.
pub const DEFAULT_COMMAND: &str = "go test";

/// Run-wide configuration: the global trial budget, the external runner
/// command, an optional concurrency cap, and the ordered group list.
///
/// Built once per invocation and shared immutably with every task for the
/// duration of the run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    default_trials: NonZeroUsize,
    command: RunnerCommand,
    max_concurrency: Option<NonZeroUsize>,
    groups: Vec<GroupConfig>,
}

impl RunConfig {
    /// Reads and validates a tests file.
    ///
    /// `trials_override` takes precedence over the file's `default-trials`;
    /// the effective value must be positive.
    pub fn from_file(
        path: &Utf8Path,
        trials_override: Option<NonZeroUsize>,
    ) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_owned(),
            error,
        })?;
        Self::from_toml(path, &contents, trials_override)
    }

    /// Parses and validates tests-file contents. `path` is used for error
    /// attribution only.
    pub fn from_toml(
        path: &Utf8Path,
        contents: &str,
        trials_override: Option<NonZeroUsize>,
    ) -> Result<Self, ConfigError> {
        let file: TestsFile = toml::from_str(contents).map_err(|error| ConfigError::Parse {
            path: path.to_owned(),
            error,
        })?;

        let default_trials = trials_override
            .or_else(|| NonZeroUsize::new(file.default_trials))
            .ok_or(ConfigError::InvalidDefaultTrials)?;
        let command = RunnerCommand::parse(file.command.as_deref().unwrap_or(DEFAULT_COMMAND))?;

        for (index, group) in file.groups.iter().enumerate() {
            if group.name.is_empty() {
                return Err(ConfigError::EmptyGroupName { index });
            }
            let mut seen = HashSet::new();
            for case in &group.cases {
                if case.name.is_empty() {
                    return Err(ConfigError::EmptyCaseName {
                        group: group.name.clone(),
                    });
                }
                if !seen.insert(case.name.as_str()) {
                    return Err(ConfigError::DuplicateCase {
                        group: group.name.clone(),
                        case: case.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            default_trials,
            command,
            max_concurrency: file.max_concurrency,
            groups: file.groups,
        })
    }

    /// The global default trial budget, used where no override applies.
    pub fn default_trials(&self) -> NonZeroUsize {
        self.default_trials
    }

    /// The external runner command.
    pub fn command(&self) -> &RunnerCommand {
        &self.command
    }

    /// Cap on concurrently running runner processes. `None` means unbounded.
    pub fn max_concurrency(&self) -> Option<NonZeroUsize> {
        self.max_concurrency
    }

    /// Overrides the configured concurrency cap, e.g. from a command-line
    /// flag. `None` leaves the tests file's value in place.
    pub fn override_max_concurrency(&mut self, cap: Option<NonZeroUsize>) {
        if let Some(cap) = cap {
            self.max_concurrency = Some(cap);
        }
    }

    /// The configured groups, in file order.
    pub fn groups(&self) -> &[GroupConfig] {
        &self.groups
    }
}

/// Raw shape of the tests file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TestsFile {
    /// `0` (or absent) means "must be supplied on the command line".
    #[serde(default)]
    default_trials: usize,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    max_concurrency: Option<NonZeroUsize>,
    #[serde(default)]
    groups: Vec<GroupConfig>,
}

/// One configured test group.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GroupConfig {
    /// Selector passed to the runner, e.g. a package path such as
    /// `./pkg/downloader/...`.
    pub name: String,

    /// Tolerate individually failing cases as long as each eventually passes
    /// within its budget. Accepted and surfaced in listings; reconciliation
    /// applies this policy to every group.
    #[serde(default)]
    pub any_failing: bool,

    /// Group-level trial override. `0` means unset.
    #[serde(default, deserialize_with = "deserialize_trial_override")]
    pub trials: Option<NonZeroUsize>,

    /// Declared cases, in order. A group with declared cases is scheduled as
    /// one case target per declaration instead of a whole-group run.
    #[serde(default)]
    pub cases: Vec<CaseConfig>,
}

impl GroupConfig {
    /// Looks up a declared case by name.
    pub fn case(&self, name: &str) -> Option<&CaseConfig> {
        self.cases.iter().find(|case| case.name == name)
    }
}

/// A declared case of a group: a name plus an optional trial override.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CaseConfig {
    /// Case name as the runner reports it, e.g. `TestFetch`.
    pub name: String,

    /// Case-level trial override. `0` means unset.
    #[serde(default, deserialize_with = "deserialize_trial_override")]
    pub trials: Option<NonZeroUsize>,
}

/// The external runner invocation, split into a program and leading
/// arguments. Target selectors are appended at execution time.
#[derive(Clone, Debug)]
pub struct RunnerCommand {
    program: String,
    args: Vec<String>,
}

impl RunnerCommand {
    pub(crate) fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut words = shell_words::split(raw).map_err(|error| ConfigError::CommandParse {
            command: raw.to_owned(),
            error,
        })?;
        if words.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }

    /// The program to spawn.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed before the target selector.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for RunnerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        write!(f, "{}", shell_words::join(words))
    }
}

fn deserialize_trial_override<'de, D>(deserializer: D) -> Result<Option<NonZeroUsize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct V;

    impl serde::de::Visitor<'_> for V {
        type Value = Option<NonZeroUsize>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a non-negative integer (0 means unset)")
        }

        // Note that TOML uses i64, not u64.
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let v = usize::try_from(v).map_err(|_| {
                E::invalid_value(serde::de::Unexpected::Signed(v), &self)
            })?;
            Ok(NonZeroUsize::new(v))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let v = usize::try_from(v).map_err(|_| {
                E::invalid_value(serde::de::Unexpected::Unsigned(v), &self)
            })?;
            Ok(NonZeroUsize::new(v))
        }
    }

    deserializer.deserialize_any(V)
}
