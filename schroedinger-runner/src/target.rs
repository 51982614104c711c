// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Targets: the schedulable units of retryable work.
//!
//! A [`Target`] is either a whole test group or a single named case within
//! one. Case targets come from two places: declared up front in the tests
//! file, or discovered in the output of a failing group run. Each target
//! owns its own `trials_done` counter and is driven by exactly one task, so
//! no counter is ever shared between tasks.

use crate::config::{CaseConfig, GroupConfig, RunConfig};
use std::{fmt, num::NonZeroUsize};

/// Resolves an effective trial budget from the three-level override
/// hierarchy: case override, then group override, then the global default.
pub fn resolve_trials(
    case_override: Option<NonZeroUsize>,
    group_override: Option<NonZeroUsize>,
    global: NonZeroUsize,
) -> NonZeroUsize {
    case_override.or(group_override).unwrap_or(global)
}

/// A schedulable unit of retryable work.
#[derive(Clone, Debug)]
pub struct Target {
    group: String,
    case: Option<String>,
    any_failing: bool,
    trials_done: usize,
    case_override: Option<NonZeroUsize>,
    group_override: Option<NonZeroUsize>,
}

impl Target {
    /// Builds the group-scoped target for a configured group.
    pub fn group(config: &GroupConfig) -> Self {
        Self {
            group: config.name.clone(),
            case: None,
            any_failing: config.any_failing,
            trials_done: 0,
            case_override: None,
            group_override: config.trials,
        }
    }

    /// Builds a case-scoped target for a case declared in the tests file.
    pub fn declared_case(config: &GroupConfig, case: &CaseConfig) -> Self {
        Self {
            group: config.name.clone(),
            case: Some(case.name.clone()),
            any_failing: config.any_failing,
            trials_done: 0,
            case_override: case.trials,
            group_override: config.trials,
        }
    }

    /// Builds a target for a case discovered in failing group output.
    ///
    /// The group's failing attempt counts as this case's first attempt, so
    /// `trials_done` starts at 1. If the group also declares a case with
    /// this name, that declaration's trial override applies.
    pub fn discovered_case(config: &GroupConfig, name: &str) -> Self {
        Self {
            group: config.name.clone(),
            case: Some(name.to_owned()),
            any_failing: config.any_failing,
            trials_done: 1,
            case_override: config.case(name).and_then(|case| case.trials),
            group_override: config.trials,
        }
    }

    /// Fully-qualified name used in reports and failure messages, e.g.
    /// `./pkg/downloader -run TestFetch`.
    pub fn name(&self) -> String {
        match &self.case {
            Some(case) => format!("{} -run {}", non_recursive_name(&self.group), case),
            None => self.group.clone(),
        }
    }

    /// Selector tokens appended to the runner command line.
    ///
    /// A group target passes its name through unchanged; a case target
    /// narrows the (non-recursive) group to one case via the runner's
    /// `-run` flag.
    pub fn selector(&self) -> Vec<String> {
        match &self.case {
            Some(case) => vec![
                non_recursive_name(&self.group).to_owned(),
                "-run".to_owned(),
                case.clone(),
            ],
            None => vec![self.group.clone()],
        }
    }

    /// True if this target is scoped to a single named case.
    pub fn is_case(&self) -> bool {
        self.case.is_some()
    }

    /// Whether failing cases are tolerated for this target's group.
    pub fn any_failing(&self) -> bool {
        self.any_failing
    }

    /// Execution attempts consumed so far.
    pub fn trials_done(&self) -> usize {
        self.trials_done
    }

    /// The effective trial budget, resolved fresh against `config` on every
    /// call rather than cached.
    pub fn trials_allowed(&self, config: &RunConfig) -> NonZeroUsize {
        resolve_trials(
            self.case_override,
            self.group_override,
            config.default_trials(),
        )
    }

    /// True once the budget is used up.
    pub fn exhausted(&self, config: &RunConfig) -> bool {
        self.trials_done >= self.trials_allowed(config).get()
    }

    pub(crate) fn record_trial(&mut self) {
        self.trials_done += 1;
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Strips the recursive `...` suffix from a group name, so a case run
/// targets the group's own package: `./pkg/...` becomes `./pkg`.
fn non_recursive_name(name: &str) -> &str {
    let name = name.strip_suffix("...").unwrap_or(name);
    name.strip_suffix('/').unwrap_or(name)
}
