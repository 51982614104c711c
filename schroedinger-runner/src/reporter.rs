// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run events and their human-readable rendering.
//!
//! The engine reports progress as [`RunEvent`] values through the callback
//! passed to [`Runner::execute`](crate::runner::Runner::execute).
//! [`Reporter`] renders them as styled, line-oriented output.

use crate::runner::ExecutionResult;
use owo_colors::{OwoColorize, Style};
use std::{io, time::Duration};

/// Summary counters for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Groups in the tests file.
    pub configured_groups: usize,
    /// Groups that survived filtering.
    pub selected_groups: usize,
    /// Top-level targets launched; each declared case counts on its own.
    pub targets_run: usize,
    /// Targets that resolved to success.
    pub passed: usize,
    /// Execution attempts observed across all targets, including retries of
    /// discovered cases.
    pub attempts: usize,
}

/// A progress event emitted while a run executes.
///
/// Events from one target arrive in order; events from sibling targets
/// interleave in completion order.
#[derive(Clone, Debug)]
pub enum RunEvent {
    /// The working set has been filtered and the run is starting.
    RunStarted {
        /// Rendered runner command.
        command: String,
        /// Global default trial budget.
        default_trials: usize,
        /// Whitelist patterns in effect.
        whitelist: Vec<String>,
        /// Blacklist patterns in effect.
        blacklist: Vec<String>,
        /// Groups that survived filtering.
        selected_groups: usize,
        /// Groups in the tests file.
        configured_groups: usize,
    },

    /// A single execution attempt finished.
    AttemptFinished {
        /// Fully-qualified target name.
        name: String,
        /// Pass/fail classification.
        result: ExecutionResult,
        /// Wall-clock duration of the attempt.
        time_taken: Duration,
        /// Attempts consumed so far, including this one.
        trials_done: usize,
        /// The resolved trial budget.
        trials_allowed: usize,
        /// Combined runner output, carried for failing attempts so it can
        /// be surfaced verbatim.
        output: Option<String>,
    },

    /// A failing group run was attributed to individual cases, which are
    /// now being retried concurrently.
    CasesDiscovered {
        /// The group whose run failed.
        group: String,
        /// Discovered case names, in order of appearance.
        cases: Vec<String>,
    },

    /// Every target resolved successfully.
    RunFinished {
        /// Wall-clock time for the whole run.
        elapsed: Duration,
        /// Final counters.
        stats: RunStats,
    },
}

/// Renders [`RunEvent`]s for humans.
#[derive(Debug)]
pub struct Reporter<W> {
    writer: W,
    styles: Styles,
}

impl<W: io::Write> Reporter<W> {
    /// Creates a reporter writing to `writer`, with or without color.
    pub fn new(writer: W, colorize: bool) -> Self {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }
        Self { writer, styles }
    }

    /// Writes one event.
    pub fn report(&mut self, event: &RunEvent) -> io::Result<()> {
        match event {
            RunEvent::RunStarted {
                command,
                default_trials,
                whitelist,
                blacklist,
                selected_groups,
                configured_groups,
            } => {
                writeln!(self.writer, "* runner command: {command}")?;
                writeln!(self.writer, "* trials allowed: {default_trials}")?;
                writeln!(self.writer, "* whitelist: {whitelist:?}")?;
                writeln!(self.writer, "* blacklist: {blacklist:?}")?;
                writeln!(
                    self.writer,
                    "running {selected_groups}/{configured_groups} groups"
                )
            }
            RunEvent::AttemptFinished {
                name,
                result,
                time_taken,
                trials_done,
                trials_allowed,
                output,
            } => {
                match result {
                    ExecutionResult::Pass => writeln!(
                        self.writer,
                        "{} {name} ({}) {trials_done}/{trials_allowed}",
                        "PASS".style(self.styles.pass),
                        display_duration(*time_taken),
                    )?,
                    ExecutionResult::Fail { exit_code } => {
                        write!(
                            self.writer,
                            "{} {name} ({}) {trials_done}/{trials_allowed}",
                            "FAIL".style(self.styles.fail),
                            display_duration(*time_taken),
                        )?;
                        match exit_code {
                            Some(code) => writeln!(self.writer, ": exit status {code}")?,
                            None => writeln!(self.writer, ": killed by signal")?,
                        }
                    }
                }
                if let Some(output) = output {
                    writeln!(self.writer)?;
                    self.writer.write_all(output.as_bytes())?;
                    if !output.ends_with('\n') {
                        writeln!(self.writer)?;
                    }
                }
                Ok(())
            }
            RunEvent::CasesDiscovered { group, cases } => writeln!(
                self.writer,
                "found failing case(s) in {group}: {}; rerunning",
                cases.join(", "),
            ),
            RunEvent::RunFinished { elapsed, stats } => writeln!(
                self.writer,
                "{} ({}): {}/{} targets passed, {} attempts",
                "FINISHED".style(self.styles.count),
                display_duration(*elapsed),
                stats.passed,
                stats.targets_run,
                stats.attempts,
            ),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Styles {
    pass: Style,
    fail: Style,
    count: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.count = Style::new().bold();
    }
}

fn display_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(event: &RunEvent) -> String {
        let mut reporter = Reporter::new(Vec::new(), false);
        reporter.report(event).unwrap();
        String::from_utf8(reporter.writer).unwrap()
    }

    #[test]
    fn passing_attempt_renders_on_one_line() {
        let rendered = render(&RunEvent::AttemptFinished {
            name: "./pkg -run TestFetch".to_owned(),
            result: ExecutionResult::Pass,
            time_taken: Duration::from_millis(1230),
            trials_done: 2,
            trials_allowed: 5,
            output: None,
        });
        assert_eq!(rendered, "PASS ./pkg -run TestFetch (1.23s) 2/5\n");
    }

    #[test]
    fn failing_attempt_surfaces_output_verbatim() {
        let rendered = render(&RunEvent::AttemptFinished {
            name: "./pkg".to_owned(),
            result: ExecutionResult::Fail { exit_code: Some(1) },
            time_taken: Duration::from_millis(500),
            trials_done: 1,
            trials_allowed: 3,
            output: Some("--- FAIL: TestAlpha (0.10s)\n".to_owned()),
        });
        assert_eq!(
            rendered,
            "FAIL ./pkg (0.50s) 1/3: exit status 1\n\n--- FAIL: TestAlpha (0.10s)\n"
        );
    }

    #[test]
    fn discovered_cases_are_listed_in_order() {
        let rendered = render(&RunEvent::CasesDiscovered {
            group: "./pkg".to_owned(),
            cases: vec!["TestAlpha".to_owned(), "TestBeta".to_owned()],
        });
        assert_eq!(
            rendered,
            "found failing case(s) in ./pkg: TestAlpha, TestBeta; rerunning\n"
        );
    }

    #[test]
    fn finished_line_summarizes_the_run() {
        let rendered = render(&RunEvent::RunFinished {
            elapsed: Duration::from_secs(12),
            stats: RunStats {
                configured_groups: 3,
                selected_groups: 2,
                targets_run: 2,
                passed: 2,
                attempts: 5,
            },
        });
        assert_eq!(rendered, "FINISHED (12.00s): 2/2 targets passed, 5 attempts\n");
    }
}
