// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::ExpectedError,
    output::{OutputContext, OutputOpts},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use schroedinger_runner::{
    config::RunConfig,
    filter::NameFilter,
    reporter::Reporter,
    runner::{working_set, Runner},
};
use std::{io::Write, num::NonZeroUsize};

/// A retry orchestrator for known-flaky test suites.
///
/// Repeatedly invokes an external test runner for the configured targets,
/// re-running individually failing cases until each passes or exhausts its
/// trial budget.
#[derive(Debug, Parser)]
#[command(name = "schroedinger", version)]
pub(crate) struct SchroedingerApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl SchroedingerApp {
    /// Initializes the output context: color handling and logging.
    pub(crate) fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub(crate) fn exec(self, output: OutputContext) -> Result<(), ExpectedError> {
        match self.command {
            Command::Run {
                config_opts,
                trials,
                jobs,
            } => run_impl(&config_opts, trials, jobs, output),
            Command::List {
                config_opts,
                trials,
            } => list_impl(&config_opts, trials),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the configured targets, retrying failures within budget
    Run {
        #[command(flatten)]
        config_opts: ConfigOpts,

        /// Override the default trial budget
        #[arg(long, short = 't', value_name = "N")]
        trials: Option<NonZeroUsize>,

        /// Limit concurrently running runner processes
        #[arg(long, short = 'j', value_name = "N")]
        jobs: Option<NonZeroUsize>,
    },

    /// List the targets that survive filtering, without running anything
    List {
        #[command(flatten)]
        config_opts: ConfigOpts,

        /// Override the default trial budget
        #[arg(long, short = 't', value_name = "N")]
        trials: Option<NonZeroUsize>,
    },
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Path to the tests file
    #[arg(long, value_name = "PATH")]
    tests_file: Utf8PathBuf,

    /// Comma-separated substrings a target must contain to run
    #[arg(long, short = 'w', value_name = "PATTERNS", default_value = "")]
    whitelist: String,

    /// Comma-separated substrings that exclude a target
    #[arg(long, short = 'b', value_name = "PATTERNS", default_value = "")]
    blacklist: String,
}

impl ConfigOpts {
    fn filter(&self) -> NameFilter {
        NameFilter::new(&self.whitelist, &self.blacklist)
    }
}

fn run_impl(
    config_opts: &ConfigOpts,
    trials: Option<NonZeroUsize>,
    jobs: Option<NonZeroUsize>,
    output: OutputContext,
) -> Result<(), ExpectedError> {
    let mut config = RunConfig::from_file(&config_opts.tests_file, trials)?;
    config.override_max_concurrency(jobs);

    let runner = Runner::new(config, config_opts.filter())?;
    let mut reporter = Reporter::new(
        std::io::stderr(),
        output
            .color
            .should_colorize(supports_color::Stream::Stderr),
    );
    let stats = runner.execute(|event| {
        // Reporting to stderr is best-effort.
        let _ = reporter.report(&event);
    })?;

    if stats.targets_run == 0 {
        return Err(ExpectedError::NoTargetsRun);
    }
    Ok(())
}

fn list_impl(config_opts: &ConfigOpts, trials: Option<NonZeroUsize>) -> Result<(), ExpectedError> {
    let config = RunConfig::from_file(&config_opts.tests_file, trials)?;

    let mut out = std::io::stdout().lock();
    for target in working_set(&config, &config_opts.filter()) {
        let any_failing = if target.any_failing() {
            ", any-failing"
        } else {
            ""
        };
        writeln!(
            out,
            "{} (trials allowed: {}{any_failing})",
            target.name(),
            target.trials_allowed(&config),
        )?;
    }
    Ok(())
}
