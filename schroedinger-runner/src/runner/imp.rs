// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::executor;
use crate::{
    config::RunConfig,
    errors::{RunnerBuildError, TargetFailure},
    extract::failing_cases,
    filter::NameFilter,
    reporter::{RunEvent, RunStats},
    runner::ExecuteStatus,
    target::Target,
};
use std::{sync::Arc, time::Instant};
use tokio::{
    runtime::Runtime,
    sync::{
        mpsc::{self, UnboundedSender},
        OwnedSemaphorePermit, Semaphore,
    },
};
use tracing::debug;

/// Drives a full run: filtering, scheduling, retries, and aggregation.
///
/// Created from a validated [`RunConfig`] and a [`NameFilter`]; owns the
/// Tokio runtime the run executes on, so [`Runner::execute`] is a plain
/// synchronous call.
#[derive(Debug)]
pub struct Runner {
    config: Arc<RunConfig>,
    filter: NameFilter,
    runtime: Runtime,
}

impl Runner {
    /// Creates a runner, building its Tokio runtime.
    pub fn new(config: RunConfig, filter: NameFilter) -> Result<Self, RunnerBuildError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("schroedinger-worker")
            .build()
            .map_err(RunnerBuildError::TokioRuntimeCreate)?;
        Ok(Self {
            config: Arc::new(config),
            filter,
            runtime,
        })
    }

    /// The configuration this runner was built with.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Executes every target in the working set, one concurrent task per
    /// target, and aggregates their outcomes in arrival order.
    ///
    /// The callback receives progress events as they happen; which sibling's
    /// events arrive first is not specified.
    ///
    /// Returns the first failure observed. Returning early does not cancel
    /// in-flight sibling tasks: they are dropped when the runtime shuts
    /// down, and their runner processes are left to finish on their own.
    pub fn execute<F>(self, mut callback: F) -> Result<RunStats, TargetFailure>
    where
        F: FnMut(RunEvent),
    {
        let Self {
            config,
            filter,
            runtime,
        } = self;

        runtime.block_on(async {
            let start = Instant::now();
            let configured_groups = config.groups().len();
            let selected_groups = config
                .groups()
                .iter()
                .filter(|group| filter.matches(group))
                .count();
            let units = build_working_set(&config, &filter);
            let mut stats = RunStats {
                configured_groups,
                selected_groups,
                targets_run: units.len(),
                ..RunStats::default()
            };

            callback(RunEvent::RunStarted {
                command: config.command().to_string(),
                default_trials: config.default_trials().get(),
                whitelist: filter.whitelist().to_vec(),
                blacklist: filter.blacklist().to_vec(),
                selected_groups,
                configured_groups,
            });

            let semaphore = config
                .max_concurrency()
                .map(|cap| Arc::new(Semaphore::new(cap.get())));
            let (tx, mut rx) = mpsc::unbounded_channel();

            for (group_index, target) in units {
                let config = Arc::clone(&config);
                let semaphore = semaphore.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = if target.is_case() {
                        retry_case(target, &config, semaphore.as_ref(), &tx).await
                    } else {
                        reconcile_group(target, group_index, &config, semaphore.as_ref(), &tx)
                            .await
                    };
                    // The receiver is gone if the run already failed.
                    let _ = tx.send(InternalEvent::Done(result));
                });
            }
            drop(tx);

            let mut finished = 0;
            while finished < stats.targets_run {
                let Some(event) = rx.recv().await else {
                    break;
                };
                match event {
                    InternalEvent::Report(event) => {
                        if matches!(&event, RunEvent::AttemptFinished { .. }) {
                            stats.attempts += 1;
                        }
                        callback(event);
                    }
                    InternalEvent::Done(Ok(())) => {
                        stats.passed += 1;
                        finished += 1;
                    }
                    // First failure wins; siblings keep running until the
                    // runtime is torn down.
                    InternalEvent::Done(Err(failure)) => return Err(failure),
                }
            }

            callback(RunEvent::RunFinished {
                elapsed: start.elapsed(),
                stats,
            });
            Ok(stats)
        })
    }
}

/// Returns the targets that would run for `config` under `filter`, in
/// configuration order: one case target per declared case of a group,
/// otherwise one group target.
pub fn working_set(config: &RunConfig, filter: &NameFilter) -> Vec<Target> {
    build_working_set(config, filter)
        .into_iter()
        .map(|(_, target)| target)
        .collect()
}

fn build_working_set(config: &RunConfig, filter: &NameFilter) -> Vec<(usize, Target)> {
    let mut units = Vec::new();
    for (group_index, group) in config.groups().iter().enumerate() {
        if !filter.matches(group) {
            continue;
        }
        if group.cases.is_empty() {
            units.push((group_index, Target::group(group)));
        } else {
            for case in &group.cases {
                units.push((group_index, Target::declared_case(group, case)));
            }
        }
    }
    units
}

/// Events flowing from tasks to the aggregation loop. Each top-level task
/// sends any number of `Report`s followed by exactly one `Done`.
enum InternalEvent {
    Report(RunEvent),
    Done(Result<(), TargetFailure>),
}

/// Retries a case-scoped target until it passes or exhausts its budget.
///
/// The budget is resolved fresh on every iteration. A pass ends the loop
/// immediately, even if budget remains.
async fn retry_case(
    mut target: Target,
    config: &RunConfig,
    semaphore: Option<&Arc<Semaphore>>,
    events: &UnboundedSender<InternalEvent>,
) -> Result<(), TargetFailure> {
    while target.trials_done() < target.trials_allowed(config).get() {
        let status = run_once(&mut target, config, semaphore).await?;
        let passed = status.result.is_success();
        report_attempt(events, &target, config, status);
        if passed {
            return Ok(());
        }
    }
    Err(TargetFailure::Exhausted {
        name: target.name(),
        trials: target.trials_done(),
    })
}

/// Runs a group target exactly once; on failure, attributes the failure to
/// individual cases and retries each concurrently.
///
/// Group runs are never retried at whole-group granularity. The reconciled
/// outcome is success only if every discovered case eventually passes; the
/// first exhaustion short-circuits to failure, leaving the remaining case
/// loops running.
async fn reconcile_group(
    mut target: Target,
    group_index: usize,
    config: &Arc<RunConfig>,
    semaphore: Option<&Arc<Semaphore>>,
    events: &UnboundedSender<InternalEvent>,
) -> Result<(), TargetFailure> {
    let status = run_once(&mut target, config, semaphore).await?;
    let passed = status.result.is_success();
    let fails = if passed {
        Vec::new()
    } else {
        failing_cases(&status.output)
    };
    report_attempt(events, &target, config, status);
    if passed {
        return Ok(());
    }

    if fails.is_empty() {
        return Err(TargetFailure::NotAttributed {
            name: target.name(),
        });
    }

    debug!("found {} failing case(s) in {}", fails.len(), target);
    send_report(
        events,
        RunEvent::CasesDiscovered {
            group: target.name(),
            cases: fails.clone(),
        },
    );

    let group = &config.groups()[group_index];
    let case_count = fails.len();
    let (tx, mut rx) = mpsc::unbounded_channel();
    for case in fails {
        let case_target = Target::discovered_case(group, &case);
        let config = Arc::clone(config);
        let semaphore = semaphore.cloned();
        let events = events.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = retry_case(case_target, &config, semaphore.as_ref(), &events).await;
            let _ = tx.send(result);
        });
    }
    drop(tx);

    for _ in 0..case_count {
        match rx.recv().await {
            Some(Ok(())) => {}
            // First exhaustion wins; the remaining case loops keep running.
            Some(Err(failure)) => return Err(failure),
            // Every case loop sends exactly once, so the channel stays open
            // until all results are in.
            None => break,
        }
    }
    Ok(())
}

async fn run_once(
    target: &mut Target,
    config: &RunConfig,
    semaphore: Option<&Arc<Semaphore>>,
) -> Result<ExecuteStatus, TargetFailure> {
    let _permit = maybe_acquire(semaphore).await;
    let result = executor::execute(target, config).await;
    result.map_err(|error| TargetFailure::Spawn {
        name: target.name(),
        error,
    })
}

async fn maybe_acquire(semaphore: Option<&Arc<Semaphore>>) -> Option<OwnedSemaphorePermit> {
    // The semaphore is never closed, so acquisition cannot fail in practice.
    match semaphore {
        Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
        None => None,
    }
}

fn report_attempt(
    events: &UnboundedSender<InternalEvent>,
    target: &Target,
    config: &RunConfig,
    status: ExecuteStatus,
) {
    let passed = status.result.is_success();
    send_report(
        events,
        RunEvent::AttemptFinished {
            name: target.name(),
            result: status.result,
            time_taken: status.time_taken,
            trials_done: target.trials_done(),
            trials_allowed: target.trials_allowed(config).get(),
            output: (!passed).then_some(status.output),
        },
    );
}

fn send_report(events: &UnboundedSender<InternalEvent>, event: RunEvent) {
    // Reports are best-effort once the run has failed and the receiver is
    // gone.
    let _ = events.send(InternalEvent::Report(event));
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn config(contents: &str) -> RunConfig {
        RunConfig::from_toml(Utf8Path::new("tests.toml"), contents, None).unwrap()
    }

    #[test]
    fn working_set_expands_declared_cases() {
        let config = config(indoc! {r#"
            default-trials = 1

            [[groups]]
            name = "./pkg/a"

            [[groups]]
            name = "./pkg/b/..."
            cases = [{ name = "TestOne" }, { name = "TestTwo" }]
        "#});

        let names: Vec<_> = working_set(&config, &NameFilter::default())
            .iter()
            .map(Target::name)
            .collect();
        assert_eq!(
            names,
            [
                "./pkg/a",
                "./pkg/b -run TestOne",
                "./pkg/b -run TestTwo",
            ]
        );
    }

    #[test]
    fn working_set_honors_the_filter() {
        let config = config(indoc! {r#"
            default-trials = 1

            [[groups]]
            name = "./pkg/flaky"

            [[groups]]
            name = "./pkg/core"
        "#});

        let filter = NameFilter::new("", "flaky");
        let names: Vec<_> = working_set(&config, &filter)
            .iter()
            .map(Target::name)
            .collect();
        assert_eq!(names, ["./pkg/core"]);
    }
}
