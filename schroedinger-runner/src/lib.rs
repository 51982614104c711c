// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core retry-scheduling logic for schroedinger, a flaky-test retry
//! orchestrator.
//!
//! Given a declarative list of test targets, schroedinger repeatedly invokes
//! an external test runner (`go test` by default) for each target, extracts
//! the names of individually failing cases from a failing run's output, and
//! selectively re-runs only those cases within a per-target trial budget.
//! The run as a whole fails if any target never passes within its budget.
//!
//! The main entry point is [`runner::Runner`], built from a
//! [`config::RunConfig`] and a [`filter::NameFilter`]. Progress is delivered
//! through [`reporter::RunEvent`] callbacks; [`reporter::Reporter`] renders
//! them for humans.

pub mod config;
pub mod errors;
pub mod extract;
pub mod filter;
pub mod reporter;
pub mod runner;
pub mod target;
