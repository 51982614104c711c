// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A flaky-test retry orchestrator.
//!
//! Reads a declarative tests file, invokes an external test runner for each
//! configured target, and selectively re-runs individually failing cases
//! within a per-target trial budget. See `schroedinger-runner` for the
//! engine.

mod dispatch;
mod errors;
mod output;

use clap::Parser;
use color_eyre::Result;
use dispatch::SchroedingerApp;
use errors::exit_codes;

fn main() -> Result<()> {
    color_eyre::install()?;

    let app = SchroedingerApp::parse();
    let output = app.init_output();

    match app.exec(output) {
        Ok(()) => std::process::exit(exit_codes::OK),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
