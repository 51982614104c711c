// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The retry-scheduling engine.
//!
//! The main structure in this module is [`Runner`].

mod executor;
mod imp;

pub use executor::{ExecuteStatus, ExecutionResult};
pub use imp::*;
