// Copyright (c) The testpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! State model for a test reporter panel.
//!
//! A [`Store`](store::Store) holds a flat set of [`Test`](test::Test)s. Each test owns the
//! [`Attempt`](attempt::Attempt)s it has been run with, keyed by retry index. Events coming from a
//! test runner are applied to the store, and a rendering layer reads derived state (whether a test
//! is open, its current state and its last error) back out of the model.
//!
//! Nothing is cached: every derived value is recomputed from the attempts on each read.

pub mod attempt;
pub mod config;
pub mod err_info;
pub mod errors;
pub mod events;
pub mod log;
pub mod runnable;
mod stopwatch;
pub mod store;
