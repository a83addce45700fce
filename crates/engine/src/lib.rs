// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dx-engine: local bundle production.
//!
//! The engine turns an ordered list of collectors into one archive on disk,
//! recording progress and failures in the bundle's persisted state. The
//! caller gets the `Started` snapshot back immediately; the real work runs
//! in a spawned producer task bounded by a deadline.

mod archive;
mod engine;

pub use engine::{EngineError, LocalBundleEngine, SUMMARY_ERRORS_REPORT, SUMMARY_REPORT};
