//! Conduit E2E CLI
//!
//! Command-line access to the suite's building blocks: running specs,
//! merging reports, invoking tasks and checking logins by hand.

pub mod commands;
pub mod output;
