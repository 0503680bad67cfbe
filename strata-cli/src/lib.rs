//! Strata CLI - command-line interface for SQLite schema version control.
//!
//! This crate provides the `strata` binary: printing schema digests,
//! diffing a database against a schema file, inspecting the history ledger
//! and provisioning databases from a schema file.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
