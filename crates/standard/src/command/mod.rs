//! # Command execution
//!
//! ## What
//! This module provides the subprocess execution surface used by the npm
//! client, the hook runner, and the build phase: a command description, a
//! captured output structure, and an executor trait with a tokio-backed
//! default implementation.
//!
//! ## How
//! Commands are described by [`Command`] and executed by an [`Executor`].
//! The [`DefaultCommandExecutor`] spawns a `tokio::process::Command`, waits
//! for completion under an optional timeout and kills the child when the
//! timeout fires.
//!
//! ## Why
//! Keeping the execution surface behind a trait lets higher layers swap in
//! fakes during tests and keeps timeout/kill handling in one place.

mod executor;

pub use executor::{Command, CommandOutput, DefaultCommandExecutor, Executor};
