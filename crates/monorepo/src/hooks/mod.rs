//! Lifecycle hooks around pipeline phases.
//!
//! A hook value is a shell command, an ordered list of shell commands, or an
//! in-process callback. Callbacks can only be supplied programmatically;
//! file-sourced configurations are limited to the command forms, which keeps
//! the config-loading boundary simple.

mod runner;
mod types;

pub use runner::HookRunner;
pub use types::{HookCallback, HookName, HookResult, HookValue, HooksConfig};
