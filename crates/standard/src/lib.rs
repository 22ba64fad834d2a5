//! Foundation utilities for the shipit publish orchestrator.
//!
//! This crate hosts the pieces every other shipit crate leans on:
//!
//! - [`command`]: subprocess execution with timeouts behind a swappable
//!   executor trait
//! - [`cache`]: TTL + LRU in-memory caching with a resettable process-wide
//!   default
//! - [`manifest`]: `package.json` reading and field-preserving writing
//! - [`error`]: the shared error types

pub mod cache;
pub mod command;
pub mod error;
pub mod manifest;

pub use cache::{global_cache, reset_global_cache, Cache, CacheConfig, CacheStats};
pub use command::{Command, CommandOutput, DefaultCommandExecutor, Executor};
pub use error::{CommandError, Error, ManifestError, Result};
pub use manifest::{PackageManifest, DEPENDENCY_SECTIONS};
