//! Error types for workspace resolution and the publish pipeline.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while resolving the workspace.
#[derive(Error, Debug, Clone)]
pub enum WorkspaceError {
    /// No workspace root or standalone manifest could be found.
    #[error("No workspace or package.json found at or above {cwd}")]
    RootNotFound {
        /// The directory the search started from
        cwd: String,
    },

    /// The selection resolved to zero packages.
    #[error("No packages matched the selection")]
    NoPackages,

    /// A dependency cycle blocks topological ordering.
    #[error("Dependency cycle detected: {cycle}")]
    CycleDetected {
        /// Rendered cycle, e.g. `A → B → A`
        cycle: String,
    },

    /// A requested package does not exist in the workspace.
    #[error("Unknown package '{name}'")]
    UnknownPackage {
        /// The name that failed to resolve
        name: String,
    },

    /// A filter glob could not be compiled.
    #[error("Invalid package filter '{pattern}': {reason}")]
    InvalidFilter {
        /// The offending pattern
        pattern: String,
        /// Why it failed to compile
        reason: String,
    },
}

/// Errors raised during lifecycle hook execution.
#[derive(Error, Debug, Clone)]
pub enum HookError {
    /// A hook command exited non-zero.
    #[error("Hook '{hook}' command failed: {detail}")]
    CommandFailed {
        /// The hook that failed
        hook: String,
        /// Captured failure detail
        detail: String,
    },

    /// A hook callback returned an error.
    #[error("Hook '{hook}' callback failed: {detail}")]
    CallbackFailed {
        /// The hook that failed
        hook: String,
        /// The callback's error message
        detail: String,
    },
}

/// Errors raised while acquiring or releasing the pipeline lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// Another pipeline holds the lock.
    #[error("Another publish is in progress (pid {pid} on {hostname} since {since})")]
    Held {
        /// Holder process id
        pid: u32,
        /// Holder hostname
        hostname: String,
        /// When the lock was taken
        since: String,
    },

    /// The lock file could not be read or written.
    #[error("Failed to access lock file {path}: {source}")]
    Io {
        /// Lock file path
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the analytics store.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// The records file could not be read or written.
    #[error("Failed to access analytics store {path}: {source}")]
    Io {
        /// Store path
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// The records file holds invalid JSON.
    #[error("Analytics store {path} is corrupt: {reason}")]
    Corrupt {
        /// Store path
        path: String,
        /// Parse failure detail
        reason: String,
    },
}

/// Errors raised by the rollback engine.
#[derive(Error, Debug)]
pub enum RollbackError {
    /// The history file could not be read or written.
    #[error("Failed to access rollback history {path}: {source}")]
    Io {
        /// History path
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Neither unpublish nor deprecate nor any other action was requested.
    #[error("No rollback actions requested for '{package}'")]
    NothingToDo {
        /// The package the rollback targeted
        package: String,
    },
}

/// A pipeline-global failure that short-circuits to REPORT.
#[derive(Error, Debug)]
#[error("Publish pipeline failed during {phase}: {message}")]
pub struct PipelineError {
    /// The phase that failed
    pub phase: String,
    /// Failure detail
    pub message: String,
}

/// Umbrella error for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Workspace resolution failure.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Hook failure.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Lock failure.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Analytics failure.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Rollback failure.
    #[error(transparent)]
    Rollback(#[from] RollbackError),

    /// Pipeline-global failure.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Package-toolkit failure.
    #[error(transparent)]
    Pkg(#[from] shipit_pkg_tools::PkgError),

    /// VCS failure.
    #[error(transparent)]
    Vcs(#[from] shipit_git_tools::RepoError),

    /// Foundation-layer failure.
    #[error(transparent)]
    Standard(#[from] shipit_standard_tools::Error),
}
