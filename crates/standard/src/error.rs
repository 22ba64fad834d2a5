//! Error types shared by the foundation utilities.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error as ThisError;

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur during command execution.
///
/// This enum represents the various ways that command execution can fail,
/// from spawn failures to timeouts to non-zero exit codes, with specific
/// variants for common error conditions.
#[derive(ThisError, Debug, Clone)]
pub enum CommandError {
    /// The command failed to start (e.g., not found).
    #[error("Failed to spawn command '{cmd}': {message}")]
    SpawnFailed {
        /// The command that failed to start
        cmd: String,
        /// The spawn failure error message
        message: String,
    },

    /// The command execution process itself failed (e.g., internal I/O error).
    #[error("Command execution failed for '{cmd}': {message}")]
    ExecutionFailed {
        /// The command that failed during execution
        cmd: String,
        /// The execution failure error message
        message: String,
    },

    /// The command executed but returned a non-zero exit code.
    #[error("Command '{cmd}' failed with exit code {code}. Stderr: {stderr}")]
    NonZeroExit {
        /// The command that failed
        cmd: String,
        /// The exit code returned by the command
        code: i32,
        /// Captured standard error output
        stderr: String,
    },

    /// The command exceeded its allotted execution time and was killed.
    #[error("Command '{cmd}' timed out after {duration:?}")]
    Timeout {
        /// The command that timed out
        cmd: String,
        /// The configured timeout
        duration: Duration,
    },
}

/// Errors raised while reading or writing package manifests.
#[derive(ThisError, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("Failed to read manifest at {path}: {source}")]
    Unreadable {
        /// Path to the offending manifest
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The manifest file could not be written.
    #[error("Failed to write manifest at {path}: {source}")]
    Unwritable {
        /// Path to the offending manifest
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The manifest content is not valid JSON or misses required fields.
    #[error("Malformed manifest at {path}: {reason}")]
    Malformed {
        /// Path to the offending manifest
        path: PathBuf,
        /// Why parsing failed
        reason: String,
    },
}

/// Top-level error for the foundation utilities.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Command execution failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Manifest I/O failure.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Generic operation failure with a message.
    #[error("{0}")]
    Operation(String),
}

impl Error {
    /// Creates a generic operation error from a message.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(message.into())
    }
}
