use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by repository operations.
#[derive(Error, Debug)]
pub enum RepoError {
    /// The path is not inside a git repository.
    #[error("No git repository found at {path}")]
    NotARepository {
        /// Path that was probed
        path: PathBuf,
    },

    /// The repository could not be opened.
    #[error("Failed to open repository: {0}")]
    OpenFailure(#[source] git2::Error),

    /// HEAD could not be resolved.
    #[error("Failed to resolve HEAD: {0}")]
    HeadError(#[source] git2::Error),

    /// A reference could not be resolved.
    #[error("Failed to resolve reference '{reference}': {source}")]
    ReferenceError {
        /// The reference that failed to resolve
        reference: String,
        /// Underlying git failure
        #[source]
        source: git2::Error,
    },

    /// The committer signature is not configured.
    #[error("Failed to build a signature (is user.name/user.email configured?): {0}")]
    SignatureError(#[source] git2::Error),

    /// The index could not be read or written.
    #[error("Failed to update the index: {0}")]
    IndexError(#[source] git2::Error),

    /// Commit creation failed.
    #[error("Failed to create commit: {0}")]
    CommitError(#[source] git2::Error),

    /// Tag creation or deletion failed.
    #[error("Tag operation on '{tag}' failed: {source}")]
    TagError {
        /// The tag being operated on
        tag: String,
        /// Underlying git failure
        #[source]
        source: git2::Error,
    },

    /// A remote operation failed.
    #[error("Remote operation against '{remote}' failed: {source}")]
    RemoteError {
        /// The remote being operated on
        remote: String,
        /// Underlying git failure
        #[source]
        source: git2::Error,
    },

    /// Commit history traversal failed.
    #[error("Failed to walk commit history: {0}")]
    RevWalkError(#[source] git2::Error),

    /// Working-tree status could not be read.
    #[error("Failed to read repository status: {0}")]
    StatusError(#[source] git2::Error),

    /// Diff computation failed.
    #[error("Failed to compute diff: {0}")]
    DiffError(#[source] git2::Error),

    /// Revert failed.
    #[error("Failed to revert commit '{commit}': {source}")]
    RevertError {
        /// The commit being reverted
        commit: String,
        /// Underlying git failure
        #[source]
        source: git2::Error,
    },

    /// Free-form failure, used by alternative client implementations.
    #[error("{0}")]
    Other(String),
}

/// Result alias for repository operations.
pub type Result<T> = core::result::Result<T, RepoError>;
