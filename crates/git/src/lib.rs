//! Version-control surface for the shipit publish orchestrator.
//!
//! The [`VcsClient`] trait is the narrow seam the publish pipeline talks to;
//! [`GitClient`] implements it on top of libgit2. Tests inject in-memory
//! fakes instead of a real repository.

pub mod error;
pub mod null;
pub mod repo;
pub mod types;

pub use error::{RepoError, Result};
pub use null::NoRepo;
pub use repo::GitClient;
pub use types::{CommitInfo, UserInfo};

use std::path::PathBuf;

/// Operations the publish pipeline needs from the version-control system.
///
/// All operations are synchronous; libgit2 performs no background work. The
/// implementation is expected to be cheap to clone behind an `Arc`.
pub trait VcsClient: Send + Sync {
    /// Whether the working directory is inside a repository.
    fn is_repo(&self) -> bool;

    /// Whether the working tree has no uncommitted or untracked changes.
    fn is_clean(&self) -> Result<bool>;

    /// Name of the currently checked-out branch.
    fn current_branch(&self) -> Result<String>;

    /// Hash of the current HEAD commit, abbreviated when `short` is set.
    fn current_commit(&self, short: bool) -> Result<String>;

    /// URL of the named remote.
    fn remote_url(&self, remote: &str) -> Result<String>;

    /// The most recent tag reachable from HEAD, when any exists.
    fn latest_tag(&self) -> Result<Option<String>>;

    /// All tag names in the repository.
    fn all_tags(&self) -> Result<Vec<String>>;

    /// Whether a tag with the given name exists.
    fn tag_exists(&self, name: &str) -> Result<bool>;

    /// Creates an annotated tag at HEAD.
    ///
    /// Signing is not supported by the libgit2 path; when `sign` is
    /// requested the tag is created unsigned and a warning is logged.
    fn create_tag(&self, name: &str, message: Option<&str>, sign: bool) -> Result<()>;

    /// Deletes a local tag.
    fn delete_tag(&self, name: &str) -> Result<()>;

    /// Pushes a single tag to the named remote.
    fn push_tag(&self, name: &str, remote: &str) -> Result<()>;

    /// Deletes a tag on the named remote.
    fn delete_remote_tag(&self, name: &str, remote: &str) -> Result<()>;

    /// Stages the given paths (or everything when `None`) and commits.
    ///
    /// Returns the new commit hash. `sign` behaves as in
    /// [`VcsClient::create_tag`].
    fn commit(&self, message: &str, files: Option<&[PathBuf]>, sign: bool) -> Result<String>;

    /// Pushes the given branch (or the current one) to the named remote.
    fn push(&self, remote: &str, branch: Option<&str>) -> Result<()>;

    /// Commits reachable from `to` (default HEAD) but not from `from`,
    /// newest first.
    fn commits(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<CommitInfo>>;

    /// Paths changed between two references (defaults: parent of `to` and
    /// HEAD).
    fn changed_files(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<String>>;

    /// The commit hash a tag points at.
    fn tag_target(&self, tag: &str) -> Result<String>;

    /// Reverts the given commit on top of HEAD, returning the new commit.
    fn revert_commit(&self, reference: &str) -> Result<String>;

    /// The configured committer identity.
    fn user_info(&self) -> Result<UserInfo>;
}
