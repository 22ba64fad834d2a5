//! A [`VcsClient`] for working directories without a repository.
//!
//! Reports `is_repo() == false` and fails every operation; useful when the
//! caller has been told to skip VCS checks but the client seam still needs
//! an implementation.

use std::path::PathBuf;

use crate::error::{RepoError, Result};
use crate::types::{CommitInfo, UserInfo};
use crate::VcsClient;

/// The no-repository client.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepo;

impl NoRepo {
    fn unavailable<T>() -> Result<T> {
        Err(RepoError::Other("not inside a git repository".to_string()))
    }
}

impl VcsClient for NoRepo {
    fn is_repo(&self) -> bool {
        false
    }

    fn is_clean(&self) -> Result<bool> {
        Self::unavailable()
    }

    fn current_branch(&self) -> Result<String> {
        Self::unavailable()
    }

    fn current_commit(&self, _short: bool) -> Result<String> {
        Self::unavailable()
    }

    fn remote_url(&self, _remote: &str) -> Result<String> {
        Self::unavailable()
    }

    fn latest_tag(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn all_tags(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn tag_exists(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    fn create_tag(&self, _name: &str, _message: Option<&str>, _sign: bool) -> Result<()> {
        Self::unavailable()
    }

    fn delete_tag(&self, _name: &str) -> Result<()> {
        Self::unavailable()
    }

    fn push_tag(&self, _name: &str, _remote: &str) -> Result<()> {
        Self::unavailable()
    }

    fn delete_remote_tag(&self, _name: &str, _remote: &str) -> Result<()> {
        Self::unavailable()
    }

    fn commit(&self, _message: &str, _files: Option<&[PathBuf]>, _sign: bool) -> Result<String> {
        Self::unavailable()
    }

    fn push(&self, _remote: &str, _branch: Option<&str>) -> Result<()> {
        Self::unavailable()
    }

    fn commits(&self, _from: Option<&str>, _to: Option<&str>) -> Result<Vec<CommitInfo>> {
        Ok(Vec::new())
    }

    fn changed_files(&self, _from: Option<&str>, _to: Option<&str>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn tag_target(&self, _tag: &str) -> Result<String> {
        Self::unavailable()
    }

    fn revert_commit(&self, _reference: &str) -> Result<String> {
        Self::unavailable()
    }

    fn user_info(&self) -> Result<UserInfo> {
        Self::unavailable()
    }
}
