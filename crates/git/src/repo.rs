//! libgit2-backed implementation of the [`VcsClient`] surface.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use git2::{
    Cred, CredentialType, DescribeFormatOptions, DescribeOptions, Error as Git2Error,
    IndexAddOption, PushOptions, RemoteCallbacks, Repository, StatusOptions,
};

use crate::error::{RepoError, Result};
use crate::types::{CommitInfo, UserInfo};
use crate::VcsClient;

/// Git repository client built on libgit2.
///
/// The underlying repository handle is guarded by a mutex so the client can
/// be shared across worker tasks.
pub struct GitClient {
    repo: Mutex<Repository>,
    workdir: PathBuf,
}

impl std::fmt::Debug for GitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitClient").field("workdir", &self.workdir).finish_non_exhaustive()
    }
}

impl GitClient {
    /// Discovers the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NotARepository` when no repository is found.
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                RepoError::NotARepository { path: path.to_path_buf() }
            } else {
                RepoError::OpenFailure(e)
            }
        })?;

        let workdir = repo.workdir().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());

        Ok(Self { repo: Mutex::new(repo), workdir })
    }

    /// Root of the working tree.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Repository> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credential callback used for pushes: ssh agent first, then the
    /// default key files, then the default credential helper.
    fn credentials(
        url: &str,
        username_from_url: Option<&str>,
        allowed_types: CredentialType,
    ) -> std::result::Result<Cred, Git2Error> {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }

            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let key_path = home.join(".ssh").join(key);
                    if key_path.exists() {
                        return Cred::ssh_key(username, None, &key_path, None);
                    }
                }
            }
        }

        Cred::default()
            .map_err(|_| Git2Error::from_str(&format!("no usable credentials for {url}")))
    }

    fn push_refspecs(&self, remote_name: &str, refspecs: &[String]) -> Result<()> {
        let repo = self.lock();
        let mut remote = repo.find_remote(remote_name).map_err(|source| {
            RepoError::RemoteError { remote: remote_name.to_string(), source }
        })?;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|url, username, allowed| Self::credentials(url, username, allowed));
        callbacks.push_update_reference(|refname, status| {
            if let Some(error_msg) = status {
                return Err(Git2Error::from_str(&format!(
                    "Failed to update {refname} with error: {error_msg}",
                )));
            }
            Ok(())
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec_refs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
        remote.push(&refspec_refs, Some(&mut push_options)).map_err(|source| {
            RepoError::RemoteError { remote: remote_name.to_string(), source }
        })?;

        Ok(())
    }

    fn resolve_commit_oid(repo: &Repository, reference: &str) -> Result<git2::Oid> {
        let object = repo.revparse_single(reference).map_err(|source| {
            RepoError::ReferenceError { reference: reference.to_string(), source }
        })?;
        let commit = object.peel_to_commit().map_err(|source| RepoError::ReferenceError {
            reference: reference.to_string(),
            source,
        })?;
        Ok(commit.id())
    }

    fn commit_info(repo: &Repository, oid: git2::Oid) -> Result<CommitInfo> {
        let commit = repo.find_commit(oid).map_err(RepoError::RevWalkError)?;

        let short_hash = commit
            .as_object()
            .short_id()
            .ok()
            .and_then(|buf| buf.as_str().map(ToString::to_string))
            .unwrap_or_else(|| oid.to_string().chars().take(7).collect());

        let message = commit.message().unwrap_or("");
        let mut parts = message.splitn(2, '\n');
        let subject = parts.next().unwrap_or("").trim_end().to_string();
        let body = parts
            .next()
            .map(|rest| rest.trim_matches('\n').to_string())
            .filter(|rest| !rest.is_empty());

        let author = commit.author();
        let date = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
            .unwrap_or_else(Utc::now);

        Ok(CommitInfo {
            hash: oid.to_string(),
            short_hash,
            subject,
            body,
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            date,
        })
    }
}

impl VcsClient for GitClient {
    fn is_repo(&self) -> bool {
        true
    }

    fn is_clean(&self) -> Result<bool> {
        let repo = self.lock();
        let mut options = StatusOptions::new();
        options.include_untracked(true).include_ignored(false);

        let statuses = repo.statuses(Some(&mut options)).map_err(RepoError::StatusError)?;
        Ok(statuses.is_empty())
    }

    fn current_branch(&self) -> Result<String> {
        let repo = self.lock();
        let head = repo.head().map_err(RepoError::HeadError)?;
        head.shorthand()
            .map(ToString::to_string)
            .ok_or_else(|| RepoError::HeadError(Git2Error::from_str("detached or invalid HEAD")))
    }

    fn current_commit(&self, short: bool) -> Result<String> {
        let repo = self.lock();
        let head = repo.head().map_err(RepoError::HeadError)?;
        let commit = head.peel_to_commit().map_err(RepoError::HeadError)?;

        if short {
            let buf = commit.as_object().short_id().map_err(RepoError::HeadError)?;
            Ok(buf.as_str().unwrap_or_default().to_string())
        } else {
            Ok(commit.id().to_string())
        }
    }

    fn remote_url(&self, remote: &str) -> Result<String> {
        let repo = self.lock();
        let remote_handle = repo.find_remote(remote).map_err(|source| {
            RepoError::RemoteError { remote: remote.to_string(), source }
        })?;
        Ok(remote_handle.url().unwrap_or_default().to_string())
    }

    fn latest_tag(&self) -> Result<Option<String>> {
        let repo = self.lock();
        let mut options = DescribeOptions::new();
        options.describe_tags();

        let result = match repo.describe(&options) {
            Ok(describe) => {
                let mut format = DescribeFormatOptions::new();
                format.abbreviated_size(0);
                let name = describe
                    .format(Some(&format))
                    .map_err(|source| RepoError::TagError { tag: "HEAD".to_string(), source })?;
                Ok(Some(name))
            }
            // No tag reachable from HEAD
            Err(_) => Ok(None),
        };
        result
    }

    fn all_tags(&self) -> Result<Vec<String>> {
        let repo = self.lock();
        let tags = repo
            .tag_names(None)
            .map_err(|source| RepoError::TagError { tag: "*".to_string(), source })?;
        Ok(tags.iter().flatten().map(ToString::to_string).collect())
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.all_tags()?.iter().any(|tag| tag == name))
    }

    fn create_tag(&self, name: &str, message: Option<&str>, sign: bool) -> Result<()> {
        if sign {
            log::warn!("Signed tags are not supported; creating '{name}' unsigned");
        }

        let repo = self.lock();
        let signature = repo.signature().map_err(RepoError::SignatureError)?;
        let tag_message = match message {
            Some(msg) => msg.to_string(),
            None => format!("chore: tag creation: {name}"),
        };

        let head = repo.head().map_err(RepoError::HeadError)?;
        let target_oid = head.target().ok_or_else(|| {
            RepoError::TagError {
                tag: name.to_string(),
                source: Git2Error::from_str("Invalid tag target"),
            }
        })?;
        let target_object = repo
            .find_object(target_oid, None)
            .map_err(|source| RepoError::TagError { tag: name.to_string(), source })?;

        repo.tag(name, &target_object, &signature, &tag_message, false)
            .map_err(|source| RepoError::TagError { tag: name.to_string(), source })?;

        Ok(())
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        let repo = self.lock();
        repo.tag_delete(name)
            .map_err(|source| RepoError::TagError { tag: name.to_string(), source })
    }

    fn push_tag(&self, name: &str, remote: &str) -> Result<()> {
        self.push_refspecs(remote, &[format!("refs/tags/{name}:refs/tags/{name}")])
    }

    fn delete_remote_tag(&self, name: &str, remote: &str) -> Result<()> {
        // An empty source side deletes the remote ref.
        self.push_refspecs(remote, &[format!(":refs/tags/{name}")])
    }

    fn commit(&self, message: &str, files: Option<&[PathBuf]>, sign: bool) -> Result<String> {
        if sign {
            log::warn!("Signed commits are not supported; committing unsigned");
        }

        let repo = self.lock();
        let signature = repo.signature().map_err(RepoError::SignatureError)?;
        let head_ref = repo.head().map_err(RepoError::HeadError)?;
        let head_commit = head_ref.peel_to_commit().map_err(RepoError::HeadError)?;

        let tree_id = {
            let mut index = repo.index().map_err(RepoError::IndexError)?;

            match files {
                Some(paths) => {
                    for path in paths {
                        let relative = path.strip_prefix(&self.workdir).unwrap_or(path);
                        index.add_path(relative).map_err(RepoError::IndexError)?;
                    }
                }
                None => {
                    index
                        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
                        .map_err(RepoError::IndexError)?;
                }
            }

            index.write().map_err(RepoError::IndexError)?;
            index.write_tree().map_err(RepoError::IndexError)?
        };

        let tree = repo.find_tree(tree_id).map_err(RepoError::CommitError)?;

        let commit_id = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &[&head_commit])
            .map_err(RepoError::CommitError)?;

        Ok(commit_id.to_string())
    }

    fn push(&self, remote: &str, branch: Option<&str>) -> Result<()> {
        let branch_name = match branch {
            Some(name) => name.to_string(),
            None => self.current_branch()?,
        };

        self.push_refspecs(
            remote,
            &[format!("refs/heads/{branch_name}:refs/heads/{branch_name}")],
        )
    }

    fn commits(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<CommitInfo>> {
        let repo = self.lock();
        let mut revwalk = repo.revwalk().map_err(RepoError::RevWalkError)?;

        match to {
            Some(reference) => {
                let oid = Self::resolve_commit_oid(&repo, reference)?;
                revwalk.push(oid).map_err(RepoError::RevWalkError)?;
            }
            None => revwalk.push_head().map_err(RepoError::RevWalkError)?,
        }

        if let Some(reference) = from {
            let oid = Self::resolve_commit_oid(&repo, reference)?;
            revwalk.hide(oid).map_err(RepoError::RevWalkError)?;
        }

        // Newest first, like `git log`.
        revwalk.set_sorting(git2::Sort::TIME).map_err(RepoError::RevWalkError)?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result.map_err(RepoError::RevWalkError)?;
            commits.push(Self::commit_info(&repo, oid)?);
        }

        Ok(commits)
    }

    fn changed_files(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<String>> {
        let repo = self.lock();

        let to_oid = Self::resolve_commit_oid(&repo, to.unwrap_or("HEAD"))?;
        let to_commit = repo.find_commit(to_oid).map_err(RepoError::DiffError)?;
        let to_tree = to_commit.tree().map_err(RepoError::DiffError)?;

        let from_tree = match from {
            Some(reference) => {
                let oid = Self::resolve_commit_oid(&repo, reference)?;
                let commit = repo.find_commit(oid).map_err(RepoError::DiffError)?;
                Some(commit.tree().map_err(RepoError::DiffError)?)
            }
            None => match to_commit.parent(0) {
                Ok(parent) => Some(parent.tree().map_err(RepoError::DiffError)?),
                Err(_) => None, // root commit
            },
        };

        let diff = repo
            .diff_tree_to_tree(from_tree.as_ref(), Some(&to_tree), None)
            .map_err(RepoError::DiffError)?;

        let mut files = Vec::new();
        for delta in diff.deltas() {
            if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                files.push(path.display().to_string());
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }

    fn tag_target(&self, tag: &str) -> Result<String> {
        let repo = self.lock();
        let oid = Self::resolve_commit_oid(&repo, &format!("refs/tags/{tag}"))?;
        Ok(oid.to_string())
    }

    fn revert_commit(&self, reference: &str) -> Result<String> {
        let reverted_summary = {
            let repo = self.lock();
            let oid = Self::resolve_commit_oid(&repo, reference)?;
            let commit = repo.find_commit(oid).map_err(|source| RepoError::RevertError {
                commit: reference.to_string(),
                source,
            })?;

            repo.revert(&commit, None).map_err(|source| RepoError::RevertError {
                commit: reference.to_string(),
                source,
            })?;

            commit.summary().unwrap_or(reference).to_string()
        };

        // The revert left the index populated; commit it.
        self.commit(&format!("Revert \"{reverted_summary}\""), None, false)
    }

    fn user_info(&self) -> Result<UserInfo> {
        let repo = self.lock();
        let signature = repo.signature().map_err(RepoError::SignatureError)?;
        Ok(UserInfo {
            name: signature.name().unwrap_or("").to_string(),
            email: signature.email().unwrap_or("").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn init_repo(dir: &Path) -> GitClient {
        let repo = Repository::init(dir).expect("init repo");
        {
            let mut config = repo.config().expect("config");
            config.set_str("user.name", "Test User").expect("set name");
            config.set_str("user.email", "test@example.com").expect("set email");
        }

        // Seed an initial commit so HEAD exists.
        fs::write(dir.join("README.md"), "# test\n").expect("write file");
        let mut index = repo.index().expect("index");
        index.add_path(Path::new("README.md")).expect("add");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = repo.find_tree(tree_id).expect("tree");
        let sig = repo.signature().expect("signature");
        repo.commit(Some("HEAD"), &sig, &sig, "chore: initial commit", &tree, &[])
            .expect("initial commit");

        GitClient::discover(dir).expect("discover")
    }

    fn write_and_commit(client: &GitClient, dir: &Path, file: &str, message: &str) -> String {
        fs::write(dir.join(file), message).expect("write file");
        client.commit(message, None, false).expect("commit")
    }

    #[test]
    fn test_discover_outside_repo_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = GitClient::discover(dir.path());
        assert!(matches!(result, Err(RepoError::NotARepository { .. })));
    }

    #[test]
    fn test_commit_and_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = init_repo(dir.path());

        write_and_commit(&client, dir.path(), "a.txt", "feat: add a");
        write_and_commit(&client, dir.path(), "b.txt", "fix: add b");

        let commits = client.commits(None, None).expect("commits");
        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].subject, "fix: add b");
        assert_eq!(commits[0].author_name, "Test User");
        assert!(!commits[0].short_hash.is_empty());
    }

    #[test]
    fn test_commits_between_references() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = init_repo(dir.path());

        client.create_tag("v1.0.0", None, false).expect("tag");
        write_and_commit(&client, dir.path(), "a.txt", "feat: after tag");

        let commits = client.commits(Some("v1.0.0"), None).expect("commits");
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].subject, "feat: after tag");
    }

    #[test]
    fn test_is_clean_tracks_untracked_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = init_repo(dir.path());

        assert!(client.is_clean().expect("clean"));

        fs::write(dir.path().join("dirty.txt"), "x").expect("write");
        assert!(!client.is_clean().expect("dirty"));
    }

    #[test]
    fn test_tag_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = init_repo(dir.path());

        client.create_tag("v1.2.3", Some("release"), false).expect("create tag");
        assert!(client.tag_exists("v1.2.3").expect("exists"));
        assert_eq!(client.latest_tag().expect("latest"), Some("v1.2.3".to_string()));

        let target = client.tag_target("v1.2.3").expect("target");
        assert_eq!(target, client.current_commit(false).expect("head"));

        client.delete_tag("v1.2.3").expect("delete tag");
        assert!(!client.tag_exists("v1.2.3").expect("exists"));
    }

    #[test]
    fn test_changed_files_between_commits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = init_repo(dir.path());

        let first = client.current_commit(false).expect("head");
        write_and_commit(&client, dir.path(), "x.txt", "feat: x");
        write_and_commit(&client, dir.path(), "y.txt", "feat: y");

        let files = client.changed_files(Some(&first), None).expect("changed");
        assert_eq!(files, vec!["x.txt".to_string(), "y.txt".to_string()]);
    }

    #[test]
    fn test_commit_with_explicit_file_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = init_repo(dir.path());

        fs::write(dir.path().join("staged.txt"), "in").expect("write");
        fs::write(dir.path().join("unstaged.txt"), "out").expect("write");

        client
            .commit("chore: staged only", Some(&[dir.path().join("staged.txt")]), false)
            .expect("commit");

        let files = client.changed_files(None, None).expect("changed");
        assert_eq!(files, vec!["staged.txt".to_string()]);
        assert!(!client.is_clean().expect("unstaged remains"));
    }

    #[test]
    fn test_user_info_reads_signature() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = init_repo(dir.path());

        let user = client.user_info().expect("user info");
        assert_eq!(user.name, "Test User");
        assert_eq!(user.email, "test@example.com");
    }

    #[test]
    fn test_revert_commit_creates_inverse_commit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = init_repo(dir.path());

        let sha = write_and_commit(&client, dir.path(), "gone.txt", "feat: add gone");
        client.revert_commit(&sha).expect("revert");

        assert!(!dir.path().join("gone.txt").exists());
        let commits = client.commits(None, None).expect("commits");
        assert!(commits[0].subject.starts_with("Revert"));
    }
}
