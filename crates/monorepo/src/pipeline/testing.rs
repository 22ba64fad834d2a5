//! In-memory fakes for the VCS and package-manager surfaces.
//!
//! The pipeline takes both clients as constructor parameters, so tests swap
//! these in and assert on the recorded interactions.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::{json, Value};
use shipit_git_tools::{CommitInfo, RepoError, UserInfo, VcsClient};
use shipit_pkg_tools::npm::{NpmClient, PackInfo, PublishOptions};
use shipit_pkg_tools::{NpmClientError, PackageResult};

#[derive(Debug)]
struct VcsState {
    is_repo: bool,
    clean: bool,
    branch: String,
    remote_url: String,
    tags: BTreeSet<String>,
    commits: Vec<CommitInfo>,
    created_commits: Vec<String>,
    pushed_tags: Vec<String>,
    deleted_remote_tags: Vec<String>,
    pushed_branches: Vec<String>,
    reverted: Vec<String>,
}

impl Default for VcsState {
    fn default() -> Self {
        Self {
            is_repo: true,
            clean: true,
            branch: "main".to_string(),
            remote_url: "git@github.com:acme/workspace.git".to_string(),
            tags: BTreeSet::new(),
            commits: Vec::new(),
            created_commits: Vec::new(),
            pushed_tags: Vec::new(),
            deleted_remote_tags: Vec::new(),
            pushed_branches: Vec::new(),
            reverted: Vec::new(),
        }
    }
}

/// Scriptable [`VcsClient`] fake.
#[derive(Debug, Clone, Default)]
pub struct MemoryVcs {
    state: Arc<Mutex<VcsState>>,
}

impl MemoryVcs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VcsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn without_repo(self) -> Self {
        self.lock().is_repo = false;
        self
    }

    #[must_use]
    pub fn with_dirty_tree(self) -> Self {
        self.lock().clean = false;
        self
    }

    #[must_use]
    pub fn with_branch(self, branch: &str) -> Self {
        self.lock().branch = branch.to_string();
        self
    }

    #[must_use]
    pub fn with_remote(self, url: &str) -> Self {
        self.lock().remote_url = url.to_string();
        self
    }

    #[must_use]
    pub fn with_tag(self, tag: &str) -> Self {
        self.lock().tags.insert(tag.to_string());
        self
    }

    #[must_use]
    pub fn with_commit_subjects(self, subjects: &[&str]) -> Self {
        {
            let mut state = self.lock();
            state.commits = subjects
                .iter()
                .enumerate()
                .map(|(index, subject)| CommitInfo {
                    hash: format!("{index:040x}"),
                    short_hash: format!("{index:07x}"),
                    subject: (*subject).to_string(),
                    body: None,
                    author_name: "Test".to_string(),
                    author_email: "test@example.com".to_string(),
                    date: Utc::now(),
                })
                .collect();
        }
        self
    }

    pub fn created_commits(&self) -> Vec<String> {
        self.lock().created_commits.clone()
    }

    pub fn pushed_tags(&self) -> Vec<String> {
        self.lock().pushed_tags.clone()
    }

    pub fn deleted_remote_tags(&self) -> Vec<String> {
        self.lock().deleted_remote_tags.clone()
    }

    pub fn tags(&self) -> BTreeSet<String> {
        self.lock().tags.clone()
    }

    pub fn reverted_commits(&self) -> Vec<String> {
        self.lock().reverted.clone()
    }
}

impl VcsClient for MemoryVcs {
    fn is_repo(&self) -> bool {
        self.lock().is_repo
    }

    fn is_clean(&self) -> shipit_git_tools::Result<bool> {
        Ok(self.lock().clean)
    }

    fn current_branch(&self) -> shipit_git_tools::Result<String> {
        Ok(self.lock().branch.clone())
    }

    fn current_commit(&self, short: bool) -> shipit_git_tools::Result<String> {
        Ok(if short { "abc1234".to_string() } else { "abc1234def5678".to_string() })
    }

    fn remote_url(&self, _remote: &str) -> shipit_git_tools::Result<String> {
        Ok(self.lock().remote_url.clone())
    }

    fn latest_tag(&self) -> shipit_git_tools::Result<Option<String>> {
        Ok(self.lock().tags.iter().next_back().cloned())
    }

    fn all_tags(&self) -> shipit_git_tools::Result<Vec<String>> {
        Ok(self.lock().tags.iter().cloned().collect())
    }

    fn tag_exists(&self, name: &str) -> shipit_git_tools::Result<bool> {
        Ok(self.lock().tags.contains(name))
    }

    fn create_tag(
        &self,
        name: &str,
        _message: Option<&str>,
        _sign: bool,
    ) -> shipit_git_tools::Result<()> {
        let mut state = self.lock();
        if !state.tags.insert(name.to_string()) {
            return Err(RepoError::Other(format!("tag {name} already exists")));
        }
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> shipit_git_tools::Result<()> {
        let mut state = self.lock();
        if state.tags.remove(name) {
            Ok(())
        } else {
            Err(RepoError::Other(format!("tag {name} does not exist")))
        }
    }

    fn push_tag(&self, name: &str, _remote: &str) -> shipit_git_tools::Result<()> {
        self.lock().pushed_tags.push(name.to_string());
        Ok(())
    }

    fn delete_remote_tag(&self, name: &str, _remote: &str) -> shipit_git_tools::Result<()> {
        self.lock().deleted_remote_tags.push(name.to_string());
        Ok(())
    }

    fn commit(
        &self,
        message: &str,
        _files: Option<&[std::path::PathBuf]>,
        _sign: bool,
    ) -> shipit_git_tools::Result<String> {
        let mut state = self.lock();
        state.created_commits.push(message.to_string());
        Ok(format!("commit{:04}", state.created_commits.len()))
    }

    fn push(&self, remote: &str, branch: Option<&str>) -> shipit_git_tools::Result<()> {
        let branch = branch.map(ToString::to_string).unwrap_or_else(|| self.lock().branch.clone());
        self.lock().pushed_branches.push(format!("{remote}/{branch}"));
        Ok(())
    }

    fn commits(
        &self,
        _from: Option<&str>,
        _to: Option<&str>,
    ) -> shipit_git_tools::Result<Vec<CommitInfo>> {
        Ok(self.lock().commits.clone())
    }

    fn changed_files(
        &self,
        _from: Option<&str>,
        _to: Option<&str>,
    ) -> shipit_git_tools::Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn tag_target(&self, tag: &str) -> shipit_git_tools::Result<String> {
        if self.lock().tags.contains(tag) {
            Ok(format!("target-of-{tag}"))
        } else {
            Err(RepoError::Other(format!("tag {tag} does not exist")))
        }
    }

    fn revert_commit(&self, reference: &str) -> shipit_git_tools::Result<String> {
        self.lock().reverted.push(reference.to_string());
        Ok(format!("revert-of-{reference}"))
    }

    fn user_info(&self) -> shipit_git_tools::Result<UserInfo> {
        Ok(UserInfo { name: "Test".to_string(), email: "test@example.com".to_string() })
    }
}

#[derive(Debug, Default)]
struct NpmState {
    published: BTreeMap<String, BTreeSet<String>>,
    deprecations: Vec<(String, String, String)>,
    publish_calls: Vec<(String, String, Option<String>)>, // (name, version, registry)
    fail_publish: BTreeMap<String, String>,
    fail_unpublish: Option<String>,
    transient_failures: BTreeMap<String, u32>,
    whoami: Option<String>,
}

/// Scriptable [`NpmClient`] fake.
#[derive(Debug, Clone, Default)]
pub struct MemoryNpm {
    state: Arc<Mutex<NpmState>>,
}

impl MemoryNpm {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.lock().whoami = Some("test-user".to_string());
        fake
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NpmState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_published(self, name: &str, version: &str) -> Self {
        self.lock().published.entry(name.to_string()).or_default().insert(version.to_string());
        self
    }

    /// Publishing `name` always fails with this message.
    #[must_use]
    pub fn failing_publish(self, name: &str, stderr: &str) -> Self {
        self.lock().fail_publish.insert(name.to_string(), stderr.to_string());
        self
    }

    /// Publishing `name` fails transiently this many times, then succeeds.
    #[must_use]
    pub fn flaky_publish(self, name: &str, failures: u32) -> Self {
        self.lock().transient_failures.insert(name.to_string(), failures);
        self
    }

    #[must_use]
    pub fn failing_unpublish(self, stderr: &str) -> Self {
        self.lock().fail_unpublish = Some(stderr.to_string());
        self
    }

    /// Publish attempts as (name, version, registry), in call order.
    pub fn publish_calls(&self) -> Vec<(String, String, Option<String>)> {
        self.lock().publish_calls.clone()
    }

    pub fn deprecations(&self) -> Vec<(String, String, String)> {
        self.lock().deprecations.clone()
    }

    pub fn version_published(&self, name: &str, version: &str) -> bool {
        self.lock().published.get(name).is_some_and(|versions| versions.contains(version))
    }
}

fn manifest_identity(pkg_dir: &Path) -> (String, String) {
    let raw = std::fs::read_to_string(pkg_dir.join("package.json")).unwrap_or_default();
    let value: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
    (
        value.get("name").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        value.get("version").and_then(Value::as_str).unwrap_or("0.0.0").to_string(),
    )
}

#[async_trait::async_trait]
impl NpmClient for MemoryNpm {
    async fn publish(&self, pkg_dir: &Path, options: &PublishOptions) -> PackageResult<String> {
        let (name, version) = manifest_identity(pkg_dir);
        let mut state = self.lock();

        state.publish_calls.push((name.clone(), version.clone(), options.registry.clone()));

        if let Some(stderr) = state.fail_publish.get(&name) {
            return Err(NpmClientError::OperationFailed {
                operation: "publish".to_string(),
                package: name,
                stderr: stderr.clone(),
            }
            .into());
        }

        if let Some(remaining) = state.transient_failures.get_mut(&name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NpmClientError::OperationFailed {
                    operation: "publish".to_string(),
                    package: name,
                    stderr: "npm ERR! network ETIMEDOUT".to_string(),
                }
                .into());
            }
        }

        if !options.dry_run {
            state.published.entry(name.clone()).or_default().insert(version.clone());
        }

        Ok(format!("+ {name}@{version}"))
    }

    async fn unpublish(
        &self,
        name: &str,
        version: Option<&str>,
        _registry: Option<&str>,
    ) -> PackageResult<()> {
        let mut state = self.lock();

        if let Some(stderr) = &state.fail_unpublish {
            return Err(NpmClientError::OperationFailed {
                operation: "unpublish".to_string(),
                package: name.to_string(),
                stderr: stderr.clone(),
            }
            .into());
        }

        match version {
            Some(version) => {
                if let Some(versions) = state.published.get_mut(name) {
                    versions.remove(version);
                }
            }
            None => {
                state.published.remove(name);
            }
        }
        Ok(())
    }

    async fn deprecate(
        &self,
        name: &str,
        version: &str,
        message: &str,
        _registry: Option<&str>,
    ) -> PackageResult<()> {
        self.lock().deprecations.push((
            name.to_string(),
            version.to_string(),
            message.to_string(),
        ));
        Ok(())
    }

    async fn view(
        &self,
        name: &str,
        field: Option<&str>,
        _registry: Option<&str>,
    ) -> PackageResult<Option<Value>> {
        let state = self.lock();
        let Some(versions) = state.published.get(name) else {
            return Ok(None);
        };

        let latest = versions.iter().next_back().cloned().unwrap_or_default();
        let full = json!({
            "name": name,
            "dist-tags": {"latest": latest},
            "versions": versions.iter().cloned().collect::<Vec<_>>(),
        });

        Ok(Some(match field {
            Some("dist-tags.latest") => json!(latest),
            Some("versions") => full["versions"].clone(),
            Some("name") => json!(name),
            _ => full,
        }))
    }

    async fn whoami(&self, _registry: Option<&str>) -> PackageResult<Option<String>> {
        Ok(self.lock().whoami.clone())
    }

    async fn pack(&self, pkg_dir: &Path) -> PackageResult<PackInfo> {
        let (name, version) = manifest_identity(pkg_dir);
        let safe_name = name.replace('@', "").replace('/', "-");
        Ok(PackInfo { filename: format!("{safe_name}-{version}.tgz"), size: 2048 })
    }
}
