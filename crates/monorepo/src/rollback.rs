//! Rolling back a published release.
//!
//! Actions run in a fixed order (unpublish or deprecate, revert the release
//! commit, delete tags); each action's outcome is recorded and later actions
//! still run after a failure. Every rollback appends an audit record to the
//! history file at the workspace root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shipit_git_tools::VcsClient;
use shipit_pkg_tools::npm::NpmClient;

use crate::error::{Result, RollbackError};

/// History file at the workspace root.
pub const HISTORY_FILE: &str = ".publisher-history.json";

/// What a rollback should do.
#[derive(Debug, Clone, Default)]
pub struct RollbackOptions {
    /// Version to roll back; required for deprecate and tag deletion
    pub version: Option<String>,
    /// Registry URL override
    pub registry: Option<String>,
    /// Remove the version from the registry
    pub unpublish: bool,
    /// Mark the version deprecated instead of removing it
    pub deprecate: bool,
    /// Message attached to the deprecation
    pub deprecate_message: Option<String>,
    /// Revert the release commit
    pub revert_vcs: bool,
    /// Delete the release tag locally and on the remote
    pub delete_tag: bool,
    /// Remote used for tag deletion
    pub remote: String,
    /// Why the rollback happened; stored in the record
    pub reason: Option<String>,
}

/// The individual steps a rollback can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollbackActionKind {
    /// Remove the version from the registry
    Unpublish,
    /// Mark the version deprecated
    Deprecate,
    /// Revert the release commit
    RevertVcs,
    /// Delete the release tag
    DeleteTag,
    /// Restore files from before the release
    RestoreFiles,
}

/// Outcome of one rollback step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackAction {
    /// Which step ran
    pub kind: RollbackActionKind,
    /// Whether the step succeeded
    pub success: bool,
    /// Whether the step was a no-op (e.g. nothing to revert)
    #[serde(default)]
    pub skipped: bool,
    /// Failure or no-op detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the step finished
    pub timestamp: DateTime<Utc>,
}

impl RollbackAction {
    fn ok(kind: RollbackActionKind) -> Self {
        Self { kind, success: true, skipped: false, error: None, timestamp: Utc::now() }
    }

    fn failed(kind: RollbackActionKind, error: String) -> Self {
        Self { kind, success: false, skipped: false, error: Some(error), timestamp: Utc::now() }
    }

    fn skipped(kind: RollbackActionKind, reason: String) -> Self {
        Self { kind, success: false, skipped: true, error: Some(reason), timestamp: Utc::now() }
    }
}

/// Audit record of one rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRecord {
    /// Unique record id
    pub id: String,
    /// The package rolled back
    pub package: String,
    /// The version rolled back, when known
    pub version: Option<String>,
    /// Stated reason
    pub reason: Option<String>,
    /// When the rollback ran
    pub timestamp: DateTime<Utc>,
    /// Steps taken, in order
    pub actions: Vec<RollbackAction>,
    /// Conjunction of the non-skipped steps' success
    pub success: bool,
}

/// Performs rollbacks and keeps their audit trail.
pub struct RollbackEngine {
    vcs: Arc<dyn VcsClient>,
    npm: Arc<dyn NpmClient>,
    history_path: PathBuf,
}

impl std::fmt::Debug for RollbackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackEngine")
            .field("history_path", &self.history_path)
            .finish_non_exhaustive()
    }
}

impl RollbackEngine {
    /// Creates an engine writing history next to the workspace root.
    #[must_use]
    pub fn new(vcs: Arc<dyn VcsClient>, npm: Arc<dyn NpmClient>, workspace_root: &Path) -> Self {
        Self { vcs, npm, history_path: workspace_root.join(HISTORY_FILE) }
    }

    /// Runs the requested rollback actions for a package.
    ///
    /// Actions run in order; a failed action is recorded and the remaining
    /// actions still run. The persisted record's `success` is the
    /// conjunction of all executed actions.
    pub async fn rollback(&self, package: &str, options: &RollbackOptions) -> Result<RollbackRecord> {
        if !options.unpublish && !options.deprecate && !options.revert_vcs && !options.delete_tag
        {
            return Err(RollbackError::NothingToDo { package: package.to_string() }.into());
        }

        let mut actions = Vec::new();

        if options.unpublish {
            actions.push(self.unpublish(package, options).await);
        } else if options.deprecate {
            actions.push(self.deprecate(package, options).await);
        }

        if options.revert_vcs {
            actions.push(self.revert_vcs(package, options));
        }

        if options.delete_tag {
            actions.extend(self.delete_tags(options));
        }

        let success = actions.iter().filter(|a| !a.skipped).all(|a| a.success);

        let record = RollbackRecord {
            id: uuid::Uuid::new_v4().to_string(),
            package: package.to_string(),
            version: options.version.clone(),
            reason: options.reason.clone(),
            timestamp: Utc::now(),
            actions,
            success,
        };

        self.append_history(&record).await?;
        Ok(record)
    }

    /// Loads the persisted rollback history, oldest first.
    pub async fn history(&self) -> Result<Vec<RollbackRecord>> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }

        let content =
            tokio::fs::read_to_string(&self.history_path).await.map_err(|source| {
                RollbackError::Io { path: self.history_path.display().to_string(), source }
            })?;

        Ok(serde_json::from_str(&content).unwrap_or_default())
    }

    async fn unpublish(&self, package: &str, options: &RollbackOptions) -> RollbackAction {
        match self
            .npm
            .unpublish(package, options.version.as_deref(), options.registry.as_deref())
            .await
        {
            Ok(()) => RollbackAction::ok(RollbackActionKind::Unpublish),
            Err(e) => RollbackAction::failed(RollbackActionKind::Unpublish, e.to_string()),
        }
    }

    async fn deprecate(&self, package: &str, options: &RollbackOptions) -> RollbackAction {
        let Some(version) = options.version.as_deref() else {
            return RollbackAction::failed(
                RollbackActionKind::Deprecate,
                "deprecate requires a version".to_string(),
            );
        };

        let message = options
            .deprecate_message
            .clone()
            .or_else(|| options.reason.clone())
            .unwrap_or_else(|| "deprecated by rollback".to_string());

        match self.npm.deprecate(package, version, &message, options.registry.as_deref()).await {
            Ok(()) => RollbackAction::ok(RollbackActionKind::Deprecate),
            Err(e) => RollbackAction::failed(RollbackActionKind::Deprecate, e.to_string()),
        }
    }

    /// Reverts the commit the release tag points at.
    ///
    /// When the tag or its commit cannot be located the action is recorded
    /// as a skipped no-op with a warning, never as a success.
    fn revert_vcs(&self, package: &str, options: &RollbackOptions) -> RollbackAction {
        let Some(version) = options.version.as_deref() else {
            return RollbackAction::skipped(
                RollbackActionKind::RevertVcs,
                "no version given; cannot locate the release commit".to_string(),
            );
        };

        let candidates = [format!("{package}@{version}"), tag_name(version)];

        for tag in &candidates {
            match self.vcs.tag_exists(tag) {
                Ok(true) => {
                    let target = match self.vcs.tag_target(tag) {
                        Ok(target) => target,
                        Err(e) => {
                            return RollbackAction::failed(
                                RollbackActionKind::RevertVcs,
                                format!("tag {tag} exists but cannot be resolved: {e}"),
                            )
                        }
                    };

                    return match self.vcs.revert_commit(&target) {
                        Ok(new_commit) => {
                            log::info!("Reverted {target} as {new_commit}");
                            RollbackAction::ok(RollbackActionKind::RevertVcs)
                        }
                        Err(e) => RollbackAction::failed(
                            RollbackActionKind::RevertVcs,
                            e.to_string(),
                        ),
                    };
                }
                Ok(false) => {}
                Err(e) => {
                    return RollbackAction::failed(RollbackActionKind::RevertVcs, e.to_string())
                }
            }
        }

        log::warn!("No release commit found for {package}@{version}; nothing reverted");
        RollbackAction::skipped(
            RollbackActionKind::RevertVcs,
            format!("no tag for {package}@{version}; nothing reverted"),
        )
    }

    fn delete_tags(&self, options: &RollbackOptions) -> Vec<RollbackAction> {
        let Some(version) = options.version.as_deref() else {
            return vec![RollbackAction::skipped(
                RollbackActionKind::DeleteTag,
                "no version given; cannot compute the tag name".to_string(),
            )];
        };

        let tag = tag_name(version);
        let mut actions = Vec::new();

        match self.vcs.tag_exists(&tag) {
            Ok(true) => {
                let local = match self.vcs.delete_tag(&tag) {
                    Ok(()) => RollbackAction::ok(RollbackActionKind::DeleteTag),
                    Err(e) => {
                        RollbackAction::failed(RollbackActionKind::DeleteTag, e.to_string())
                    }
                };
                actions.push(local);

                match self.vcs.delete_remote_tag(&tag, &options.remote) {
                    Ok(()) => actions.push(RollbackAction::ok(RollbackActionKind::DeleteTag)),
                    Err(e) => {
                        log::warn!("Could not delete remote tag {tag}: {e}");
                        actions.push(RollbackAction::failed(
                            RollbackActionKind::DeleteTag,
                            format!("remote: {e}"),
                        ));
                    }
                }
            }
            Ok(false) => {
                actions.push(RollbackAction::skipped(
                    RollbackActionKind::DeleteTag,
                    format!("tag {tag} does not exist"),
                ));
            }
            Err(e) => {
                actions.push(RollbackAction::failed(RollbackActionKind::DeleteTag, e.to_string()));
            }
        }

        actions
    }

    async fn append_history(&self, record: &RollbackRecord) -> Result<()> {
        let mut history = self.history().await?;
        history.push(record.clone());

        let mut rendered =
            serde_json::to_string_pretty(&history).unwrap_or_else(|_| "[]".to_string());
        rendered.push('\n');

        tokio::fs::write(&self.history_path, rendered).await.map_err(|source| {
            RollbackError::Io { path: self.history_path.display().to_string(), source }.into()
        })
    }
}

/// The VCS tag for a version: the version itself when already `v`-prefixed,
/// else `v<version>`.
#[must_use]
pub fn tag_name(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{MemoryNpm, MemoryVcs};

    fn engine(dir: &Path, vcs: MemoryVcs, npm: MemoryNpm) -> RollbackEngine {
        RollbackEngine::new(Arc::new(vcs), Arc::new(npm), dir)
    }

    #[tokio::test]
    async fn test_deprecate_and_delete_tag_scenario() {
        let dir = tempfile::tempdir().expect("tempdir");
        let vcs = MemoryVcs::new().with_tag("v1.2.3");
        let npm = MemoryNpm::new().with_published("p", "1.2.3");

        let engine = engine(dir.path(), vcs.clone(), npm.clone());
        let record = engine
            .rollback(
                "p",
                &RollbackOptions {
                    version: Some("1.2.3".to_string()),
                    deprecate: true,
                    delete_tag: true,
                    remote: "origin".to_string(),
                    reason: Some("security".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("rollback");

        assert!(record.success);
        assert_eq!(
            npm.deprecations(),
            vec![("p".to_string(), "1.2.3".to_string(), "security".to_string())]
        );
        assert!(!vcs.tag_exists("v1.2.3").expect("tag check"));
        assert!(vcs.deleted_remote_tags().contains(&"v1.2.3".to_string()));

        // Three actions: deprecate, local tag, remote tag.
        assert_eq!(record.actions.len(), 3);

        // The record landed in the history file.
        let history_path = dir.path().join(HISTORY_FILE);
        assert!(history_path.exists());
        let history = engine.history().await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].package, "p");
    }

    #[tokio::test]
    async fn test_unpublish_wins_over_deprecate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let npm = MemoryNpm::new().with_published("p", "1.0.0");

        let engine = engine(dir.path(), MemoryVcs::new(), npm.clone());
        let record = engine
            .rollback(
                "p",
                &RollbackOptions {
                    version: Some("1.0.0".to_string()),
                    unpublish: true,
                    deprecate: true,
                    ..Default::default()
                },
            )
            .await
            .expect("rollback");

        assert!(record.success);
        assert!(npm.deprecations().is_empty());
        assert!(!npm.version_published("p", "1.0.0"));
    }

    #[tokio::test]
    async fn test_revert_without_tag_is_a_skipped_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(dir.path(), MemoryVcs::new(), MemoryNpm::new());

        let record = engine
            .rollback(
                "p",
                &RollbackOptions {
                    version: Some("9.9.9".to_string()),
                    revert_vcs: true,
                    ..Default::default()
                },
            )
            .await
            .expect("rollback");

        assert_eq!(record.actions.len(), 1);
        let action = &record.actions[0];
        assert!(action.skipped);
        assert!(!action.success);
        assert!(action.error.as_deref().is_some_and(|e| e.contains("nothing reverted")));
        // A pure no-op does not fail the record.
        assert!(record.success);
    }

    #[tokio::test]
    async fn test_failed_action_fails_the_record_but_later_actions_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let vcs = MemoryVcs::new().with_tag("v1.0.0");
        let npm = MemoryNpm::new().failing_unpublish("registry policy: past the window");

        let engine = engine(dir.path(), vcs.clone(), npm);
        let record = engine
            .rollback(
                "p",
                &RollbackOptions {
                    version: Some("1.0.0".to_string()),
                    unpublish: true,
                    delete_tag: true,
                    remote: "origin".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("rollback");

        assert!(!record.success);
        assert!(!record.actions[0].success);
        // Tag deletion still ran.
        assert!(!vcs.tag_exists("v1.0.0").expect("tag check"));
    }

    #[tokio::test]
    async fn test_no_actions_requested_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(dir.path(), MemoryVcs::new(), MemoryNpm::new());

        let result = engine.rollback("p", &RollbackOptions::default()).await;
        assert!(result.is_err());
    }
}
