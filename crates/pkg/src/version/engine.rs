use std::collections::BTreeMap;
use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};
use shipit_git_tools::VcsClient;
use shipit_standard_tools::manifest::{PackageManifest, DEPENDENCY_SECTIONS};

use crate::conventional::{CommitParser, CommitType, ConventionalCommit};
use crate::error::{PackageResult, VersionError};
use crate::package::{Package, WorkspaceSpec};
use crate::registry::{Registry, RegistryHttpClient};
use crate::version::bump::{bump, ReleaseKind};

/// What to do when the latest tag is ahead of the manifest version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum VersionPolicy {
    /// Trust the manifest (default)
    #[default]
    PreferManifest,
    /// Trust the tag
    PreferTag,
    /// Refuse to proceed
    Error,
}

/// Outcome of a version recommendation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    /// Recommended bump kind, or `None` when nothing warrants one
    pub kind: Option<ReleaseKind>,
    /// The version the bump would produce
    pub version: Option<Version>,
    /// Human-readable explanation
    pub reason: String,
}

/// Maintains package versions: reads them, bumps them, recommends bumps from
/// commit history, and writes them back.
#[derive(Debug, Clone, Default)]
pub struct VersionEngine {
    policy: VersionPolicy,
}

impl VersionEngine {
    /// Creates an engine with the given tag-vs-manifest policy.
    #[must_use]
    pub fn new(policy: VersionPolicy) -> Self {
        Self { policy }
    }

    /// Current version of a package.
    #[must_use]
    pub fn current_version(&self, pkg: &Package) -> Version {
        pkg.version.clone()
    }

    /// Computes the next version for a bump kind. See [`bump`].
    pub fn bump(
        &self,
        current: &Version,
        kind: ReleaseKind,
        preid: Option<&str>,
    ) -> PackageResult<Version> {
        Ok(bump(current, kind, preid)?)
    }

    /// Sets a package to an exact version, updating both the in-memory
    /// package and its manifest on disk.
    pub async fn set_exact(&self, pkg: &mut Package, version: &Version) -> PackageResult<()> {
        pkg.manifest.set_version(&version.to_string());
        pkg.manifest.write().await?;
        pkg.version = version.clone();
        Ok(())
    }

    /// Recommends a bump from the commits since the latest reachable tag.
    ///
    /// Any breaking commit recommends major; otherwise a feature recommends
    /// minor; otherwise a fix, perf or refactor recommends patch; otherwise
    /// no bump is recommended.
    pub fn recommend(&self, vcs: &dyn VcsClient, pkg: &Package) -> PackageResult<Recommendation> {
        let latest_tag = vcs.latest_tag()?;
        let commits = vcs.commits(latest_tag.as_deref(), None)?;

        let parser = CommitParser::new();
        let (conventional, _) = parser.parse_all(&commits);

        let baseline = self.reconcile_baseline(pkg, latest_tag.as_deref())?;
        Ok(self.recommend_from_commits(&conventional, &baseline))
    }

    /// Pure recommendation over already-parsed commits.
    #[must_use]
    pub fn recommend_from_commits(
        &self,
        commits: &[ConventionalCommit],
        baseline: &Version,
    ) -> Recommendation {
        let breaking = commits.iter().find(|c| c.breaking);
        let feature = commits.iter().find(|c| c.commit_type == CommitType::Feat);
        let fixing = commits.iter().find(|c| {
            matches!(c.commit_type, CommitType::Fix | CommitType::Perf | CommitType::Refactor)
        });

        let (kind, reason) = if let Some(commit) = breaking {
            (Some(ReleaseKind::Major), format!("breaking change: {}", commit.subject))
        } else if let Some(commit) = feature {
            (Some(ReleaseKind::Minor), format!("new feature: {}", commit.subject))
        } else if let Some(commit) = fixing {
            (Some(ReleaseKind::Patch), format!("fix: {}", commit.subject))
        } else {
            (None, "no version bump recommended".to_string())
        };

        let version = kind.and_then(|kind| bump(baseline, kind, None).ok());

        Recommendation { kind, version, reason }
    }

    /// Decides the baseline version when the manifest and latest tag
    /// disagree, per the configured policy.
    pub fn reconcile_baseline(
        &self,
        pkg: &Package,
        latest_tag: Option<&str>,
    ) -> PackageResult<Version> {
        let Some(tag_version) = latest_tag.and_then(|tag| version_from_tag(tag, &pkg.name)) else {
            return Ok(pkg.version.clone());
        };

        if tag_version == pkg.version {
            return Ok(pkg.version.clone());
        }

        match self.policy {
            VersionPolicy::PreferManifest => Ok(pkg.version.clone()),
            VersionPolicy::PreferTag => Ok(tag_version),
            VersionPolicy::Error => Err(VersionError::BaselineConflict {
                package: pkg.name.clone(),
                manifest: pkg.version.to_string(),
                tag: tag_version.to_string(),
            }
            .into()),
        }
    }

    /// Computes the next version against what the registry has published.
    ///
    /// When the package has never been published, the current manifest
    /// version is returned unchanged. The engine never lowers a published
    /// version; callers wanting that must use [`VersionEngine::set_exact`].
    pub async fn next_against_registry(
        &self,
        http: &RegistryHttpClient,
        registry: &Registry,
        pkg: &Package,
        kind: ReleaseKind,
        preid: Option<&str>,
    ) -> PackageResult<Version> {
        let published = http.latest_version(registry, &pkg.name).await?;

        let Some(published) = published else {
            return Ok(pkg.version.clone());
        };

        let published = Version::parse(&published).map_err(|e| VersionError::InvalidFormat {
            version: published.clone(),
            reason: e.to_string(),
        })?;

        let next = bump(&published, kind, preid)?;
        if next <= published {
            return Err(VersionError::Downgrade {
                package: pkg.name.clone(),
                published: published.to_string(),
                requested: next.to_string(),
            }
            .into());
        }

        Ok(next)
    }

    /// Applies a list of (manifest path, version) writes, in order.
    ///
    /// Writes are deliberately serial: neighboring manifests may also
    /// receive workspace-specifier rewrites in the same pass.
    pub async fn batch_update(&self, updates: &[(PathBuf, Version)]) -> PackageResult<()> {
        for (path, version) in updates {
            let mut manifest = PackageManifest::read(path).await?;
            manifest.set_version(&version.to_string());
            manifest.write().await?;
            log::debug!("Updated {} to {version}", path.display());
        }
        Ok(())
    }

    /// Rewrites `workspace:` specifiers in every package to the concrete
    /// versions from `new_versions`, writing changed manifests back.
    ///
    /// Returns the names of the packages whose manifests changed.
    pub async fn rewrite_workspace_specs(
        &self,
        packages: &mut [Package],
        new_versions: &BTreeMap<String, Version>,
    ) -> PackageResult<Vec<String>> {
        let mut rewritten = Vec::new();

        for pkg in packages.iter_mut() {
            let mut changed = false;

            for section in DEPENDENCY_SECTIONS {
                for (dep_name, spec) in pkg.manifest.dependencies(section) {
                    let Some(version) = new_versions.get(&dep_name) else { continue };
                    let Some(workspace_spec) = WorkspaceSpec::parse(&spec) else { continue };

                    let concrete = workspace_spec.concrete(version);
                    if pkg.manifest.set_dependency_version(section, &dep_name, &concrete) {
                        changed = true;
                    }
                }
            }

            if changed {
                pkg.manifest.write().await?;
                rewritten.push(pkg.name.clone());
            }
        }

        Ok(rewritten)
    }
}

/// Extracts a version from a tag name.
///
/// Understands `v1.2.3`, bare `1.2.3`, prefixed forms like `release-1.2.3`,
/// and per-package tags of the form `name@1.2.3`.
fn version_from_tag(tag: &str, pkg_name: &str) -> Option<Version> {
    if let Some(rest) = tag.strip_prefix(&format!("{pkg_name}@")) {
        return Version::parse(rest).ok();
    }

    let digits_at = tag.find(|c: char| c.is_ascii_digit())?;
    Version::parse(&tag[digits_at..]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::Path;

    fn package(name: &str, version: &str) -> Package {
        let manifest = PackageManifest::parse(
            Path::new("/work/pkg/package.json"),
            &format!(r#"{{"name": "{name}", "version": "{version}"}}"#),
        )
        .expect("manifest");
        Package::from_manifest(manifest).expect("package")
    }

    fn conventional(kind: CommitType, breaking: bool, subject: &str) -> ConventionalCommit {
        ConventionalCommit {
            hash: "deadbeef".to_string(),
            short_hash: "deadbee".to_string(),
            commit_type: kind,
            scope: None,
            subject: subject.to_string(),
            body: None,
            breaking,
            pr_number: None,
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            date: Utc::now(),
        }
    }

    #[test]
    fn test_recommend_breaking_wins() {
        let engine = VersionEngine::default();
        let commits = vec![
            conventional(CommitType::Feat, false, "add feature"),
            conventional(CommitType::Fix, true, "fix with breaking note"),
        ];

        let rec = engine.recommend_from_commits(&commits, &Version::new(1, 2, 3));
        assert_eq!(rec.kind, Some(ReleaseKind::Major));
        assert_eq!(rec.version, Some(Version::new(2, 0, 0)));
    }

    #[test]
    fn test_recommend_feature_then_fix_then_none() {
        let engine = VersionEngine::default();
        let baseline = Version::new(1, 0, 0);

        let feat = engine.recommend_from_commits(
            &[conventional(CommitType::Feat, false, "x")],
            &baseline,
        );
        assert_eq!(feat.kind, Some(ReleaseKind::Minor));

        let fix = engine.recommend_from_commits(
            &[conventional(CommitType::Refactor, false, "y")],
            &baseline,
        );
        assert_eq!(fix.kind, Some(ReleaseKind::Patch));

        let none = engine.recommend_from_commits(
            &[conventional(CommitType::Chore, false, "z")],
            &baseline,
        );
        assert_eq!(none.kind, None);
        assert_eq!(none.reason, "no version bump recommended");
    }

    #[test]
    fn test_baseline_policies() {
        let pkg = package("a", "1.0.0");

        let manifest_first = VersionEngine::new(VersionPolicy::PreferManifest);
        assert_eq!(
            manifest_first.reconcile_baseline(&pkg, Some("v1.2.0")).expect("ok"),
            Version::new(1, 0, 0)
        );

        let tag_first = VersionEngine::new(VersionPolicy::PreferTag);
        assert_eq!(
            tag_first.reconcile_baseline(&pkg, Some("v1.2.0")).expect("ok"),
            Version::new(1, 2, 0)
        );

        let strict = VersionEngine::new(VersionPolicy::Error);
        assert!(strict.reconcile_baseline(&pkg, Some("v1.2.0")).is_err());

        // Agreement or no tag never consults the policy.
        assert_eq!(
            strict.reconcile_baseline(&pkg, Some("v1.0.0")).expect("ok"),
            Version::new(1, 0, 0)
        );
        assert_eq!(strict.reconcile_baseline(&pkg, None).expect("ok"), Version::new(1, 0, 0));
    }

    #[test]
    fn test_version_from_tag_forms() {
        assert_eq!(version_from_tag("v1.2.3", "a"), Some(Version::new(1, 2, 3)));
        assert_eq!(version_from_tag("1.2.3", "a"), Some(Version::new(1, 2, 3)));
        assert_eq!(version_from_tag("release-2.0.0", "a"), Some(Version::new(2, 0, 0)));
        assert_eq!(version_from_tag("@acme/a@3.1.4", "@acme/a"), Some(Version::new(3, 1, 4)));
        assert_eq!(version_from_tag("not-a-version", "a"), None);
    }

    #[tokio::test]
    async fn test_set_exact_updates_package_and_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("package.json");
        tokio::fs::write(&path, "{\n  \"name\": \"a\",\n  \"version\": \"2.0.0\"\n}\n")
            .await
            .expect("seed");

        let manifest = PackageManifest::read(&path).await.expect("read");
        let mut pkg = Package::from_manifest(manifest).expect("package");

        let engine = VersionEngine::default();
        // Exact sets are allowed to move backwards; only registry-relative
        // bumps refuse to.
        engine.set_exact(&mut pkg, &Version::new(1, 5, 0)).await.expect("set exact");

        assert_eq!(pkg.version, Version::new(1, 5, 0));
        let reread = PackageManifest::read(&path).await.expect("reread");
        assert_eq!(reread.version(), Some("1.5.0"));
    }

    #[tokio::test]
    async fn test_batch_update_writes_each_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        tokio::fs::write(&a, "{\n  \"name\": \"a\",\n  \"version\": \"1.0.0\"\n}\n")
            .await
            .expect("seed a");
        tokio::fs::write(&b, "{\n  \"name\": \"b\",\n  \"version\": \"2.0.0\"\n}\n")
            .await
            .expect("seed b");

        let engine = VersionEngine::default();
        engine
            .batch_update(&[
                (a.clone(), Version::new(1, 0, 1)),
                (b.clone(), Version::new(2, 1, 0)),
            ])
            .await
            .expect("batch update");

        let a_manifest = PackageManifest::read(&a).await.expect("read a");
        let b_manifest = PackageManifest::read(&b).await.expect("read b");
        assert_eq!(a_manifest.version(), Some("1.0.1"));
        assert_eq!(b_manifest.version(), Some("2.1.0"));
    }

    #[tokio::test]
    async fn test_rewrite_workspace_specs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("package.json");
        tokio::fs::write(
            &path,
            r#"{"name": "app", "version": "1.0.0",
                "dependencies": {"core": "workspace:^", "lodash": "^4.0.0"},
                "devDependencies": {"tools": "workspace:*"}}"#,
        )
        .await
        .expect("seed");

        let manifest = PackageManifest::read(&path).await.expect("read");
        let mut packages = vec![Package::from_manifest(manifest).expect("package")];

        let mut versions = BTreeMap::new();
        versions.insert("core".to_string(), Version::new(2, 0, 0));
        versions.insert("tools".to_string(), Version::new(1, 5, 0));

        let engine = VersionEngine::default();
        let rewritten = engine
            .rewrite_workspace_specs(&mut packages, &versions)
            .await
            .expect("rewrite");
        assert_eq!(rewritten, vec!["app".to_string()]);

        let reread = PackageManifest::read(&path).await.expect("reread");
        assert_eq!(
            reread.dependencies("dependencies"),
            vec![
                ("core".to_string(), "^2.0.0".to_string()),
                ("lodash".to_string(), "^4.0.0".to_string())
            ]
        );
        assert_eq!(
            reread.dependencies("devDependencies"),
            vec![("tools".to_string(), "1.5.0".to_string())]
        );
    }
}
