//! Workspace discovery.
//!
//! Walks parent directories looking for a root manifest that declares
//! workspace patterns or a sibling `pnpm-workspace.yaml`, expands the
//! patterns to package manifests, and falls back to single-package mode when
//! no workspace root exists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shipit_pkg_tools::Package;
use shipit_standard_tools::manifest::PackageManifest;

use crate::error::{Result, WorkspaceError};
use crate::workspace::graph::DependencyGraph;
use crate::workspace::Workspace;

/// The workspace protocol family the root declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceKind {
    /// `workspaces` in package.json, npm lockfile
    Npm,
    /// `workspaces` in package.json, yarn lockfile
    Yarn,
    /// `pnpm-workspace.yaml`
    Pnpm,
}

impl WorkspaceKind {
    /// Short name for logs and reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
        }
    }
}

#[derive(Debug, Deserialize)]
struct PnpmWorkspaceFile {
    #[serde(default)]
    packages: Vec<String>,
}

/// Discovers the workspace for a working directory.
#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    cwd: PathBuf,
}

impl WorkspaceResolver {
    /// Creates a resolver rooted at the given working directory.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Discovers the workspace.
    ///
    /// When no ancestor declares workspace patterns, the working directory's
    /// own manifest becomes the sole package (single-package mode).
    ///
    /// # Errors
    ///
    /// Fails with `WorkspaceError::RootNotFound` when neither a workspace
    /// root nor a standalone manifest exists.
    pub async fn initialize(&self) -> Result<Workspace> {
        if let Some((root, patterns, kind)) = self.find_root().await {
            log::debug!(
                "Workspace root {} ({}, {} patterns)",
                root.display(),
                kind.name(),
                patterns.len()
            );

            let mut warnings = Vec::new();
            let packages = expand_packages(&root, &patterns, &mut warnings).await;
            let graph = DependencyGraph::build(&packages);

            return Ok(Workspace { root, patterns, kind, packages, graph, warnings });
        }

        // Single-package fallback.
        let manifest_path = self.cwd.join("package.json");
        if manifest_path.exists() {
            let mut packages = BTreeMap::new();
            let mut warnings = Vec::new();

            match read_package(&manifest_path).await {
                Ok(pkg) => {
                    packages.insert(pkg.name.clone(), pkg);
                }
                Err(reason) => warnings.push(reason),
            }

            let graph = DependencyGraph::build(&packages);
            return Ok(Workspace {
                root: self.cwd.clone(),
                patterns: Vec::new(),
                kind: WorkspaceKind::Npm,
                packages,
                graph,
                warnings,
            });
        }

        Err(WorkspaceError::RootNotFound { cwd: self.cwd.display().to_string() }.into())
    }

    /// Walks ancestors for a workspace declaration.
    async fn find_root(&self) -> Option<(PathBuf, Vec<String>, WorkspaceKind)> {
        for dir in self.cwd.ancestors() {
            let pnpm_file = dir.join("pnpm-workspace.yaml");
            if pnpm_file.exists() {
                if let Ok(content) = tokio::fs::read_to_string(&pnpm_file).await {
                    if let Ok(parsed) = serde_yaml::from_str::<PnpmWorkspaceFile>(&content) {
                        return Some((dir.to_path_buf(), parsed.packages, WorkspaceKind::Pnpm));
                    }
                    log::warn!("Ignoring malformed {}", pnpm_file.display());
                }
            }

            let manifest_path = dir.join("package.json");
            if manifest_path.exists() {
                if let Ok(manifest) = PackageManifest::read(&manifest_path).await {
                    if let Some(patterns) = manifest.workspace_patterns() {
                        let kind = if dir.join("yarn.lock").exists() {
                            WorkspaceKind::Yarn
                        } else {
                            WorkspaceKind::Npm
                        };
                        return Some((dir.to_path_buf(), patterns, kind));
                    }
                }
            }
        }

        None
    }
}

/// Expands workspace glob patterns to parsed packages.
///
/// A missing or malformed manifest downgrades to a warning and the package
/// is omitted.
async fn expand_packages(
    root: &Path,
    patterns: &[String],
    warnings: &mut Vec<String>,
) -> BTreeMap<String, Package> {
    let mut packages = BTreeMap::new();

    for pattern in patterns {
        // Negated patterns are exclusion hints; the node_modules exclusion
        // below already covers the common case.
        if pattern.starts_with('!') {
            continue;
        }

        let glob_pattern = root.join(pattern).join("package.json");
        let glob_pattern = glob_pattern.to_string_lossy().to_string();

        let entries = match glob::glob(&glob_pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warnings.push(format!("Invalid workspace pattern '{pattern}': {e}"));
                continue;
            }
        };

        for entry in entries.flatten() {
            if entry.components().any(|c| c.as_os_str() == "node_modules") {
                continue;
            }

            match read_package(&entry).await {
                Ok(pkg) => {
                    packages.insert(pkg.name.clone(), pkg);
                }
                Err(reason) => {
                    log::warn!("{reason}");
                    warnings.push(reason);
                }
            }
        }
    }

    packages
}

async fn read_package(manifest_path: &Path) -> std::result::Result<Package, String> {
    let manifest = PackageManifest::read(manifest_path)
        .await
        .map_err(|e| format!("Skipping {}: {e}", manifest_path.display()))?;
    Package::from_manifest(manifest)
        .map_err(|e| format!("Skipping {}: {e}", manifest_path.display()))
}
