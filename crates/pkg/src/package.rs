//! The package model shared by the resolver, the version engine and the
//! publish pipeline.

use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use shipit_standard_tools::manifest::{PackageManifest, DEPENDENCY_SECTIONS};

use crate::error::{PackageResult, PkgError, VersionError};

/// A publishable package discovered in the working tree.
///
/// The manifest keeps every declared field; the struct lifts out the handful
/// the orchestrator needs constantly. The version field is only mutated by
/// the version engine, and dependency specifiers only by the workspace
/// rewrite step, both of which run before any parallel phase.
#[derive(Debug, Clone)]
pub struct Package {
    /// Registry-valid package name
    pub name: String,
    /// Current version
    pub version: Version,
    /// Absolute package directory
    pub dir: PathBuf,
    /// Whether the manifest is marked private
    pub private: bool,
    /// The full manifest
    pub manifest: PackageManifest,
}

impl Package {
    /// Builds a package from a parsed manifest.
    ///
    /// # Errors
    ///
    /// Fails when the name violates registry naming rules or the version is
    /// not a valid semver.
    pub fn from_manifest(manifest: PackageManifest) -> PackageResult<Self> {
        let name = manifest
            .name()
            .ok_or_else(|| PkgError::InvalidPackageName {
                name: String::new(),
                reason: "missing name field".to_string(),
            })?
            .to_string();

        validate_package_name(&name)?;

        let raw_version = manifest.version().unwrap_or("0.0.0");
        let version = Version::parse(raw_version).map_err(|e| VersionError::InvalidFormat {
            version: raw_version.to_string(),
            reason: e.to_string(),
        })?;

        let dir = manifest
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let private = manifest.is_private();

        Ok(Self { name, version, dir, private, manifest })
    }

    /// The scope portion of a scoped name (`@scope/name` ⇒ `scope`).
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.name.strip_prefix('@').and_then(|rest| rest.split('/').next())
    }

    /// All declared dependency names across runtime, dev and peer sections.
    #[must_use]
    pub fn declared_dependencies(&self) -> Vec<(String, String)> {
        let mut all = Vec::new();
        for section in DEPENDENCY_SECTIONS {
            all.extend(self.manifest.dependencies(section));
        }
        all
    }

    /// Whether the manifest declares a script with the given name.
    #[must_use]
    pub fn has_script(&self, name: &str) -> bool {
        self.manifest.has_script(name)
    }

    /// Path of this package's manifest file.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join("package.json")
    }
}

/// Validates a name against registry naming rules.
///
/// Names must be lowercase, at most 214 characters, must not start with a
/// dot or underscore, and may only contain URL-safe characters. Scoped names
/// take the form `@scope/name` with the same rules on both halves.
pub fn validate_package_name(name: &str) -> PackageResult<()> {
    fn invalid(name: &str, reason: &str) -> PkgError {
        PkgError::InvalidPackageName { name: name.to_string(), reason: reason.to_string() }
    }

    if name.is_empty() {
        return Err(invalid(name, "name is empty"));
    }
    if name.len() > 214 {
        return Err(invalid(name, "name exceeds 214 characters"));
    }
    if name != name.to_lowercase() {
        return Err(invalid(name, "name must be lowercase"));
    }

    let bare = if let Some(rest) = name.strip_prefix('@') {
        let mut parts = rest.splitn(2, '/');
        let scope = parts.next().unwrap_or("");
        let Some(inner) = parts.next() else {
            return Err(invalid(name, "scoped name is missing the '/name' part"));
        };
        if scope.is_empty() {
            return Err(invalid(name, "scope is empty"));
        }
        if !scope.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-._".contains(c))
        {
            return Err(invalid(name, "scope contains invalid characters"));
        }
        inner
    } else {
        name
    };

    if bare.is_empty() {
        return Err(invalid(name, "name part is empty"));
    }
    if bare.starts_with('.') || bare.starts_with('_') {
        return Err(invalid(name, "name must not start with '.' or '_'"));
    }
    if !bare.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-._~".contains(c)) {
        return Err(invalid(name, "name contains invalid characters"));
    }

    Ok(())
}

/// A `workspace:` protocol dependency specifier.
///
/// These mark intra-workspace links and are rewritten to concrete versions
/// before publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceSpec {
    /// `workspace:*`, the workspace version pinned exactly
    Any,
    /// `workspace:^`, the workspace version as a caret range
    Caret,
    /// `workspace:~`, the workspace version as a tilde range
    Tilde,
    /// `workspace:<range>`, an explicit range
    Range(String),
}

impl WorkspaceSpec {
    /// Parses a specifier, returning `None` when it does not use the
    /// workspace protocol.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let rest = spec.strip_prefix("workspace:")?;
        Some(match rest {
            "*" => Self::Any,
            "^" => Self::Caret,
            "~" => Self::Tilde,
            range => Self::Range(range.to_string()),
        })
    }

    /// The concrete specifier to publish for a given workspace version.
    #[must_use]
    pub fn concrete(&self, version: &Version) -> String {
        match self {
            Self::Any => version.to_string(),
            Self::Caret => format!("^{version}"),
            Self::Tilde => format!("~{version}"),
            Self::Range(range) => range.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> PackageManifest {
        PackageManifest::parse(Path::new("/work/pkg/package.json"), json).expect("manifest")
    }

    #[test]
    fn test_from_manifest_extracts_fields() {
        let pkg = Package::from_manifest(manifest(
            r#"{"name": "@acme/core", "version": "1.2.3", "private": true,
                "dependencies": {"left-pad": "^1.0.0"}}"#,
        ))
        .expect("package");

        assert_eq!(pkg.name, "@acme/core");
        assert_eq!(pkg.version, Version::new(1, 2, 3));
        assert!(pkg.private);
        assert_eq!(pkg.scope(), Some("acme"));
        assert_eq!(pkg.dir, PathBuf::from("/work/pkg"));
        assert_eq!(
            pkg.declared_dependencies(),
            vec![("left-pad".to_string(), "^1.0.0".to_string())]
        );
    }

    #[test]
    fn test_invalid_version_is_rejected() {
        let result = Package::from_manifest(manifest(r#"{"name": "a", "version": "not-semver"}"#));
        assert!(matches!(result, Err(PkgError::Version(_))));
    }

    #[test]
    fn test_package_name_rules() {
        assert!(validate_package_name("lodash").is_ok());
        assert!(validate_package_name("@scope/pkg-name").is_ok());
        assert!(validate_package_name("with.dots_and-dashes").is_ok());

        assert!(validate_package_name("").is_err());
        assert!(validate_package_name("UpperCase").is_err());
        assert!(validate_package_name(".hidden").is_err());
        assert!(validate_package_name("_private").is_err());
        assert!(validate_package_name("@scope").is_err());
        assert!(validate_package_name("has space").is_err());
        assert!(validate_package_name(&"x".repeat(215)).is_err());
    }

    #[test]
    fn test_workspace_spec_parsing_and_concretization() {
        let version = Version::new(2, 1, 0);

        assert_eq!(WorkspaceSpec::parse("^1.0.0"), None);
        assert_eq!(
            WorkspaceSpec::parse("workspace:*").map(|s| s.concrete(&version)),
            Some("2.1.0".to_string())
        );
        assert_eq!(
            WorkspaceSpec::parse("workspace:^").map(|s| s.concrete(&version)),
            Some("^2.1.0".to_string())
        );
        assert_eq!(
            WorkspaceSpec::parse("workspace:~").map(|s| s.concrete(&version)),
            Some("~2.1.0".to_string())
        );
        assert_eq!(
            WorkspaceSpec::parse("workspace:>=1.0.0").map(|s| s.concrete(&version)),
            Some(">=1.0.0".to_string())
        );
    }
}
