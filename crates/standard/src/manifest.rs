//! Reading and writing `package.json` manifests.
//!
//! Manifests are kept as raw JSON maps so unknown fields survive a
//! read-modify-write cycle verbatim and in their original order. Writes use
//! two-space indentation with a trailing newline, matching what package
//! managers emit.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{ManifestError, Result};

/// Dependency sections of a manifest.
pub const DEPENDENCY_SECTIONS: [&str; 3] = ["dependencies", "devDependencies", "peerDependencies"];

/// A parsed `package.json` with all fields preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    /// Absolute path this manifest was read from
    pub path: PathBuf,
    /// Raw manifest fields, in file order
    pub fields: Map<String, Value>,
}

impl PackageManifest {
    /// Parses manifest content read from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Malformed` when the content is not a JSON
    /// object or misses the `name` field.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ManifestError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let Value::Object(fields) = value else {
            return Err(ManifestError::Malformed {
                path: path.to_path_buf(),
                reason: "manifest root is not an object".to_string(),
            }
            .into());
        };

        let manifest = Self { path: path.to_path_buf(), fields };

        if manifest.name().is_none() {
            return Err(ManifestError::Malformed {
                path: path.to_path_buf(),
                reason: "missing required field 'name'".to_string(),
            }
            .into());
        }

        Ok(manifest)
    }

    /// Reads and parses the manifest at `path`.
    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            ManifestError::Unreadable { path: path.to_path_buf(), source }
        })?;
        Self::parse(path, &content)
    }

    /// Writes the manifest back to its path with two-space indentation and a
    /// trailing newline.
    pub async fn write(&self) -> Result<()> {
        let rendered = self.render();
        tokio::fs::write(&self.path, rendered).await.map_err(|source| {
            ManifestError::Unwritable { path: self.path.clone(), source }
        })?;
        Ok(())
    }

    /// Renders the manifest to its on-disk representation.
    #[must_use]
    pub fn render(&self) -> String {
        let mut rendered = serde_json::to_string_pretty(&Value::Object(self.fields.clone()))
            .unwrap_or_else(|_| "{}".to_string());
        rendered.push('\n');
        rendered
    }

    /// The package name, when present and a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// The package version, when present and a string.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// Replaces the `version` field.
    pub fn set_version(&mut self, version: &str) {
        self.fields.insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Whether the manifest is marked private.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.fields.get("private").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Entries of one dependency section, as (name, specifier) pairs.
    #[must_use]
    pub fn dependencies(&self, section: &str) -> Vec<(String, String)> {
        self.fields
            .get(section)
            .and_then(Value::as_object)
            .map(|deps| {
                deps.iter()
                    .filter_map(|(name, spec)| {
                        spec.as_str().map(|s| (name.clone(), s.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rewrites the specifier of `name` inside `section`, when present.
    ///
    /// Returns whether a rewrite happened.
    pub fn set_dependency_version(&mut self, section: &str, name: &str, spec: &str) -> bool {
        if let Some(Value::Object(deps)) = self.fields.get_mut(section) {
            if deps.contains_key(name) {
                deps.insert(name.to_string(), Value::String(spec.to_string()));
                return true;
            }
        }
        false
    }

    /// Whether the manifest declares a script with the given name.
    #[must_use]
    pub fn has_script(&self, name: &str) -> bool {
        self.fields
            .get("scripts")
            .and_then(Value::as_object)
            .is_some_and(|scripts| scripts.contains_key(name))
    }

    /// Declared workspace patterns: either `workspaces` as an array or
    /// `workspaces.packages`.
    #[must_use]
    pub fn workspace_patterns(&self) -> Option<Vec<String>> {
        let workspaces = self.fields.get("workspaces")?;

        let array = match workspaces {
            Value::Array(items) => items,
            Value::Object(map) => map.get("packages").and_then(Value::as_array)?,
            _ => return None,
        };

        Some(array.iter().filter_map(Value::as_str).map(ToString::to_string).collect())
    }
}
