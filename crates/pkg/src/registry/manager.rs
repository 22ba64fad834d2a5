//! Registry manager for coordinating multiple registries
//!
//! Holds the named registry records, selects the registry for a package by
//! scope, and maintains tokens in the per-user credentials file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{PackageResult, RegistryError};
use crate::npm::NpmClient;
use crate::registry::types::Registry;

/// Environment variable consulted for the default registry's token.
pub const NPM_TOKEN_ENV: &str = "NPM_TOKEN";

/// Registry manager to handle multiple registries.
///
/// Manages the named registry map and the designated default, routes
/// packages to registries by scope, and reads/writes `_authToken` lines in
/// the user's `.npmrc`.
#[derive(Debug, Clone)]
pub struct RegistryManager {
    registries: BTreeMap<String, Registry>,
    default_name: String,
}

impl Default for RegistryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryManager {
    /// Creates a manager pre-populated with the public npm registry as the
    /// default.
    #[must_use]
    pub fn new() -> Self {
        let mut registries = BTreeMap::new();
        registries.insert(
            "npm".to_string(),
            Registry::new("https://registry.npmjs.org"),
        );

        Self { registries, default_name: "npm".to_string() }
    }

    /// Adds (or replaces) a named registry.
    pub fn add(&mut self, name: impl Into<String>, registry: Registry) -> &mut Self {
        self.registries.insert(name.into(), registry);
        self
    }

    /// Gets a registry by name, or the default when `name` is `None`.
    pub fn get(&self, name: Option<&str>) -> PackageResult<&Registry> {
        let name = name.unwrap_or(&self.default_name);
        self.registries
            .get(name)
            .ok_or_else(|| RegistryError::UnknownRegistry { name: name.to_string() }.into())
    }

    /// All registries, as (name, record) pairs in name order.
    #[must_use]
    pub fn list(&self) -> Vec<(&str, &Registry)> {
        self.registries.iter().map(|(name, registry)| (name.as_str(), registry)).collect()
    }

    /// Name of the default registry.
    #[must_use]
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Sets the default registry.
    pub fn set_default(&mut self, name: &str) -> PackageResult<()> {
        if !self.registries.contains_key(name) {
            return Err(RegistryError::UnknownRegistry { name: name.to_string() }.into());
        }
        self.default_name = name.to_string();
        Ok(())
    }

    /// Selects the registry for a package.
    ///
    /// A registry that claims the package's scope wins; unscoped packages
    /// and unclaimed scopes fall back to the default.
    #[must_use]
    pub fn select_for_package(&self, package_name: &str) -> &Registry {
        if let Some(scope) = package_name.strip_prefix('@').and_then(|rest| rest.split('/').next())
        {
            for registry in self.registries.values() {
                if registry.claims_scope(scope) {
                    return registry;
                }
            }
        }

        // The default is kept present by construction.
        &self.registries[&self.default_name]
    }

    /// Fills the default registry's token from `NPM_TOKEN` when unset.
    pub fn apply_env_token(&mut self) {
        if let Ok(token) = std::env::var(NPM_TOKEN_ENV) {
            if token.is_empty() {
                return;
            }
            if let Some(default) = self.registries.get_mut(&self.default_name) {
                if default.token.is_none() {
                    log::debug!("Using {NPM_TOKEN_ENV} for the default registry");
                    default.token = Some(token);
                }
            }
        }
    }

    /// Default location of the per-user credentials file.
    #[must_use]
    pub fn default_credentials_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".npmrc"))
    }

    /// Loads `_authToken` lines from the credentials file into matching
    /// registries.
    ///
    /// Lines take the exact form `//<host>/:_authToken=<token>`. A missing
    /// file is not an error.
    pub async fn load_tokens(&mut self, path: Option<&Path>) -> PackageResult<()> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_credentials_path)
        else {
            return Ok(());
        };

        if !path.exists() {
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&path).await.map_err(|source| {
            RegistryError::CredentialsIo { path: path.display().to_string(), source }
        })?;

        for line in content.lines() {
            let Some((host, token)) = parse_token_line(line) else { continue };
            for registry in self.registries.values_mut() {
                if registry.host() == host {
                    registry.token = Some(token.to_string());
                }
            }
        }

        Ok(())
    }

    /// Saves a token for the named registry, rewriting just its line in the
    /// credentials file.
    pub async fn save_token(
        &mut self,
        name: Option<&str>,
        token: &str,
        path: Option<&Path>,
    ) -> PackageResult<()> {
        let host = self.get(name)?.host();
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_credentials_path)
        else {
            return Ok(());
        };

        let mut lines: Vec<String> = if path.exists() {
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| RegistryError::CredentialsIo {
                    path: path.display().to_string(),
                    source,
                })?
                .lines()
                .map(ToString::to_string)
                .collect()
        } else {
            Vec::new()
        };

        let new_line = format!("//{host}/:_authToken={token}");
        let mut replaced = false;
        for line in &mut lines {
            if parse_token_line(line).is_some_and(|(line_host, _)| line_host == host) {
                *line = new_line.clone();
                replaced = true;
            }
        }
        if !replaced {
            lines.push(new_line);
        }

        let mut content = lines.join("\n");
        content.push('\n');
        tokio::fs::write(&path, content).await.map_err(|source| {
            RegistryError::CredentialsIo { path: path.display().to_string(), source }
        })?;

        let resolved_name = name.unwrap_or(&self.default_name).to_string();
        if let Some(registry) = self.registries.get_mut(&resolved_name) {
            registry.token = Some(token.to_string());
        }

        Ok(())
    }

    /// Removes the named registry's token line from the credentials file.
    pub async fn remove_token(
        &mut self,
        name: Option<&str>,
        path: Option<&Path>,
    ) -> PackageResult<()> {
        let host = self.get(name)?.host();
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_credentials_path)
        else {
            return Ok(());
        };

        if !path.exists() {
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&path).await.map_err(|source| {
            RegistryError::CredentialsIo { path: path.display().to_string(), source }
        })?;

        let kept: Vec<&str> = content
            .lines()
            .filter(|line| {
                parse_token_line(line).is_none_or(|(line_host, _)| line_host != host)
            })
            .collect();

        let mut rewritten = kept.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        tokio::fs::write(&path, rewritten).await.map_err(|source| {
            RegistryError::CredentialsIo { path: path.display().to_string(), source }
        })?;

        let resolved_name = name.unwrap_or(&self.default_name).to_string();
        if let Some(registry) = self.registries.get_mut(&resolved_name) {
            registry.token = None;
        }

        Ok(())
    }

    /// Verifies the named registry answers a read-only who-am-I call.
    ///
    /// Returns the authenticated username.
    pub async fn validate_connection(
        &self,
        name: Option<&str>,
        npm: &dyn NpmClient,
    ) -> PackageResult<String> {
        let registry = self.get(name)?;
        let username = npm.whoami(Some(&registry.url)).await?;
        username.ok_or_else(|| {
            RegistryError::AuthFailed {
                registry: registry.url.clone(),
                reason: "not authenticated".to_string(),
            }
            .into()
        })
    }
}

/// Parses a credentials-file line of the form `//<host>/:_authToken=<token>`.
fn parse_token_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let rest = line.strip_prefix("//")?;
    let (host, token_part) = rest.split_once("/:_authToken=")?;
    if host.is_empty() || token_part.is_empty() {
        return None;
    }
    Some((host, token_part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped_registry(scope: &str, url: &str) -> Registry {
        let mut registry = Registry::new(url);
        registry.scopes = vec![scope.to_string()];
        registry
    }

    #[test]
    fn test_selection_prefers_scope_claims() {
        let mut manager = RegistryManager::new();
        manager.add("internal", scoped_registry("acme", "https://npm.acme.dev"));

        assert_eq!(manager.select_for_package("@acme/core").url, "https://npm.acme.dev");
        assert_eq!(manager.select_for_package("lodash").url, "https://registry.npmjs.org");
        assert_eq!(manager.select_for_package("@other/pkg").url, "https://registry.npmjs.org");
    }

    #[test]
    fn test_set_default_requires_known_name() {
        let mut manager = RegistryManager::new();
        assert!(manager.set_default("nope").is_err());

        manager.add("mirror", Registry::new("https://mirror.example.com"));
        manager.set_default("mirror").expect("known registry");
        assert_eq!(manager.get(None).expect("default").url, "https://mirror.example.com");
    }

    #[test]
    fn test_parse_token_line_shape() {
        assert_eq!(
            parse_token_line("//registry.npmjs.org/:_authToken=abc123"),
            Some(("registry.npmjs.org", "abc123"))
        );
        assert_eq!(parse_token_line("registry=https://registry.npmjs.org"), None);
        assert_eq!(parse_token_line("# comment"), None);
    }

    #[tokio::test]
    async fn test_token_round_trip_through_credentials_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let npmrc = dir.path().join(".npmrc");
        tokio::fs::write(&npmrc, "registry=https://registry.npmjs.org\n")
            .await
            .expect("seed npmrc");

        let mut manager = RegistryManager::new();
        manager
            .save_token(None, "s3cret", Some(&npmrc))
            .await
            .expect("save token");

        let content = tokio::fs::read_to_string(&npmrc).await.expect("read");
        assert!(content.contains("//registry.npmjs.org/:_authToken=s3cret"));
        // Unrelated lines stay put.
        assert!(content.contains("registry=https://registry.npmjs.org"));

        let mut fresh = RegistryManager::new();
        fresh.load_tokens(Some(&npmrc)).await.expect("load tokens");
        assert_eq!(fresh.get(None).expect("default").token.as_deref(), Some("s3cret"));

        fresh.remove_token(None, Some(&npmrc)).await.expect("remove token");
        let content = tokio::fs::read_to_string(&npmrc).await.expect("read");
        assert!(!content.contains("_authToken"));
        assert!(content.contains("registry=https://registry.npmjs.org"));
    }

    #[tokio::test]
    async fn test_save_token_rewrites_existing_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let npmrc = dir.path().join(".npmrc");
        tokio::fs::write(&npmrc, "//registry.npmjs.org/:_authToken=old\n")
            .await
            .expect("seed npmrc");

        let mut manager = RegistryManager::new();
        manager.save_token(None, "new", Some(&npmrc)).await.expect("save");

        let content = tokio::fs::read_to_string(&npmrc).await.expect("read");
        assert_eq!(content.matches("_authToken").count(), 1);
        assert!(content.contains("=new"));
    }
}
