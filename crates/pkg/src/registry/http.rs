//! Read-only registry metadata client.
//!
//! Publishing goes through the package-manager CLI; version and existence
//! queries go straight to the registry's JSON API with responses cached in
//! the shared cache.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use shipit_standard_tools::cache::Cache;

use crate::error::{PackageResult, RegistryError};
use crate::registry::types::Registry;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// HTTP client for registry metadata reads.
#[derive(Debug, Clone)]
pub struct RegistryHttpClient {
    client: reqwest::Client,
    cache: Option<Arc<Cache<Value>>>,
}

impl RegistryHttpClient {
    /// Creates a client with the default timeout.
    pub fn new(cache: Option<Arc<Cache<Value>>>) -> PackageResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS), cache)
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(
        timeout: Duration,
        cache: Option<Arc<Cache<Value>>>,
    ) -> PackageResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            RegistryError::RequestFailed {
                registry: String::new(),
                reason: e.to_string(),
                transient: false,
            }
        })?;

        Ok(Self { client, cache })
    }

    /// Fetches the full metadata document for a package.
    ///
    /// Returns `None` when the registry does not know the package.
    pub async fn package_metadata(
        &self,
        registry: &Registry,
        name: &str,
    ) -> PackageResult<Option<Value>> {
        let url = metadata_url(registry, name);
        let cache_key = format!("registry:{url}");

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&cache_key) {
                return Ok(Some(hit));
            }
        }

        let mut request = self.client.get(&url);
        if let Some(token) = &registry.token {
            request = request.bearer_auth(token);
        }
        for (key, value) in &registry.headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| RegistryError::RequestFailed {
            registry: registry.url.clone(),
            reason: e.to_string(),
            transient: e.is_timeout() || e.is_connect(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(RegistryError::AuthFailed {
                registry: registry.url.clone(),
                reason: format!("metadata request returned {status}"),
            }
            .into());
        }
        if !status.is_success() {
            let transient = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status.is_server_error();
            return Err(RegistryError::RequestFailed {
                registry: registry.url.clone(),
                reason: format!("metadata request returned {status}"),
                transient,
            }
            .into());
        }

        let body: Value = response.json().await.map_err(|e| RegistryError::RequestFailed {
            registry: registry.url.clone(),
            reason: format!("invalid JSON: {e}"),
            transient: false,
        })?;

        if let Some(cache) = &self.cache {
            cache.set(cache_key, body.clone(), None);
        }

        Ok(Some(body))
    }

    /// Latest published version of a package, when it exists.
    pub async fn latest_version(
        &self,
        registry: &Registry,
        name: &str,
    ) -> PackageResult<Option<String>> {
        let metadata = self.package_metadata(registry, name).await?;
        Ok(metadata
            .as_ref()
            .and_then(|doc| doc.pointer("/dist-tags/latest"))
            .and_then(Value::as_str)
            .map(ToString::to_string))
    }

    /// All published versions of a package, in document order.
    pub async fn all_versions(
        &self,
        registry: &Registry,
        name: &str,
    ) -> PackageResult<Vec<String>> {
        let metadata = self.package_metadata(registry, name).await?;
        Ok(metadata
            .as_ref()
            .and_then(|doc| doc.get("versions"))
            .and_then(Value::as_object)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Whether the registry knows the package at all.
    pub async fn package_exists(&self, registry: &Registry, name: &str) -> PackageResult<bool> {
        Ok(self.package_metadata(registry, name).await?.is_some())
    }

    /// Whether a specific version has been published.
    pub async fn version_exists(
        &self,
        registry: &Registry,
        name: &str,
        version: &str,
    ) -> PackageResult<bool> {
        let metadata = self.package_metadata(registry, name).await?;
        Ok(metadata
            .as_ref()
            .and_then(|doc| doc.pointer(&format!("/versions/{version}")))
            .is_some())
    }
}

/// Builds the metadata URL for a package; scoped names keep the `@` but
/// encode the slash.
fn metadata_url(registry: &Registry, name: &str) -> String {
    let encoded = name.replace('/', "%2F");
    format!("{}/{}", registry.url.trim_end_matches('/'), encoded)
}
