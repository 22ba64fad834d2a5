use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Access level requested when publishing to a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistryAccess {
    /// Anyone can install the package
    #[default]
    Public,
    /// Install is limited to authorized users
    Restricted,
}

impl RegistryAccess {
    /// The value the package manager CLI expects.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Restricted => "restricted",
        }
    }
}

/// A package registry the orchestrator can publish to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    /// Registry base URL
    pub url: String,
    /// Auth token, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Access level for publishes
    #[serde(default)]
    pub access: RegistryAccess,
    /// Package-name scopes this registry claims (without the `@`)
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Registry {
    /// Creates a registry with defaults for everything but the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            access: RegistryAccess::default(),
            scopes: Vec::new(),
            headers: HashMap::new(),
            timeout_secs: None,
        }
    }

    /// The host part used in credentials-file lines: URL without scheme,
    /// without a trailing slash.
    #[must_use]
    pub fn host(&self) -> String {
        let stripped = self
            .url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        stripped.to_string()
    }

    /// Whether this registry claims the given package scope.
    ///
    /// A claim matches when the declared scope is a prefix of the package's
    /// scope, both compared without the `@`.
    #[must_use]
    pub fn claims_scope(&self, scope: &str) -> bool {
        let scope = scope.trim_start_matches('@');
        self.scopes.iter().any(|claimed| scope.starts_with(claimed.trim_start_matches('@')))
    }
}
