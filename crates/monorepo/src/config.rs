//! Configuration model for the publish orchestrator.
//!
//! Mirrors the `shipit.config.json` file the CLI boundary loads. Every field
//! has a default so a zero-config run works on a conventional repository.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use shipit_pkg_tools::registry::{Registry, RegistryAccess, RegistryManager};
use shipit_pkg_tools::retry::RetryPolicy;
use shipit_pkg_tools::version::VersionPolicy;

use crate::hooks::HooksConfig;

/// Whether packages share one version or each carries its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionStrategy {
    /// Each package versions on its own (default)
    #[default]
    Independent,
    /// One shared version for every selected package
    Fixed,
}

/// How the publish phase orders work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishOrder {
    /// Dependency order, parallel where the graph allows (default)
    #[default]
    Topological,
    /// Strictly one package at a time
    Serial,
}

/// Version-control behavior of the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitConfig {
    /// Create a release commit after publishing
    pub create_commit: bool,
    /// Push the release commit
    pub push_commit: bool,
    /// Create release tag(s)
    pub create_tag: bool,
    /// Push release tag(s)
    pub push_tag: bool,
    /// Sign commits (recorded; unsigned fallback)
    pub sign_commits: bool,
    /// Sign tags (recorded; unsigned fallback)
    pub sign_tags: bool,
    /// Prefix for fixed-strategy tags
    pub tag_prefix: String,
    /// Release commit message; `{version}` expands to the released versions
    pub commit_message: String,
    /// Remote used for pushes
    pub remote: String,
    /// Branches publishing is allowed from; empty allows every branch
    pub allowed_branches: Vec<String>,
    /// Refuse to publish from a dirty tree
    pub require_clean: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            create_commit: true,
            push_commit: false,
            create_tag: true,
            push_tag: false,
            sign_commits: false,
            sign_tags: false,
            tag_prefix: "v".to_string(),
            commit_message: "chore(release): publish {version}".to_string(),
            remote: "origin".to_string(),
            allowed_branches: Vec::new(),
            require_clean: true,
        }
    }
}

/// Publish-phase behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublishConfig {
    /// Dist-tag to publish under
    pub tag: Option<String>,
    /// Access level for publishes
    pub access: RegistryAccess,
    /// One-time password passthrough
    pub otp: Option<String>,
    /// Allow graph-compatible packages to publish concurrently
    pub parallel: bool,
    /// Worker-pool bound for parallel phases
    pub concurrency: usize,
    /// Report without performing external effects
    pub dry_run: bool,
    /// Stop scheduling after the first publish failure
    pub abort_on_failure: bool,
    /// Skip the BUILD phase
    pub skip_build: bool,
    /// Skip the VCS validator
    pub skip_git_check: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            tag: None,
            access: RegistryAccess::Public,
            otp: None,
            parallel: false,
            concurrency: 4,
            dry_run: false,
            abort_on_failure: false,
            skip_build: false,
            skip_git_check: false,
        }
    }
}

/// Workspace selection and strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonorepoConfig {
    /// Versioning strategy
    pub strategy: VersionStrategy,
    /// Publish ordering mode
    pub publish_order: PublishOrder,
    /// Package selectors (literal names or shell globs); empty selects all
    pub filter: Vec<String>,
    /// Rewrite `workspace:` specifiers to concrete versions before publish
    pub rewrite_workspace_protocol: bool,
}

impl Default for MonorepoConfig {
    fn default() -> Self {
        Self {
            strategy: VersionStrategy::Independent,
            publish_order: PublishOrder::Topological,
            filter: Vec::new(),
            rewrite_workspace_protocol: true,
        }
    }
}

/// Changelog-phase behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangelogConfig {
    /// Generate changelogs during the pipeline
    pub enabled: bool,
    /// Changelog filename inside each package directory
    pub file: String,
    /// Keep commits that do not follow the conventional grammar
    pub include_all_commits: bool,
    /// Replace an existing entry for the same version
    pub regenerate: bool,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: "CHANGELOG.md".to_string(),
            include_all_commits: false,
            regenerate: false,
        }
    }
}

/// Preflight validation behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    /// Treat a build failure as fatal for the whole pipeline
    pub require_build: bool,
    /// Files every package must carry (e.g. README.md)
    pub required_files: Vec<String>,
    /// Warn when the packed tarball exceeds this many bytes
    pub max_package_size: u64,
    /// Globs for files that must not be published
    pub sensitive_files: Vec<String>,
    /// Regexes for content that must not be published
    pub sensitive_patterns: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_build: false,
            required_files: Vec::new(),
            max_package_size: 10 * 1024 * 1024,
            sensitive_files: vec![
                "**/.env".to_string(),
                "**/.env.*".to_string(),
                "**/*.pem".to_string(),
                "**/*.key".to_string(),
                "**/id_rsa*".to_string(),
                "**/.npmrc".to_string(),
            ],
            sensitive_patterns: vec![
                r#"(?i)(api[_-]?key|secret|token|password)\s*[:=]\s*['"][^'"]{8,}['"]"#
                    .to_string(),
            ],
        }
    }
}

/// Cache tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Default entry TTL in seconds
    pub ttl_secs: u64,
    /// Maximum entries before LRU eviction
    pub max_size: usize,
    /// Seconds between expired-entry sweeps
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 300, max_size: 1000, sweep_interval_secs: 60 }
    }
}

/// Retry tuning for transient registry failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// Maximum attempts, including the first
    pub attempts: u32,
    /// Delay before the second attempt, milliseconds
    pub base_delay_ms: u64,
    /// Ceiling on any delay, milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { attempts: 3, base_delay_ms: 1000, max_delay_ms: 30_000 }
    }
}

impl RetrySettings {
    /// The equivalent retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            factor: 2.0,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Root configuration object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipitConfig {
    /// Named registries; empty keeps the built-in default
    pub registries: BTreeMap<String, Registry>,
    /// Name of the default registry
    pub default_registry: Option<String>,
    /// Version-control behavior
    pub git: GitConfig,
    /// Publish-phase behavior
    pub publish: PublishConfig,
    /// Workspace selection and strategy
    pub monorepo: MonorepoConfig,
    /// Changelog behavior
    pub changelog: ChangelogConfig,
    /// Validation behavior
    pub validation: ValidationConfig,
    /// Lifecycle hooks
    pub hooks: HooksConfig,
    /// Cache tuning
    pub cache: CacheSettings,
    /// Retry tuning
    pub retry: RetrySettings,
    /// Tag-vs-manifest reconciliation policy
    pub version_policy: VersionPolicy,
    /// Command run for packages that declare a build script
    pub build_command: String,
}

impl Default for ShipitConfig {
    fn default() -> Self {
        Self {
            registries: BTreeMap::new(),
            default_registry: None,
            git: GitConfig::default(),
            publish: PublishConfig::default(),
            monorepo: MonorepoConfig::default(),
            changelog: ChangelogConfig::default(),
            validation: ValidationConfig::default(),
            hooks: HooksConfig::default(),
            cache: CacheSettings::default(),
            retry: RetrySettings::default(),
            version_policy: VersionPolicy::default(),
            build_command: Self::DEFAULT_BUILD_COMMAND.to_string(),
        }
    }
}

impl ShipitConfig {
    /// Builds the registry manager for this configuration.
    ///
    /// Starts from the built-in public default, layers the configured
    /// registries on top, applies the configured default name and the
    /// `NPM_TOKEN` fallback.
    pub fn registry_manager(&self) -> crate::error::Result<RegistryManager> {
        let mut manager = RegistryManager::new();
        for (name, registry) in &self.registries {
            manager.add(name.clone(), registry.clone());
        }
        if let Some(default) = &self.default_registry {
            manager.set_default(default).map_err(shipit_pkg_tools::PkgError::from)?;
        }
        manager.apply_env_token();
        Ok(manager)
    }

    /// The effective worker-pool size for a phase.
    ///
    /// Parallelism off (or serial publish order) forces a pool of one.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        if self.publish.parallel && self.monorepo.publish_order == PublishOrder::Topological {
            self.publish.concurrency.max(1)
        } else {
            1
        }
    }
}

impl ShipitConfig {
    /// Default build command for packages that declare a `build` script.
    pub const DEFAULT_BUILD_COMMAND: &'static str = "npm run build";
}
