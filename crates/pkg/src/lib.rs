//! Package, version, changelog and registry toolkit for the shipit publish
//! orchestrator.
//!
//! The crate covers the package-shaped half of a release:
//!
//! - [`package`]: the package model and `workspace:` protocol specifiers
//! - [`version`]: semver bumps, recommendations from commit history,
//!   manifest updates
//! - [`conventional`]: Conventional Commits parsing
//! - [`changelog`]: grouping, rendering and writing changelogs
//! - [`registry`]: registry records, selection and credentials
//! - [`npm`]: the package-manager client surface
//! - [`retry`]: backoff for transient registry failures

pub mod changelog;
pub mod conventional;
pub mod error;
pub mod npm;
pub mod package;
pub mod registry;
pub mod retry;
pub mod version;

pub use changelog::{
    ChangelogContent, ChangelogFormatter, ChangelogGenerator, ChangelogSection, ChangelogWriter,
    RepoLinks,
};
pub use conventional::{CommitParser, CommitType, ConventionalCommit};
pub use error::{
    ChangelogError, ConventionalCommitError, NpmClientError, PackageResult, PkgError,
    RegistryError, VersionError,
};
pub use npm::{CliNpmClient, NpmClient, PackInfo, PublishOptions};
pub use package::{validate_package_name, Package, WorkspaceSpec};
pub use registry::{Registry, RegistryAccess, RegistryHttpClient, RegistryManager};
pub use retry::RetryPolicy;
pub use version::{bump, ReleaseKind, Recommendation, VersionEngine, VersionPolicy};
