//! Workspace resolution and the publish pipeline for the shipit publish
//! orchestrator.
//!
//! The crate owns the release-shaped half of the system:
//!
//! - [`workspace`]: discovery, the dependency graph, topological ordering
//! - [`validation`]: config, VCS and package preflight checks
//! - [`hooks`]: lifecycle hook execution
//! - [`pipeline`]: the INIT through REPORT state machine
//! - [`rollback`]: unpublish/deprecate/tag-deletion with an audit trail
//! - [`analytics`]: append-only publish records and statistics
//! - [`lock`]: the per-workspace run lock
//! - [`config`]: the configuration model

pub mod analytics;
pub mod config;
pub mod error;
pub mod hooks;
pub mod lock;
pub mod pipeline;
pub mod rollback;
pub mod validation;
pub mod workspace;

pub use analytics::{AnalyticsStore, PublishRecord, PublishStatistics};
pub use config::{
    ChangelogConfig, GitConfig, MonorepoConfig, PublishConfig, PublishOrder, ShipitConfig,
    ValidationConfig, VersionStrategy,
};
pub use error::{Error, Result};
pub use hooks::{HookName, HookResult, HookRunner, HookValue, HooksConfig};
pub use pipeline::{
    CancellationToken, PackageOutcome, PackageStatus, PublishPipeline, PublishReport,
    PublishRunOptions, StatusBoard,
};
pub use rollback::{RollbackEngine, RollbackOptions, RollbackRecord};
pub use validation::{
    ConfigValidator, PackageValidator, ValidationIssue, ValidationReport, VcsValidator,
};
pub use workspace::{DependencyGraph, Workspace, WorkspaceKind, WorkspaceResolver};
