//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Publish orchestrator for JavaScript-ecosystem workspaces.
#[derive(Debug, Parser)]
#[command(name = "shipit", version, about, propagate_version = true)]
pub struct Cli {
    /// Working directory to operate in
    #[arg(long, global = true, default_value = ".")]
    pub cwd: PathBuf,

    /// Path to the configuration file (default: shipit.config.json in cwd)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full publish pipeline
    Publish(PublishArgs),
    /// Bump package versions
    Version(VersionArgs),
    /// Generate a changelog entry
    Changelog(ChangelogArgs),
    /// Roll back a published release
    Rollback(RollbackArgs),
    /// Run preflight checks without publishing
    Precheck(PrecheckArgs),
    /// Show publish statistics
    Stats(StatsArgs),
}

/// Arguments for `shipit publish`.
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Report what would happen without performing external effects
    #[arg(long)]
    pub dry_run: bool,

    /// Dist-tag to publish under
    #[arg(long)]
    pub tag: Option<String>,

    /// One-time password for registries that require it
    #[arg(long)]
    pub otp: Option<String>,

    /// Select packages by name or glob (repeatable)
    #[arg(long)]
    pub filter: Vec<String>,

    /// Publish graph-compatible packages concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Worker-pool bound for parallel phases
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip the build phase
    #[arg(long)]
    pub skip_build: bool,

    /// Skip repository-state validation
    #[arg(long)]
    pub skip_git_check: bool,

    /// Stop scheduling after the first publish failure
    #[arg(long)]
    pub abort_on_failure: bool,

    /// Bump every selected package by this kind before publishing
    #[arg(long, value_name = "KIND")]
    pub bump: Option<String>,

    /// Set every selected package to this exact version
    #[arg(long, value_name = "VERSION", conflicts_with = "bump")]
    pub exact: Option<String>,

    /// Derive the bump from commit history
    #[arg(long, conflicts_with_all = ["bump", "exact"])]
    pub recommend: bool,

    /// Prerelease identifier for pre-release bump kinds
    #[arg(long)]
    pub preid: Option<String>,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `shipit version`.
#[derive(Debug, Args)]
pub struct VersionArgs {
    /// Bump kind: major, minor, patch, premajor, preminor, prepatch,
    /// prerelease
    pub kind: Option<String>,

    /// Set the exact version instead of bumping
    #[arg(long, value_name = "VERSION", conflicts_with = "kind")]
    pub exact: Option<String>,

    /// Derive the bump from commit history
    #[arg(long, conflicts_with_all = ["kind", "exact"])]
    pub recommend: bool,

    /// Bump on top of the latest version the registry has published
    #[arg(long, conflicts_with_all = ["exact", "recommend"])]
    pub against_registry: bool,

    /// Prerelease identifier for pre-release bump kinds
    #[arg(long)]
    pub preid: Option<String>,

    /// Select packages by name or glob (repeatable)
    #[arg(long)]
    pub filter: Vec<String>,

    /// Emit the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `shipit changelog`.
#[derive(Debug, Args)]
pub struct ChangelogArgs {
    /// Start of the commit range (default: the latest reachable tag)
    #[arg(long)]
    pub from: Option<String>,

    /// End of the commit range (default: HEAD)
    #[arg(long)]
    pub to: Option<String>,

    /// Write into this changelog file instead of printing
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Version the entry describes (default: the manifest version)
    #[arg(long, value_name = "VERSION")]
    pub release: Option<String>,

    /// Keep commits that do not follow the conventional grammar
    #[arg(long)]
    pub include_all: bool,

    /// Replace an existing entry for the same version
    #[arg(long)]
    pub regenerate: bool,
}

/// Arguments for `shipit rollback`.
#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// Package to roll back
    pub name: String,

    /// Version to roll back
    #[arg(long)]
    pub version: Option<String>,

    /// Registry URL override
    #[arg(long)]
    pub registry: Option<String>,

    /// Remove the version from the registry
    #[arg(long)]
    pub unpublish: bool,

    /// Mark the version deprecated instead of removing it
    #[arg(long, conflicts_with = "unpublish")]
    pub deprecate: bool,

    /// Message attached to the deprecation
    #[arg(long)]
    pub deprecate_message: Option<String>,

    /// Delete the release tag locally and on the remote
    #[arg(long)]
    pub delete_tag: bool,

    /// Revert the release commit
    #[arg(long)]
    pub revert_vcs: bool,

    /// Why the rollback happened; stored in the audit record
    #[arg(long)]
    pub reason: Option<String>,
}

/// Arguments for `shipit precheck`.
#[derive(Debug, Args)]
pub struct PrecheckArgs {
    /// Select packages by name or glob (repeatable)
    #[arg(long)]
    pub filter: Vec<String>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    /// Emit the findings as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `shipit stats`.
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Show only the most recent N records
    #[arg(long, value_name = "N")]
    pub recent: Option<usize>,

    /// Delete all recorded statistics
    #[arg(long, conflicts_with = "recent")]
    pub clear: bool,

    /// Emit the statistics as JSON
    #[arg(long)]
    pub json: bool,
}
