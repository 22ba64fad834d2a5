//! Error types for the package toolkit.

use thiserror::Error;

/// Result alias used across the crate.
pub type PackageResult<T> = core::result::Result<T, PkgError>;

/// Errors raised while parsing or bumping versions.
#[derive(Error, Debug, Clone)]
pub enum VersionError {
    /// The input is not a valid semantic version.
    #[error("Invalid version '{version}': {reason}")]
    InvalidFormat {
        /// The offending version string
        version: String,
        /// Why parsing failed
        reason: String,
    },

    /// A bump would move a published version backwards.
    #[error("Refusing to lower '{package}' from published {published} to {requested}")]
    Downgrade {
        /// The package being bumped
        package: String,
        /// The version already on the registry
        published: String,
        /// The lower version that was requested
        requested: String,
    },

    /// The manifest and latest tag disagree and the policy is `error`.
    #[error("Manifest version {manifest} and latest tag {tag} disagree for '{package}'")]
    BaselineConflict {
        /// The package being inspected
        package: String,
        /// Version from the manifest
        manifest: String,
        /// Version from the latest tag
        tag: String,
    },
}

/// Errors raised while parsing conventional commits.
#[derive(Error, Debug, Clone)]
pub enum ConventionalCommitError {
    /// The commit subject does not match the grammar.
    #[error("Commit does not follow the conventional format: {subject}")]
    InvalidFormat {
        /// First line of the offending commit
        subject: String,
    },
}

/// Errors raised by changelog generation and writing.
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// The changelog file could not be read or written.
    #[error("Changelog I/O failed for {path}: {source}")]
    Io {
        /// The changelog path
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// A section for this version already exists.
    #[error("Changelog already contains an entry for {version}")]
    DuplicateVersion {
        /// The version that is already present
        version: String,
    },
}

/// Errors raised by registry records and selection.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No registry with the given name is configured.
    #[error("Unknown registry '{name}'")]
    UnknownRegistry {
        /// The registry that was requested
        name: String,
    },

    /// The registry request failed.
    #[error("Registry request to {registry} failed: {reason}")]
    RequestFailed {
        /// Registry URL
        registry: String,
        /// Failure detail
        reason: String,
        /// Whether a retry could plausibly succeed
        transient: bool,
    },

    /// Authentication was rejected.
    #[error("Authentication against {registry} failed: {reason}")]
    AuthFailed {
        /// Registry URL
        registry: String,
        /// Failure detail
        reason: String,
    },

    /// The credentials file could not be read or rewritten.
    #[error("Failed to update credentials file {path}: {source}")]
    CredentialsIo {
        /// Path of the credentials file
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the package-manager client.
#[derive(Error, Debug, Clone)]
pub enum NpmClientError {
    /// The package manager binary failed to run.
    #[error("npm invocation failed: {reason}")]
    InvocationFailed {
        /// Failure detail
        reason: String,
    },

    /// The package manager exited non-zero.
    #[error("npm {operation} failed for '{package}': {stderr}")]
    OperationFailed {
        /// The npm subcommand that failed
        operation: String,
        /// The package the operation targeted
        package: String,
        /// Captured standard error
        stderr: String,
    },

    /// Output could not be parsed.
    #[error("Failed to parse npm output for {operation}: {reason}")]
    UnparseableOutput {
        /// The npm subcommand whose output failed to parse
        operation: String,
        /// Parse failure detail
        reason: String,
    },
}

impl NpmClientError {
    /// Whether the failure looks like a transient network condition.
    ///
    /// Auth and validation failures must not be retried; timeouts,
    /// connection resets and registry throttling/unavailability may be.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        let detail = match self {
            Self::InvocationFailed { reason } => reason,
            Self::OperationFailed { stderr, .. } => stderr,
            Self::UnparseableOutput { .. } => return false,
        };

        const TRANSIENT_MARKERS: [&str; 9] = [
            "ETIMEDOUT",
            "ECONNRESET",
            "ECONNREFUSED",
            "EAI_AGAIN",
            "socket hang up",
            "429",
            "503",
            "network timeout",
            "timed out",
        ];

        TRANSIENT_MARKERS.iter().any(|marker| detail.contains(marker))
    }
}

/// Umbrella error for the package toolkit.
#[derive(Error, Debug)]
pub enum PkgError {
    /// Version parsing or bumping failure.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Conventional commit parsing failure.
    #[error(transparent)]
    Conventional(#[from] ConventionalCommitError),

    /// Changelog failure.
    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    /// Registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Package-manager client failure.
    #[error(transparent)]
    Npm(#[from] NpmClientError),

    /// VCS failure.
    #[error(transparent)]
    Vcs(#[from] shipit_git_tools::RepoError),

    /// Foundation-layer failure (command execution, manifest I/O).
    #[error(transparent)]
    Standard(#[from] shipit_standard_tools::Error),

    /// The package name violates registry naming rules.
    #[error("Invalid package name '{name}': {reason}")]
    InvalidPackageName {
        /// The offending name
        name: String,
        /// Which rule was violated
        reason: String,
    },
}

impl PkgError {
    /// Whether the underlying failure is a transient network condition.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Npm(err) => err.is_transient(),
            Self::Registry(RegistryError::RequestFailed { transient, .. }) => *transient,
            _ => false,
        }
    }
}
