//! CLI error type and exit-code mapping.

use thiserror::Error;

/// Result alias for command handlers.
pub type Result<T> = core::result::Result<T, CliError>;

/// Top-level CLI error.
#[derive(Error, Debug)]
pub enum CliError {
    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad command-line input (unparseable version, missing argument).
    #[error("{0}")]
    Usage(String),

    /// The operation completed but reported failures.
    #[error("{0}")]
    OperationFailed(String),

    /// Orchestrator failure.
    #[error(transparent)]
    Monorepo(#[from] shipit_monorepo_tools::Error),

    /// Package-toolkit failure.
    #[error(transparent)]
    Pkg(#[from] shipit_pkg_tools::PkgError),

    /// VCS failure.
    #[error(transparent)]
    Vcs(#[from] shipit_git_tools::RepoError),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// The process exit code for this error.
    ///
    /// Warnings never reach this path; every surfaced error exits non-zero.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }

    /// Renders the error, including the source chain when `DEBUG` is set.
    #[must_use]
    pub fn render(&self) -> String {
        let mut rendered = self.to_string();

        if std::env::var("DEBUG").is_ok() {
            let mut source = std::error::Error::source(self);
            while let Some(cause) = source {
                rendered.push_str(&format!("\n  caused by: {cause}"));
                source = cause.source();
            }
        }

        rendered
    }
}
