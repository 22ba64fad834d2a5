//! Preflight validation.
//!
//! Three validators cover the configuration, the VCS state and each
//! package's contents. Validators report findings instead of failing: every
//! check returns a [`ValidationReport`] and the pipeline decides whether to
//! proceed.

mod config;
mod package;
mod vcs;

pub use config::ConfigValidator;
pub use package::PackageValidator;
pub use vcs::VcsValidator;

use serde::Serialize;

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Stable machine-readable code (e.g. `HIGH_CONCURRENCY`)
    pub code: String,
    /// Human-readable explanation
    pub message: String,
}

impl ValidationIssue {
    /// Creates an issue.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Outcome of a validator run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Blocking findings
    pub errors: Vec<ValidationIssue>,
    /// Advisory findings; never change the exit code
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Whether no blocking findings were recorded.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a blocking finding.
    pub fn error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(code, message));
    }

    /// Records an advisory finding.
    pub fn warning(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(code, message));
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}
