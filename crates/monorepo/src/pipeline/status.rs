use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Lifecycle of one package inside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    /// Selected, not yet attempted
    Pending,
    /// Publish in flight
    Publishing,
    /// Publish succeeded
    Published,
    /// A phase failed for this package
    Failed,
    /// Never attempted (dry-run, failed dependency, cancellation)
    Skipped,
}

/// Everything the pipeline knows about one package's outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageOutcome {
    /// Current status
    pub status: PackageStatus,
    /// Registry URL used for the publish attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Terminal error, when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why the package was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// The version the pipeline assigned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
}

impl PackageOutcome {
    fn pending() -> Self {
        Self { status: PackageStatus::Pending, registry: None, error: None, cause: None, new_version: None }
    }
}

/// The shared, serialized per-package status map.
///
/// The pipeline is the only writer; worker tasks funnel their transitions
/// through this board so readers always observe consistent entries.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    entries: Arc<Mutex<BTreeMap<String, PackageOutcome>>>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl StatusBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, PackageOutcome>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds every selected package as pending.
    pub fn seed<I: IntoIterator<Item = String>>(&self, names: I) {
        let mut entries = self.lock();
        for name in names {
            entries.insert(name, PackageOutcome::pending());
        }
    }

    /// Records the start of a publish attempt.
    pub fn record_attempt(&self, name: &str) {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        attempts.push(name.to_string());
    }

    /// Publish attempts in the order they were started.
    #[must_use]
    pub fn attempt_order(&self) -> Vec<String> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Transitions a package to a bare status.
    pub fn set_status(&self, name: &str, status: PackageStatus) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.status = status;
        }
    }

    /// Records the registry chosen for a package.
    pub fn set_registry(&self, name: &str, registry: &str) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.registry = Some(registry.to_string());
        }
    }

    /// Records the version assigned to a package.
    pub fn set_new_version(&self, name: &str, version: &str) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.new_version = Some(version.to_string());
        }
    }

    /// Marks a package failed with its terminal error.
    pub fn fail(&self, name: &str, error: impl Into<String>) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.status = PackageStatus::Failed;
            entry.error = Some(error.into());
        }
    }

    /// Marks a package skipped with a cause.
    pub fn skip(&self, name: &str, cause: impl Into<String>) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.status = PackageStatus::Skipped;
            entry.cause = Some(cause.into());
        }
    }

    /// Current status of one package.
    #[must_use]
    pub fn status_of(&self, name: &str) -> Option<PackageStatus> {
        self.lock().get(name).map(|entry| entry.status)
    }

    /// A point-in-time copy of the whole board.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, PackageOutcome> {
        self.lock().clone()
    }
}

/// The pipeline's final report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    /// True iff nothing failed and no fatal error occurred
    pub success: bool,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Names that published
    pub published: Vec<String>,
    /// Names that failed
    pub failed: Vec<String>,
    /// Names that were skipped
    pub skipped: Vec<String>,
    /// Total pipeline duration in milliseconds
    pub duration_ms: u64,
    /// Fatal and per-package errors
    pub errors: Vec<String>,
    /// Advisory findings
    pub warnings: Vec<String>,
    /// Publish attempts in start order
    pub attempt_order: Vec<String>,
    /// Full per-package outcomes
    pub statuses: BTreeMap<String, PackageOutcome>,
    /// One-line human summary
    pub summary: String,
}

impl PublishReport {
    /// Assembles the report from the board and run findings.
    #[must_use]
    pub fn assemble(
        board: &StatusBoard,
        dry_run: bool,
        duration_ms: u64,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        let statuses = board.snapshot();

        let with_status = |status: PackageStatus| -> Vec<String> {
            statuses
                .iter()
                .filter(|(_, outcome)| outcome.status == status)
                .map(|(name, _)| name.clone())
                .collect()
        };

        let published = with_status(PackageStatus::Published);
        let failed = with_status(PackageStatus::Failed);
        let mut skipped = with_status(PackageStatus::Skipped);
        // Anything still pending at report time was never attempted.
        skipped.extend(with_status(PackageStatus::Pending));
        skipped.sort();

        let success = failed.is_empty() && errors.is_empty();

        #[allow(clippy::cast_precision_loss)]
        let summary = format!(
            "{} published, {} failed, {} skipped in {:.1}s{}",
            published.len(),
            failed.len(),
            skipped.len(),
            duration_ms as f64 / 1000.0,
            if dry_run { " (dry-run)" } else { "" }
        );

        Self {
            success,
            dry_run,
            published,
            failed,
            skipped,
            duration_ms,
            errors,
            warnings,
            attempt_order: board.attempt_order(),
            statuses,
            summary,
        }
    }
}
