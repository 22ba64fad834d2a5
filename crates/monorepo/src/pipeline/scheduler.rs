//! Graph-gated worker pool for package-scoped phase work.
//!
//! A package becomes runnable only when all its intra-selection dependencies
//! have completed successfully in the same phase. Dispatch follows the
//! topological order, so attempt order is deterministic even with a pool of
//! one.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use tokio::task::JoinSet;

use crate::pipeline::cancel::CancellationToken;

/// What happened to each package in one phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseOutcome {
    /// Packages that completed the phase
    pub succeeded: BTreeSet<String>,
    /// Packages that failed, with their error
    pub failed: BTreeMap<String, String>,
    /// Packages never attempted, with the cause
    pub skipped: BTreeMap<String, String>,
}

impl PhaseOutcome {
    /// Seeds the outcome with packages that already failed in an earlier
    /// phase; their dependents will be skipped.
    #[must_use]
    pub fn with_pre_failed(pre_failed: BTreeMap<String, String>) -> Self {
        Self { failed: pre_failed, ..Self::default() }
    }
}

/// Runs `task` for every package in `order`, bounded by `pool_size` workers
/// and gated by `deps` (intra-selection edges only).
///
/// A package whose dependency failed or was skipped is skipped with a cause
/// naming that dependency. When `abort_on_failure` is set, no new work is
/// dispatched after the first failure. Cancellation lets in-flight tasks
/// finish and skips the rest.
pub async fn run_graph_phase<F, Fut>(
    order: &[String],
    deps: &BTreeMap<String, BTreeSet<String>>,
    pool_size: usize,
    cancel: &CancellationToken,
    abort_on_failure: bool,
    mut outcome: PhaseOutcome,
    task: F,
) -> PhaseOutcome
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), String>> + Send + 'static,
{
    let pool_size = pool_size.max(1);
    let mut pending: Vec<String> =
        order.iter().filter(|name| !outcome.failed.contains_key(*name)).cloned().collect();
    let mut running: JoinSet<(String, Result<(), String>)> = JoinSet::new();
    let mut aborted = false;

    loop {
        // Dispatch everything currently runnable, in topological order.
        if !cancel.is_cancelled() && !aborted {
            let mut index = 0;
            while index < pending.len() && running.len() < pool_size {
                let name = pending[index].clone();
                let package_deps = deps.get(&name).cloned().unwrap_or_default();

                if let Some(blocker) = package_deps
                    .iter()
                    .find(|dep| {
                        outcome.failed.contains_key(*dep) || outcome.skipped.contains_key(*dep)
                    })
                {
                    let cause = if outcome.failed.contains_key(blocker) {
                        format!("dependency {blocker} failed")
                    } else {
                        format!("dependency {blocker} was skipped")
                    };
                    outcome.skipped.insert(name, cause);
                    pending.remove(index);
                    continue;
                }

                let ready = package_deps.iter().all(|dep| outcome.succeeded.contains(dep));
                if ready {
                    pending.remove(index);
                    let future = task(name.clone());
                    running.spawn(async move { (name, future.await) });
                    continue;
                }

                index += 1;
            }
        }

        if running.is_empty() {
            break;
        }

        match running.join_next().await {
            Some(Ok((name, Ok(())))) => {
                outcome.succeeded.insert(name);
            }
            Some(Ok((name, Err(error)))) => {
                outcome.failed.insert(name, error);
                if abort_on_failure {
                    aborted = true;
                }
            }
            Some(Err(join_error)) => {
                log::error!("Phase worker panicked: {join_error}");
            }
            None => break,
        }
    }

    // Whatever never dispatched is skipped with the reason.
    for name in pending {
        if outcome.skipped.contains_key(&name) {
            continue;
        }
        let cause = if cancel.is_cancelled() {
            "cancelled".to_string()
        } else if aborted {
            "aborted after earlier failure".to_string()
        } else {
            "dependencies never completed".to_string()
        };
        outcome.skipped.insert(name, cause);
    }

    outcome
}
