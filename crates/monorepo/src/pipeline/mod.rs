//! The publish pipeline state machine.
//!
//! Phases run in a fixed order (INIT, VALIDATE, BUILD, BUMP, CHANGELOG,
//! PUBLISH, VCS, REPORT) and any phase failure short-circuits to REPORT
//! with the accumulated findings. Within a phase, package-scoped work runs
//! on a bounded worker pool gated by the dependency graph.

mod cancel;
mod pipeline;
mod scheduler;
mod status;

#[cfg(test)]
pub(crate) mod testing;


pub use cancel::CancellationToken;
pub use pipeline::{PublishPipeline, PublishRunOptions};
pub use scheduler::{run_graph_phase, PhaseOutcome};
pub use status::{PackageOutcome, PackageStatus, PublishReport, StatusBoard};
