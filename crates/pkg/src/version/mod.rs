//! Version management: semver bumps, recommendations from commit history,
//! and manifest updates.

mod bump;
mod engine;

pub use bump::{bump, ReleaseKind};
pub use engine::{Recommendation, VersionEngine, VersionPolicy};
