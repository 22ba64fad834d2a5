//! Changelog assembly: grouping conventional commits into sections,
//! rendering Markdown with host-aware links, and updating changelog files.

mod formatter;
mod generator;
mod links;
mod types;
mod writer;

pub use formatter::ChangelogFormatter;
pub use generator::ChangelogGenerator;
pub use links::{normalize_remote_url, HostKind, RepoLinks};
pub use types::{ChangelogContent, ChangelogSection};
pub use writer::ChangelogWriter;
