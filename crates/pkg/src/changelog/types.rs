use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::conventional::{CommitType, ConventionalCommit};

/// One titled group of commits in a changelog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogSection {
    /// Section title (e.g. "Features")
    pub title: String,
    /// The commit type this section groups
    pub commit_type: CommitType,
    /// Commits in the section, newest first
    pub commits: Vec<ConventionalCommit>,
}

/// A complete changelog entry for one version.
///
/// Sections are ordered by the type priority table and the ordering is
/// deterministic for a given commit set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogContent {
    /// The version this entry describes
    pub version: String,
    /// Release date
    pub date: NaiveDate,
    /// Ordered sections
    pub sections: Vec<ChangelogSection>,
}

impl ChangelogContent {
    /// Whether the entry has no visible commits at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|section| section.commits.is_empty())
    }
}
