use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Known conventional commit types, with a catch-all for custom ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    /// A new feature
    Feat,
    /// A bug fix
    Fix,
    /// A performance improvement
    Perf,
    /// A refactoring without behavior change
    Refactor,
    /// Documentation-only change
    Docs,
    /// Formatting, whitespace, style
    Style,
    /// Test-only change
    Test,
    /// Build system or dependency change
    Build,
    /// CI configuration change
    Ci,
    /// Maintenance work
    Chore,
    /// Reverts a previous commit
    Revert,
    /// Any other type
    Other(String),
}

impl FromStr for CommitType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "feat" => Self::Feat,
            "fix" => Self::Fix,
            "perf" => Self::Perf,
            "refactor" => Self::Refactor,
            "docs" => Self::Docs,
            "style" => Self::Style,
            "test" => Self::Test,
            "build" => Self::Build,
            "ci" => Self::Ci,
            "chore" => Self::Chore,
            "revert" => Self::Revert,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Perf => "perf",
            Self::Refactor => "refactor",
            Self::Docs => "docs",
            Self::Style => "style",
            Self::Test => "test",
            Self::Build => "build",
            Self::Ci => "ci",
            Self::Chore => "chore",
            Self::Revert => "revert",
            Self::Other(other) => other,
        };
        write!(f, "{s}")
    }
}

impl CommitType {
    /// Changelog section title for this type.
    #[must_use]
    pub fn section_title(&self) -> &str {
        match self {
            Self::Feat => "Features",
            Self::Fix => "Bug Fixes",
            Self::Perf => "Performance Improvements",
            Self::Refactor => "Code Refactoring",
            Self::Docs => "Documentation",
            Self::Style => "Styles",
            Self::Test => "Tests",
            Self::Build => "Build System",
            Self::Ci => "Continuous Integration",
            Self::Chore => "Chores",
            Self::Revert => "Reverts",
            Self::Other(_) => "Other Changes",
        }
    }

    /// Ordering priority of this type's changelog section; lower comes
    /// first.
    #[must_use]
    pub fn section_priority(&self) -> u8 {
        match self {
            Self::Feat => 1,
            Self::Fix => 2,
            Self::Perf => 3,
            Self::Refactor => 4,
            Self::Docs => 5,
            Self::Style => 6,
            Self::Test => 7,
            Self::Build => 8,
            Self::Ci => 9,
            Self::Chore => 10,
            Self::Revert => 11,
            Self::Other(_) => 12,
        }
    }

    /// Whether this type is hidden from changelogs by default.
    #[must_use]
    pub fn hidden_by_default(&self) -> bool {
        matches!(self, Self::Chore)
    }
}

/// A commit parsed against the Conventional Commits grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionalCommit {
    /// Full commit hash
    pub hash: String,
    /// Abbreviated commit hash
    pub short_hash: String,
    /// Parsed commit type
    pub commit_type: CommitType,
    /// Optional scope
    pub scope: Option<String>,
    /// Subject with the type prefix stripped
    pub subject: String,
    /// Message body, when present
    pub body: Option<String>,
    /// Whether this commit is marked breaking
    pub breaking: bool,
    /// Pull-request number extracted from the subject, when present
    pub pr_number: Option<u64>,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author date
    pub date: DateTime<Utc>,
}
