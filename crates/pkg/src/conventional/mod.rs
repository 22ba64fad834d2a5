//! Conventional Commits parsing.
//!
//! The grammar is `type(scope)?!?: subject`; bodies are scanned for the
//! `BREAKING CHANGE` marker, and a trailing `(#123)` in the subject is
//! surfaced as the pull-request number.

mod commit;
mod parser;

pub use commit::{CommitType, ConventionalCommit};
pub use parser::CommitParser;
