use std::str::FromStr;

use regex::Regex;
use shipit_git_tools::CommitInfo;

use crate::conventional::commit::{CommitType, ConventionalCommit};
use crate::error::{ConventionalCommitError, PackageResult};

/// Marker scanned for in commit bodies, on its own line or inline.
const BREAKING_MARKER: &str = "BREAKING CHANGE";

/// Parser for the Conventional Commits grammar `type(scope)?!?: subject`.
#[derive(Debug, Clone)]
pub struct CommitParser {
    subject_regex: Regex,
    pr_regex: Regex,
}

impl Default for CommitParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitParser {
    /// Creates a parser with the standard grammar.
    #[must_use]
    pub fn new() -> Self {
        // Both regexes are literals; compilation cannot fail.
        let subject_regex = Regex::new(
            r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^)]+)\))?(?P<breaking>!)?:\s+(?P<subject>.+)$",
        )
        .expect("subject grammar regex is valid");
        let pr_regex = Regex::new(r"\(#(?P<number>\d+)\)\s*$").expect("pr regex is valid");

        Self { subject_regex, pr_regex }
    }

    /// Parses one commit.
    ///
    /// # Errors
    ///
    /// Returns `ConventionalCommitError::InvalidFormat` when the subject does
    /// not match the grammar.
    pub fn parse(&self, commit: &CommitInfo) -> PackageResult<ConventionalCommit> {
        let captures = self.subject_regex.captures(&commit.subject).ok_or_else(|| {
            ConventionalCommitError::InvalidFormat { subject: commit.subject.clone() }
        })?;

        let type_str = captures.name("type").map_or("", |m| m.as_str()).to_lowercase();
        let commit_type =
            CommitType::from_str(&type_str).unwrap_or(CommitType::Other(type_str.clone()));

        let scope = captures.name("scope").map(|m| m.as_str().to_string());
        let subject = captures.name("subject").map_or("", |m| m.as_str()).to_string();

        let breaking_marker = captures.name("breaking").is_some();
        let breaking_in_body = commit
            .body
            .as_deref()
            .is_some_and(|body| body.lines().any(|line| line.contains(BREAKING_MARKER)));

        let pr_number = self
            .pr_regex
            .captures(&subject)
            .and_then(|c| c.name("number"))
            .and_then(|m| m.as_str().parse().ok());

        Ok(ConventionalCommit {
            hash: commit.hash.clone(),
            short_hash: commit.short_hash.clone(),
            commit_type,
            scope,
            subject,
            body: commit.body.clone(),
            breaking: breaking_marker || breaking_in_body,
            pr_number,
            author_name: commit.author_name.clone(),
            author_email: commit.author_email.clone(),
            date: commit.date,
        })
    }

    /// Parses a list of commits, dropping the ones that do not follow the
    /// grammar and returning how many were dropped.
    #[must_use]
    pub fn parse_all(&self, commits: &[CommitInfo]) -> (Vec<ConventionalCommit>, usize) {
        let mut parsed = Vec::with_capacity(commits.len());
        let mut dropped = 0;

        for commit in commits {
            match self.parse(commit) {
                Ok(conventional) => parsed.push(conventional),
                Err(_) => {
                    log::debug!("Skipping non-conventional commit: {}", commit.subject);
                    dropped += 1;
                }
            }
        }

        (parsed, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn commit(subject: &str, body: Option<&str>) -> CommitInfo {
        CommitInfo {
            hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
            short_hash: "0123456".to_string(),
            subject: subject.to_string(),
            body: body.map(ToString::to_string),
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            date: Utc::now(),
        }
    }

    #[test]
    fn test_parse_type_scope_and_subject() {
        let parser = CommitParser::new();
        let parsed = parser.parse(&commit("feat(core): add X (#42)", None)).expect("parsed");

        assert_eq!(parsed.commit_type, CommitType::Feat);
        assert_eq!(parsed.scope.as_deref(), Some("core"));
        assert_eq!(parsed.subject, "add X (#42)");
        assert_eq!(parsed.pr_number, Some(42));
        assert!(!parsed.breaking);
    }

    #[test]
    fn test_breaking_via_bang_and_body() {
        let parser = CommitParser::new();

        let bang = parser.parse(&commit("feat!: drop node 14", None)).expect("parsed");
        assert!(bang.breaking);

        let body = parser
            .parse(&commit("fix: tighten parsing", Some("BREAKING CHANGE: strict mode only")))
            .expect("parsed");
        assert!(body.breaking);

        // The marker is case-sensitive.
        let lowercase = parser
            .parse(&commit("fix: tighten parsing", Some("breaking change: not a marker")))
            .expect("parsed");
        assert!(!lowercase.breaking);
    }

    #[test]
    fn test_unknown_type_becomes_other() {
        let parser = CommitParser::new();
        let parsed = parser.parse(&commit("wip: half done", None)).expect("parsed");
        assert_eq!(parsed.commit_type, CommitType::Other("wip".to_string()));
    }

    #[test]
    fn test_non_conventional_subject_is_an_error() {
        let parser = CommitParser::new();
        assert!(parser.parse(&commit("update readme", None)).is_err());
        assert!(parser.parse(&commit("feat:no space", None)).is_err());
    }

    #[test]
    fn test_parse_all_counts_dropped() {
        let parser = CommitParser::new();
        let commits = vec![
            commit("feat: a", None),
            commit("not conventional", None),
            commit("fix: b", None),
        ];

        let (parsed, dropped) = parser.parse_all(&commits);
        assert_eq!(parsed.len(), 2);
        assert_eq!(dropped, 1);
    }
}
