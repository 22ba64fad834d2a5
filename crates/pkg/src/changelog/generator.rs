use chrono::{NaiveDate, Utc};
use shipit_git_tools::{CommitInfo, VcsClient};

use crate::changelog::types::{ChangelogContent, ChangelogSection};
use crate::conventional::{CommitParser, CommitType, ConventionalCommit};
use crate::error::PackageResult;

/// Builds [`ChangelogContent`] from commit history.
#[derive(Debug, Clone, Default)]
pub struct ChangelogGenerator {
    parser: CommitParser,
    include_all_commits: bool,
}

impl ChangelogGenerator {
    /// Creates a generator that drops non-conventional commits.
    #[must_use]
    pub fn new() -> Self {
        Self { parser: CommitParser::new(), include_all_commits: false }
    }

    /// Keeps non-conventional commits in an "Other Changes" section instead
    /// of dropping them.
    #[must_use]
    pub fn include_all_commits(mut self, value: bool) -> Self {
        self.include_all_commits = value;
        self
    }

    /// Generates the entry for `version` from the commits between `from`
    /// and `to` (default HEAD).
    pub fn generate(
        &self,
        vcs: &dyn VcsClient,
        version: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> PackageResult<ChangelogContent> {
        let commits = vcs.commits(from, to)?;
        Ok(self.build(version, &commits, Utc::now().date_naive()))
    }

    /// Groups already-fetched commits into a dated entry.
    #[must_use]
    pub fn build(&self, version: &str, commits: &[CommitInfo], date: NaiveDate) -> ChangelogContent {
        let mut parsed: Vec<ConventionalCommit> = Vec::with_capacity(commits.len());

        for commit in commits {
            match self.parser.parse(commit) {
                Ok(conventional) => parsed.push(conventional),
                Err(_) if self.include_all_commits => {
                    parsed.push(fallback_commit(commit));
                }
                Err(_) => {
                    log::debug!("Dropping non-conventional commit: {}", commit.subject);
                }
            }
        }

        // Group by type, preserving the VCS order (newest first) inside
        // each section.
        let mut sections: Vec<ChangelogSection> = Vec::new();
        for commit in parsed {
            if commit.commit_type.hidden_by_default() {
                continue;
            }

            match sections.iter_mut().find(|s| s.commit_type == commit.commit_type) {
                Some(section) => section.commits.push(commit),
                None => sections.push(ChangelogSection {
                    title: commit.commit_type.section_title().to_string(),
                    commit_type: commit.commit_type.clone(),
                    commits: vec![commit],
                }),
            }
        }

        sections.sort_by_key(|section| section.commit_type.section_priority());

        ChangelogContent { version: version.to_string(), date, sections }
    }
}

/// Wraps a non-conventional commit so it can still appear in the entry.
fn fallback_commit(commit: &CommitInfo) -> ConventionalCommit {
    ConventionalCommit {
        hash: commit.hash.clone(),
        short_hash: commit.short_hash.clone(),
        commit_type: CommitType::Other("other".to_string()),
        scope: None,
        subject: commit.subject.clone(),
        body: commit.body.clone(),
        breaking: false,
        pr_number: None,
        author_name: commit.author_name.clone(),
        author_email: commit.author_email.clone(),
        date: commit.date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn commit(subject: &str) -> CommitInfo {
        CommitInfo {
            hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
            short_hash: "0123456".to_string(),
            subject: subject.to_string(),
            body: None,
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            date: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).expect("date")
    }

    #[test]
    fn test_sections_follow_priority_order() {
        let generator = ChangelogGenerator::new();
        let commits = vec![
            commit("docs: document Y"),
            commit("fix: y"),
            commit("feat(core): add X (#42)"),
            commit("chore: deps"),
        ];

        let content = generator.build("1.1.0", &commits, date());
        let titles: Vec<&str> = content.sections.iter().map(|s| s.title.as_str()).collect();

        assert_eq!(titles, vec!["Features", "Bug Fixes", "Documentation"]);
        assert_eq!(content.sections[0].commits[0].subject, "add X (#42)");
    }

    #[test]
    fn test_chore_is_hidden_and_unparseable_dropped() {
        let generator = ChangelogGenerator::new();
        let commits = vec![commit("chore: deps"), commit("random message")];

        let content = generator.build("1.0.1", &commits, date());
        assert!(content.is_empty());
    }

    #[test]
    fn test_include_all_commits_keeps_the_rest() {
        let generator = ChangelogGenerator::new().include_all_commits(true);
        let commits = vec![commit("feat: x"), commit("random message")];

        let content = generator.build("1.1.0", &commits, date());
        let titles: Vec<&str> = content.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Features", "Other Changes"]);
        assert_eq!(content.sections[1].commits[0].subject, "random message");
    }

    #[test]
    fn test_commits_keep_vcs_order_inside_a_section() {
        let generator = ChangelogGenerator::new();
        let commits = vec![commit("fix: newest"), commit("fix: older")];

        let content = generator.build("1.0.1", &commits, date());
        let subjects: Vec<&str> =
            content.sections[0].commits.iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(subjects, vec!["newest", "older"]);
    }
}
