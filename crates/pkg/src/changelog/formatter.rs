use regex::Regex;

use crate::changelog::links::RepoLinks;
use crate::changelog::types::ChangelogContent;
use crate::conventional::ConventionalCommit;

/// Renders a [`ChangelogContent`] to Markdown.
#[derive(Debug, Clone)]
pub struct ChangelogFormatter {
    links: RepoLinks,
    trailing_pr: Regex,
}

impl ChangelogFormatter {
    /// Creates a formatter using the given link templates.
    #[must_use]
    pub fn new(links: RepoLinks) -> Self {
        let trailing_pr = Regex::new(r"\s*\(#\d+\)\s*$").expect("pr regex is valid");
        Self { links, trailing_pr }
    }

    /// Renders one version entry.
    ///
    /// The entry starts with a `## <version> (<date>)` heading followed by
    /// one `### <title>` block per section.
    #[must_use]
    pub fn render(&self, content: &ChangelogContent) -> String {
        let mut out = String::new();
        out.push_str(&format!("## {} ({})\n", content.version, content.date.format("%Y-%m-%d")));

        for section in &content.sections {
            if section.commits.is_empty() {
                continue;
            }

            out.push('\n');
            out.push_str(&format!("### {}\n\n", section.title));

            for commit in &section.commits {
                out.push_str(&self.render_commit(commit));
                out.push('\n');
            }
        }

        out
    }

    fn render_commit(&self, commit: &ConventionalCommit) -> String {
        let subject = self.trailing_pr.replace(&commit.subject, "").into_owned();

        let mut line = String::from("- ");
        if let Some(scope) = &commit.scope {
            line.push_str(&format!("**{scope}:** "));
        }
        line.push_str(&subject);

        if let Some(number) = commit.pr_number {
            line.push_str(&format!(" ({})", self.links.pr_link(number)));
        }

        line.push_str(&format!(" ({})", self.links.commit_link(&commit.hash, &commit.short_hash)));
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::types::ChangelogSection;
    use crate::conventional::CommitType;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn entry() -> ChangelogContent {
        let feat = ConventionalCommit {
            hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
            short_hash: "0123456".to_string(),
            commit_type: CommitType::Feat,
            scope: Some("core".to_string()),
            subject: "add X (#42)".to_string(),
            body: None,
            breaking: false,
            pr_number: Some(42),
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            date: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
        };
        let fix = ConventionalCommit {
            commit_type: CommitType::Fix,
            scope: None,
            subject: "y".to_string(),
            pr_number: None,
            ..feat.clone()
        };

        ChangelogContent {
            version: "1.1.0".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 8, 1).expect("date"),
            sections: vec![
                ChangelogSection {
                    title: "Features".to_string(),
                    commit_type: CommitType::Feat,
                    commits: vec![feat],
                },
                ChangelogSection {
                    title: "Bug Fixes".to_string(),
                    commit_type: CommitType::Fix,
                    commits: vec![fix],
                },
            ],
        }
    }

    #[test]
    fn test_render_with_links() {
        let formatter =
            ChangelogFormatter::new(RepoLinks::from_remote("git@github.com:acme/tools.git"));
        let markdown = formatter.render(&entry());

        assert!(markdown.starts_with("## 1.1.0 (2026-08-01)\n"));

        let features_at = markdown.find("### Features").expect("features section");
        let fixes_at = markdown.find("### Bug Fixes").expect("fixes section");
        assert!(features_at < fixes_at);

        assert!(markdown.contains(
            "- **core:** add X ([#42](https://github.com/acme/tools/pull/42)) \
             ([0123456](https://github.com/acme/tools/commit/0123456789abcdef0123456789abcdef01234567))"
        ));
        assert!(markdown.contains("- y ([0123456]("));
    }

    #[test]
    fn test_render_bare_without_remote() {
        let formatter = ChangelogFormatter::new(RepoLinks::bare());
        let markdown = formatter.render(&entry());

        assert!(markdown.contains("- **core:** add X (#42) (0123456)"));
    }
}
