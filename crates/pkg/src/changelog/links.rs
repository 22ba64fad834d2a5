//! Repository URL normalization and link templates.
//!
//! The remote URL decides how pull requests and commits are linked in the
//! rendered changelog. Unknown hosts fall back to bare references.

use serde::{Deserialize, Serialize};

/// The forge family a remote URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostKind {
    /// GitHub and GitHub-compatible forges (Gitea, Codeberg, enterprise
    /// installs): `/pull/{n}`
    GitHub,
    /// GitLab installs: `/merge_requests/{n}`
    GitLab,
    /// Bitbucket installs: `/pull-requests/{n}`
    Bitbucket,
    /// Anything else: bare references
    Other,
}

/// Link builder derived from a repository remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLinks {
    /// Normalized https base URL, when one could be derived
    pub base_url: Option<String>,
    /// Detected forge family
    pub host: HostKind,
}

impl RepoLinks {
    /// Builds a link template from a raw remote URL.
    #[must_use]
    pub fn from_remote(remote: &str) -> Self {
        let base_url = normalize_remote_url(remote);
        let host = base_url.as_deref().map_or(HostKind::Other, classify_host);
        Self { base_url, host }
    }

    /// A template that only produces bare references.
    #[must_use]
    pub fn bare() -> Self {
        Self { base_url: None, host: HostKind::Other }
    }

    /// Markdown link for a pull request number.
    #[must_use]
    pub fn pr_link(&self, number: u64) -> String {
        let Some(base) = &self.base_url else {
            return format!("#{number}");
        };

        let path = match self.host {
            HostKind::GitHub => format!("{base}/pull/{number}"),
            HostKind::GitLab => format!("{base}/merge_requests/{number}"),
            HostKind::Bitbucket => format!("{base}/pull-requests/{number}"),
            HostKind::Other => return format!("#{number}"),
        };

        format!("[#{number}]({path})")
    }

    /// Markdown link for a commit hash.
    #[must_use]
    pub fn commit_link(&self, hash: &str, short_hash: &str) -> String {
        match (&self.base_url, self.host) {
            (Some(base), HostKind::GitHub | HostKind::GitLab | HostKind::Bitbucket) => {
                format!("[{short_hash}]({base}/commit/{hash})")
            }
            _ => short_hash.to_string(),
        }
    }
}

/// Normalizes a remote URL to a plain https form.
///
/// Strips a trailing `.git`, rewrites `git@host:path` to `https://host/path`
/// and replaces `git://` and `ssh://` schemes.
#[must_use]
pub fn normalize_remote_url(remote: &str) -> Option<String> {
    let remote = remote.trim();
    if remote.is_empty() {
        return None;
    }

    let without_suffix = remote.strip_suffix(".git").unwrap_or(remote);

    if let Some(rest) = without_suffix.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        return Some(format!("https://{host}/{}", path.trim_start_matches('/')));
    }

    if let Some(rest) = without_suffix.strip_prefix("ssh://git@") {
        return Some(format!("https://{rest}"));
    }

    if let Some(rest) = without_suffix.strip_prefix("git://") {
        return Some(format!("https://{rest}"));
    }

    if without_suffix.starts_with("https://") || without_suffix.starts_with("http://") {
        return Some(without_suffix.trim_end_matches('/').to_string());
    }

    None
}

fn classify_host(url: &str) -> HostKind {
    let host = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or("");

    if host.contains("gitlab") {
        HostKind::GitLab
    } else if host.contains("bitbucket") {
        HostKind::Bitbucket
    } else if host.contains("github") || host.contains("gitea") || host.contains("codeberg") {
        HostKind::GitHub
    } else {
        HostKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_remote_forms() {
        assert_eq!(
            normalize_remote_url("git@github.com:acme/tools.git"),
            Some("https://github.com/acme/tools".to_string())
        );
        assert_eq!(
            normalize_remote_url("https://github.com/acme/tools.git"),
            Some("https://github.com/acme/tools".to_string())
        );
        assert_eq!(
            normalize_remote_url("git://gitlab.com/acme/tools"),
            Some("https://gitlab.com/acme/tools".to_string())
        );
        assert_eq!(
            normalize_remote_url("ssh://git@bitbucket.org/acme/tools.git"),
            Some("https://bitbucket.org/acme/tools".to_string())
        );
        assert_eq!(normalize_remote_url(""), None);
        assert_eq!(normalize_remote_url("/local/path"), None);
    }

    #[test]
    fn test_pr_links_per_host() {
        let github = RepoLinks::from_remote("git@github.com:acme/tools.git");
        assert_eq!(github.pr_link(42), "[#42](https://github.com/acme/tools/pull/42)");

        let gitlab = RepoLinks::from_remote("https://gitlab.example.com/acme/tools.git");
        assert_eq!(
            gitlab.pr_link(42),
            "[#42](https://gitlab.example.com/acme/tools/merge_requests/42)"
        );

        let bitbucket = RepoLinks::from_remote("https://bitbucket.org/acme/tools");
        assert_eq!(
            bitbucket.pr_link(42),
            "[#42](https://bitbucket.org/acme/tools/pull-requests/42)"
        );

        let other = RepoLinks::from_remote("https://code.internal.example.com/tools");
        assert_eq!(other.pr_link(42), "#42");
    }

    #[test]
    fn test_commit_links_per_host() {
        let github = RepoLinks::from_remote("https://github.com/acme/tools");
        assert_eq!(
            github.commit_link("abcdef0123", "abcdef0"),
            "[abcdef0](https://github.com/acme/tools/commit/abcdef0123)"
        );

        let other = RepoLinks::bare();
        assert_eq!(other.commit_link("abcdef0123", "abcdef0"), "abcdef0");
    }

    #[test]
    fn test_link_generation_is_idempotent() {
        let first = RepoLinks::from_remote("git@github.com:acme/tools.git");
        let second = RepoLinks::from_remote("git@github.com:acme/tools.git");
        assert_eq!(first, second);
        assert_eq!(first.pr_link(7), second.pr_link(7));
    }
}
