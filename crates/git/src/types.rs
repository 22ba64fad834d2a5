use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single commit as read from the repository.
///
/// The subject is the first line of the message; the body is everything after
/// the first blank line, when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full commit hash
    pub hash: String,
    /// Abbreviated commit hash
    pub short_hash: String,
    /// First line of the commit message
    pub subject: String,
    /// Message body after the first blank line, if any
    pub body: Option<String>,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author date
    pub date: DateTime<Utc>,
}

impl CommitInfo {
    /// Full message as subject plus body.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.body {
            Some(body) => format!("{}\n\n{}", self.subject, body),
            None => self.subject.clone(),
        }
    }
}

/// The configured committer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Configured user.name
    pub name: String,
    /// Configured user.email
    pub email: String,
}
