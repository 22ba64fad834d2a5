use std::path::Path;

use crate::error::{ChangelogError, PackageResult};

const DEFAULT_HEADING: &str = "# Changelog";

/// Writes rendered changelog entries into a changelog file.
///
/// New entries are inserted beneath an existing top-level heading so the
/// newest release stays on top; a missing file gets a fresh heading.
/// Existing version entries are left alone unless `regenerate` is set.
#[derive(Debug, Clone, Default)]
pub struct ChangelogWriter {
    regenerate: bool,
}

impl ChangelogWriter {
    /// Creates a writer that preserves existing version entries.
    #[must_use]
    pub fn new() -> Self {
        Self { regenerate: false }
    }

    /// Replaces an existing entry for the same version instead of skipping.
    #[must_use]
    pub fn regenerate(mut self, value: bool) -> Self {
        self.regenerate = value;
        self
    }

    /// Inserts `rendered` (one full `## version` entry) into the changelog
    /// at `path`.
    ///
    /// Returns `false` when the version already had an entry and
    /// regeneration is off.
    pub async fn write(&self, path: &Path, version: &str, rendered: &str) -> PackageResult<bool> {
        let existing = if path.exists() {
            Some(tokio::fs::read_to_string(path).await.map_err(|source| ChangelogError::Io {
                path: path.display().to_string(),
                source,
            })?)
        } else {
            None
        };

        let updated = match existing {
            None => format!("{DEFAULT_HEADING}\n\n{rendered}"),
            Some(current) => {
                let has_entry = has_version_entry(&current, version);
                if has_entry && !self.regenerate {
                    log::info!(
                        "Changelog {} already has an entry for {version}; skipping",
                        path.display()
                    );
                    return Ok(false);
                }

                let current = if has_entry {
                    remove_version_entry(&current, version)
                } else {
                    current
                };

                insert_entry(&current, rendered)
            }
        };

        tokio::fs::write(path, updated).await.map_err(|source| ChangelogError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Ok(true)
    }
}

fn entry_heading_matches(line: &str, version: &str) -> bool {
    let Some(rest) = line.strip_prefix("## ") else { return false };
    let rest = rest.trim_start_matches('[');
    rest.starts_with(version)
        && rest[version.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '.' && c != '-')
}

fn has_version_entry(content: &str, version: &str) -> bool {
    content.lines().any(|line| entry_heading_matches(line, version))
}

/// Drops the whole `## <version>` block, up to the next `## ` heading.
fn remove_version_entry(content: &str, version: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut skipping = false;

    for line in content.lines() {
        if entry_heading_matches(line, version) {
            skipping = true;
            continue;
        }
        if skipping && line.starts_with("## ") {
            skipping = false;
        }
        if !skipping {
            kept.push(line);
        }
    }

    let mut result = kept.join("\n");
    if content.ends_with('\n') && !result.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Inserts a new entry beneath the top-level heading, or prepends when the
/// file has none.
fn insert_entry(content: &str, rendered: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();

    let heading_at = lines.iter().position(|line| line.starts_with("# "));

    match heading_at {
        Some(index) => {
            // Skip blank lines directly after the heading.
            let mut insert_at = index + 1;
            while insert_at < lines.len() && lines[insert_at].trim().is_empty() {
                insert_at += 1;
            }

            let mut out = String::new();
            for line in &lines[..insert_at] {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(rendered);
            if !rendered.ends_with('\n') {
                out.push('\n');
            }
            if insert_at < lines.len() {
                out.push('\n');
                for line in &lines[insert_at..] {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            out
        }
        None => {
            let mut out = String::from(rendered);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(content);
            out
        }
    }
}
