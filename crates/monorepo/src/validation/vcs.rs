use shipit_git_tools::VcsClient;

use crate::config::GitConfig;
use crate::validation::ValidationReport;

/// Checks the repository state before any mutation happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct VcsValidator;

impl VcsValidator {
    /// Validates the working tree against the git configuration.
    ///
    /// Not being a repository, a dirty tree (when cleanliness is required)
    /// and a branch outside the allow-list are all blocking findings.
    #[must_use]
    pub fn validate(vcs: &dyn VcsClient, config: &GitConfig) -> ValidationReport {
        let mut report = ValidationReport::default();

        if !vcs.is_repo() {
            report.error("NOT_A_REPOSITORY", "the working directory is not a git repository");
            return report;
        }

        if config.require_clean {
            match vcs.is_clean() {
                Ok(true) => {}
                Ok(false) => {
                    report.error(
                        "DIRTY_WORKING_TREE",
                        "the working tree has uncommitted changes; commit or stash them first",
                    );
                }
                Err(e) => {
                    report.error("VCS_STATUS_FAILED", format!("could not read status: {e}"));
                }
            }
        }

        if !config.allowed_branches.is_empty() {
            match vcs.current_branch() {
                Ok(branch) => {
                    if !config.allowed_branches.contains(&branch) {
                        report.error(
                            "BRANCH_NOT_ALLOWED",
                            format!(
                                "publishing from '{branch}' is not allowed (allowed: {})",
                                config.allowed_branches.join(", ")
                            ),
                        );
                    }
                }
                Err(e) => {
                    report.error("VCS_STATUS_FAILED", format!("could not read branch: {e}"));
                }
            }
        }

        report
    }
}
