//! Terminal rendering: the per-package summary table and JSON passthrough.

use colored::Colorize;
use shipit_monorepo_tools::{PackageStatus, PublishReport};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Registry")]
    registry: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn colored_status(status: PackageStatus) -> String {
    match status {
        PackageStatus::Published => "published".green().to_string(),
        PackageStatus::Failed => "failed".red().to_string(),
        PackageStatus::Skipped => "skipped".yellow().to_string(),
        PackageStatus::Publishing => "publishing".cyan().to_string(),
        PackageStatus::Pending => "pending".dimmed().to_string(),
    }
}

/// Renders the report as a summary table plus warnings and errors.
#[must_use]
pub fn render_report(report: &PublishReport) -> String {
    let rows: Vec<ReportRow> = report
        .statuses
        .iter()
        .map(|(name, outcome)| ReportRow {
            package: name.clone(),
            status: colored_status(outcome.status),
            version: outcome.new_version.clone().unwrap_or_else(|| "-".to_string()),
            registry: outcome.registry.clone().unwrap_or_else(|| "-".to_string()),
            detail: outcome
                .error
                .clone()
                .or_else(|| outcome.cause.clone())
                .unwrap_or_default(),
        })
        .collect();

    let mut out = Table::new(rows).with(Style::rounded()).to_string();
    out.push('\n');

    if !report.warnings.is_empty() {
        out.push_str(&format!("\n{}\n", "Warnings:".yellow().bold()));
        for warning in &report.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }

    if !report.errors.is_empty() {
        out.push_str(&format!("\n{}\n", "Errors:".red().bold()));
        for error in &report.errors {
            out.push_str(&format!("  - {error}\n"));
        }
    }

    out.push('\n');
    if report.success {
        out.push_str(&format!("{}\n", report.summary.green()));
    } else {
        out.push_str(&format!("{}\n", report.summary.red()));
    }

    out
}

/// Serializes a value as pretty JSON for `--json` output.
#[must_use]
pub fn render_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipit_monorepo_tools::StatusBoard;

    #[test]
    fn test_render_report_includes_every_package() {
        colored::control::set_override(false);

        let board = StatusBoard::new();
        board.seed(["a".to_string(), "b".to_string()]);
        board.set_status("a", PackageStatus::Published);
        board.fail("b", "publish exploded");

        let report = PublishReport::assemble(
            &board,
            false,
            1500,
            vec!["b: publish exploded".to_string()],
            vec!["something minor".to_string()],
        );
        let rendered = render_report(&report);

        assert!(rendered.contains("published"));
        assert!(rendered.contains("publish exploded"));
        assert!(rendered.contains("Warnings:"));
        assert!(rendered.contains("something minor"));
        assert!(rendered.contains("1 published, 1 failed"));
    }
}
