use colored::Colorize;
use serde::Serialize;
use shipit_monorepo_tools::{
    ConfigValidator, PackageValidator, ValidationReport, VcsValidator, WorkspaceResolver,
};

use crate::app::App;
use crate::cli::PrecheckArgs;
use crate::error::{CliError, Result};
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrecheckReport {
    valid: bool,
    #[serde(flatten)]
    findings: ValidationReport,
}

/// Runs every preflight check without publishing anything.
pub async fn run(app: App, args: PrecheckArgs) -> Result<()> {
    let mut findings = ConfigValidator::validate(&app.config);

    let vcs = app.vcs();
    findings.merge(VcsValidator::validate(vcs.as_ref(), &app.config.git));

    let workspace = WorkspaceResolver::new(&app.cwd).initialize().await?;
    let workspace_findings = workspace.validate();
    for cycle in &workspace_findings.cycles {
        findings.error("DEPENDENCY_CYCLE", format!("dependency cycle: {cycle}"));
    }
    for warning in &workspace_findings.warnings {
        findings.warning("WORKSPACE", warning.clone());
    }

    let selection = workspace.get_packages(&args.filter, true)?;
    if selection.is_empty() {
        findings.error("NO_PACKAGES", "nothing matched the selection");
    }

    let npm = app.npm();
    let validator = PackageValidator::new(&app.config.validation);
    for &pkg in &selection {
        findings.merge(validator.validate(pkg, Some(npm.as_ref())).await);
    }

    // Read-only who-am-I against the default registry.
    let registries = app.config.registry_manager()?;
    match registries.validate_connection(None, npm.as_ref()).await {
        Ok(username) => log::info!("Authenticated against the default registry as {username}"),
        Err(e) => {
            findings.warning("REGISTRY_AUTH", format!("default registry check failed: {e}"));
        }
    }

    let has_errors = !findings.valid();
    let strict_failure = args.strict && !findings.warnings.is_empty();
    let valid = !has_errors && !strict_failure;

    if args.json {
        println!("{}", output::render_json(&PrecheckReport { valid, findings }));
    } else {
        for error in &findings.errors {
            println!("{}  {}: {}", "error".red().bold(), error.code, error.message);
        }
        for warning in &findings.warnings {
            println!("{}  {}: {}", "warn ".yellow().bold(), warning.code, warning.message);
        }
        if valid {
            println!("{}", "All checks passed".green());
        }
    }

    if valid {
        Ok(())
    } else if has_errors {
        Err(CliError::OperationFailed("precheck found blocking problems".to_string()))
    } else {
        Err(CliError::OperationFailed("warnings present and --strict is set".to_string()))
    }
}
