use colored::Colorize;
use shipit_monorepo_tools::rollback::{RollbackEngine, RollbackOptions};
use shipit_monorepo_tools::WorkspaceResolver;

use crate::app::App;
use crate::cli::RollbackArgs;
use crate::error::{CliError, Result};

/// Rolls back a published release.
pub async fn run(app: App, args: RollbackArgs) -> Result<()> {
    if !args.unpublish && !args.deprecate && !args.delete_tag && !args.revert_vcs {
        return Err(CliError::Usage(
            "nothing to do: pass --unpublish, --deprecate, --delete-tag or --revert-vcs"
                .to_string(),
        ));
    }

    let workspace_root = match WorkspaceResolver::new(&app.cwd).initialize().await {
        Ok(workspace) => workspace.root,
        Err(_) => app.cwd.clone(),
    };

    let options = RollbackOptions {
        version: args.version.clone(),
        registry: args.registry.clone(),
        unpublish: args.unpublish,
        deprecate: args.deprecate,
        deprecate_message: args.deprecate_message.clone(),
        revert_vcs: args.revert_vcs,
        delete_tag: args.delete_tag,
        remote: app.config.git.remote.clone(),
        reason: args.reason.clone(),
    };

    let engine = RollbackEngine::new(app.vcs(), app.npm(), &workspace_root);
    let record = engine.rollback(&args.name, &options).await?;

    for action in &record.actions {
        let marker = if action.skipped {
            "skipped".yellow()
        } else if action.success {
            "ok".green()
        } else {
            "failed".red()
        };
        let detail = action.error.as_deref().unwrap_or("");
        println!("  {marker}  {:?} {detail}", action.kind);
    }

    if record.success {
        println!(
            "{}",
            format!("Rolled back {}@{}", record.package, record.version.as_deref().unwrap_or("?"))
                .green()
        );
        Ok(())
    } else {
        Err(CliError::OperationFailed(format!(
            "rollback of {} completed with failures",
            record.package
        )))
    }
}
