use std::str::FromStr;

use semver::Version;
use shipit_monorepo_tools::{PublishPipeline, PublishRunOptions};
use shipit_pkg_tools::version::ReleaseKind;

use crate::app::App;
use crate::cli::PublishArgs;
use crate::error::{CliError, Result};
use crate::output;

/// Runs the full publish pipeline.
///
/// Exits zero only when every selected package published (or the dry run
/// completed without failures).
pub async fn run(app: App, args: PublishArgs) -> Result<()> {
    let mut config = app.config.clone();

    // Command-line flags override the file-sourced configuration.
    if args.dry_run {
        config.publish.dry_run = true;
    }
    if args.parallel {
        config.publish.parallel = true;
    }
    if let Some(concurrency) = args.concurrency {
        config.publish.concurrency = concurrency;
    }
    if args.skip_build {
        config.publish.skip_build = true;
    }
    if args.skip_git_check {
        config.publish.skip_git_check = true;
    }
    if args.abort_on_failure {
        config.publish.abort_on_failure = true;
    }
    if let Some(tag) = &args.tag {
        config.publish.tag = Some(tag.clone());
    }
    if let Some(otp) = &args.otp {
        config.publish.otp = Some(otp.clone());
    }
    if !args.filter.is_empty() {
        config.monorepo.filter = args.filter.clone();
    }

    let options = PublishRunOptions {
        kind: args
            .bump
            .as_deref()
            .map(ReleaseKind::from_str)
            .transpose()
            .map_err(|e| CliError::Usage(e.to_string()))?,
        exact_version: args
            .exact
            .as_deref()
            .map(Version::parse)
            .transpose()
            .map_err(|e| CliError::Usage(format!("invalid --exact version: {e}")))?,
        recommend: args.recommend,
        preid: args.preid.clone(),
    };

    let pipeline =
        PublishPipeline::new(config, app.cwd.clone(), app.vcs(), app.npm(), app.executor());

    // Ctrl-C cancels the run: in-flight packages finish, the rest report as
    // skipped.
    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Cancellation requested; letting in-flight work finish");
            cancel.cancel();
        }
    });

    let report = pipeline.run(&options).await?;

    if args.json {
        println!("{}", output::render_json(&report));
    } else {
        println!("{}", output::render_report(&report));
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::OperationFailed(report.summary))
    }
}
