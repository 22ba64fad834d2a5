use shipit_pkg_tools::changelog::{
    ChangelogFormatter, ChangelogGenerator, ChangelogWriter, RepoLinks,
};
use shipit_standard_tools::manifest::PackageManifest;

use crate::app::App;
use crate::cli::ChangelogArgs;
use crate::error::{CliError, Result};

/// Generates a changelog entry for the package in the working directory.
pub async fn run(app: App, args: ChangelogArgs) -> Result<()> {
    let vcs = app.vcs();
    if !vcs.is_repo() {
        return Err(CliError::OperationFailed(
            "changelog generation requires a git repository".to_string(),
        ));
    }

    let version = match &args.release {
        Some(version) => version.clone(),
        None => {
            let manifest = PackageManifest::read(&app.cwd.join("package.json"))
                .await
                .map_err(shipit_pkg_tools::PkgError::from)?;
            manifest.version().unwrap_or("0.0.0").to_string()
        }
    };

    let from = match &args.from {
        Some(from) => Some(from.clone()),
        None => vcs.latest_tag()?,
    };

    let generator = ChangelogGenerator::new().include_all_commits(args.include_all);
    let content = generator.generate(vcs.as_ref(), &version, from.as_deref(), args.to.as_deref())?;

    if content.is_empty() {
        log::warn!("No changelog-worthy commits in the selected range");
    }

    let remote_url = vcs.remote_url(&app.config.git.remote).unwrap_or_default();
    let formatter = ChangelogFormatter::new(RepoLinks::from_remote(&remote_url));
    let rendered = formatter.render(&content);

    match &args.output {
        Some(output) => {
            let wrote = ChangelogWriter::new()
                .regenerate(args.regenerate)
                .write(output, &version, &rendered)
                .await?;
            if wrote {
                println!("Wrote {version} entry to {}", output.display());
            } else {
                println!(
                    "{} already has an entry for {version}; use --regenerate to replace it",
                    output.display()
                );
            }
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
