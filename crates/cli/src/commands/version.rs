use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use semver::Version;
use serde::Serialize;
use shipit_monorepo_tools::WorkspaceResolver;
use shipit_pkg_tools::registry::RegistryHttpClient;
use shipit_pkg_tools::version::{ReleaseKind, VersionEngine};
use shipit_standard_tools::cache::{Cache, CacheConfig};

use crate::app::App;
use crate::cli::VersionArgs;
use crate::error::{CliError, Result};
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionChange {
    package: String,
    old_version: String,
    new_version: Option<String>,
    reason: Option<String>,
}

/// Bumps (or reports) package versions.
pub async fn run(app: App, args: VersionArgs) -> Result<()> {
    let kind = args
        .kind
        .as_deref()
        .map(ReleaseKind::from_str)
        .transpose()
        .map_err(|e| CliError::Usage(e.to_string()))?;
    let exact = args
        .exact
        .as_deref()
        .map(Version::parse)
        .transpose()
        .map_err(|e| CliError::Usage(format!("invalid --exact version: {e}")))?;

    if kind.is_none() && exact.is_none() && !args.recommend {
        return Err(CliError::Usage(
            "nothing to do: pass a bump kind, --exact <version> or --recommend".to_string(),
        ));
    }

    let workspace = WorkspaceResolver::new(&app.cwd).initialize().await?;
    let selection = workspace.get_packages(&args.filter, true)?;
    if selection.is_empty() {
        return Err(CliError::OperationFailed("no packages matched the selection".to_string()));
    }

    let engine = VersionEngine::new(app.config.version_policy);
    let vcs = app.vcs();

    // Registry lookups go through the shared cache so repeated queries
    // within one invocation stay cheap.
    let registries = app.config.registry_manager()?;
    let cache = Arc::new(Cache::with_config(CacheConfig {
        default_ttl: Duration::from_secs(app.config.cache.ttl_secs),
        max_size: app.config.cache.max_size,
        sweep_interval: Duration::from_secs(app.config.cache.sweep_interval_secs),
    }));
    let sweeper = cache.start_sweeper();
    let http = if args.against_registry {
        Some(RegistryHttpClient::new(Some(Arc::clone(&cache)))?)
    } else {
        None
    };

    let mut changes: Vec<VersionChange> = Vec::new();
    let mut updates: Vec<(PathBuf, Version)> = Vec::new();
    let mut new_versions = std::collections::BTreeMap::new();

    for &pkg in &selection {
        let (next, reason) = if let (Some(http), Some(kind)) = (&http, kind) {
            let registry = registries.select_for_package(&pkg.name);
            let next = engine
                .next_against_registry(http, registry, pkg, kind, args.preid.as_deref())
                .await;
            match next {
                Ok(version) => (Some(version), None),
                Err(e) => {
                    log::warn!("Registry lookup for {} failed: {e}", pkg.name);
                    (Some(engine.bump(&pkg.version, kind, args.preid.as_deref())?), None)
                }
            }
        } else if let Some(exact) = &exact {
            (Some(exact.clone()), None)
        } else if let Some(kind) = kind {
            (Some(engine.bump(&pkg.version, kind, args.preid.as_deref())?), None)
        } else {
            let recommendation = engine.recommend(vcs.as_ref(), pkg)?;
            (recommendation.version, Some(recommendation.reason))
        };

        let next = next.filter(|next| *next != pkg.version);
        if let Some(next) = &next {
            updates.push((pkg.manifest_path(), next.clone()));
            new_versions.insert(pkg.name.clone(), next.clone());
        }

        changes.push(VersionChange {
            package: pkg.name.clone(),
            old_version: pkg.version.to_string(),
            new_version: next.map(|v| v.to_string()),
            reason,
        });
    }

    engine.batch_update(&updates).await?;

    if app.config.monorepo.rewrite_workspace_protocol && !new_versions.is_empty() {
        let mut packages: Vec<_> = selection.into_iter().cloned().collect();
        engine.rewrite_workspace_specs(&mut packages, &new_versions).await?;
    }

    sweeper.abort();

    if args.json {
        println!("{}", output::render_json(&changes));
    } else {
        for change in &changes {
            match (&change.new_version, &change.reason) {
                (Some(new_version), _) => println!(
                    "{}: {} → {}",
                    change.package.bold(),
                    change.old_version,
                    new_version.green()
                ),
                (None, Some(reason)) => {
                    println!("{}: {} ({reason})", change.package.bold(), change.old_version);
                }
                (None, None) => {
                    println!("{}: {} (unchanged)", change.package.bold(), change.old_version);
                }
            }
        }
    }

    Ok(())
}
