use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use semver::Version;
use serde_json::json;
use shipit_git_tools::VcsClient;
use shipit_pkg_tools::changelog::{ChangelogFormatter, ChangelogGenerator, ChangelogWriter, RepoLinks};
use shipit_pkg_tools::npm::{NpmClient, PublishOptions};
use shipit_pkg_tools::version::{bump, ReleaseKind, VersionEngine};
use shipit_pkg_tools::{Package, PkgError};
use shipit_standard_tools::command::{Command, Executor};

use crate::analytics::{AnalyticsStore, PublishRecord};
use crate::config::{ShipitConfig, VersionStrategy};
use crate::error::{PipelineError, Result};
use crate::hooks::{HookName, HookRunner};
use crate::lock;
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::scheduler::{run_graph_phase, PhaseOutcome};
use crate::pipeline::status::{PackageStatus, PublishReport, StatusBoard};
use crate::validation::{ConfigValidator, PackageValidator, VcsValidator};
use crate::workspace::WorkspaceResolver;

const BUILD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Per-run knobs that arrive from the command line rather than the config
/// file.
#[derive(Debug, Clone, Default)]
pub struct PublishRunOptions {
    /// Bump every selected package by this kind
    pub kind: Option<ReleaseKind>,
    /// Set every selected package to this exact version (fixed strategy)
    pub exact_version: Option<Version>,
    /// Derive the bump from commit history
    pub recommend: bool,
    /// Prerelease identifier for pre-kinds
    pub preid: Option<String>,
}

/// Mutable state threaded through one pipeline run.
struct RunState {
    started: Instant,
    root: Option<PathBuf>,
    board: StatusBoard,
    order: Vec<String>,
    deps: BTreeMap<String, BTreeSet<String>>,
    selection: BTreeMap<String, Package>,
    new_versions: BTreeMap<String, Version>,
    errors: Vec<String>,
    warnings: Vec<String>,
    commit: Option<String>,
}

impl RunState {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            root: None,
            board: StatusBoard::new(),
            order: Vec::new(),
            deps: BTreeMap::new(),
            selection: BTreeMap::new(),
            new_versions: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            commit: None,
        }
    }

    fn live_packages(&self) -> Vec<&Package> {
        self.order
            .iter()
            .filter(|name| {
                matches!(
                    self.board.status_of(name),
                    Some(PackageStatus::Pending | PackageStatus::Publishing)
                )
            })
            .filter_map(|name| self.selection.get(name))
            .collect()
    }
}

/// The publish pipeline.
///
/// Owns the run's `PublishContext` and is the only writer of per-package
/// statuses. The VCS and package-manager clients are injected so tests can
/// drive the whole state machine against in-memory fakes.
pub struct PublishPipeline {
    config: ShipitConfig,
    cwd: PathBuf,
    vcs: Arc<dyn VcsClient>,
    npm: Arc<dyn NpmClient>,
    executor: Arc<dyn Executor>,
    cancel: CancellationToken,
    engine: VersionEngine,
}

impl std::fmt::Debug for PublishPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishPipeline").field("cwd", &self.cwd).finish_non_exhaustive()
    }
}

impl PublishPipeline {
    /// Creates a pipeline over the given clients.
    #[must_use]
    pub fn new(
        config: ShipitConfig,
        cwd: PathBuf,
        vcs: Arc<dyn VcsClient>,
        npm: Arc<dyn NpmClient>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let engine = VersionEngine::new(config.version_policy);
        Self { config, cwd, vcs, npm, executor, cancel: CancellationToken::new(), engine }
    }

    /// The run's cancellation token; cancel it to wind the pipeline down.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the pipeline to completion and returns the report.
    ///
    /// Pipeline-global failures short-circuit to the report; the only hard
    /// error is failing to acquire the run lock, which happens before any
    /// state is changed.
    pub async fn run(&self, options: &PublishRunOptions) -> Result<PublishReport> {
        let dry_run = self.config.publish.dry_run;
        let mut state = RunState::new();

        // INIT is read-only; run it first so the lock lands at the
        // workspace root.
        let init_result = self.init(&mut state).await;

        let _lock = match (&init_result, dry_run, &state.root) {
            (Ok(()), false, Some(root)) => Some(lock::acquire(root, None).await?),
            _ => None,
        };

        let outcome = match init_result {
            Ok(()) => self.execute(&mut state, options).await,
            Err(e) => Err(e),
        };

        if let Err(error) = outcome {
            log::error!("Pipeline failed: {error}");
            state.errors.push(error.to_string());
        }

        let hook_runner = self.hook_runner(&state);

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = state.started.elapsed().as_millis() as u64;
        let report = PublishReport::assemble(
            &state.board,
            dry_run,
            duration_ms,
            state.errors.clone(),
            state.warnings.clone(),
        );

        if !dry_run {
            if let Some(root) = &state.root {
                let record = PublishRecord::new(
                    state.order.clone(),
                    report.success,
                    report.duration_ms,
                    report.errors.first().cloned(),
                    state.commit.clone(),
                );
                if let Err(e) = AnalyticsStore::new(root).append(record).await {
                    log::warn!("Could not record analytics: {e}");
                }
            }
        }

        let context = serde_json::to_value(&report).unwrap_or_else(|_| json!({}));
        hook_runner.run(HookName::PostPublish, Some(&context)).await;

        Ok(report)
    }

    /// Phases VALIDATE through VCS; any `Err` short-circuits to REPORT.
    async fn execute(&self, state: &mut RunState, options: &PublishRunOptions) -> Result<()> {
        self.validate(state).await?;
        self.check_cancelled("VALIDATE")?;

        if !self.config.publish.skip_build {
            self.build(state).await?;
            self.check_cancelled("BUILD")?;
        }

        self.bump_versions(state, options).await?;
        self.check_cancelled("BUMP")?;

        if self.config.changelog.enabled && !self.config.publish.dry_run {
            self.changelogs(state).await?;
            self.check_cancelled("CHANGELOG")?;
        }

        self.publish(state).await?;

        if !self.config.publish.dry_run && !self.cancel.is_cancelled() {
            self.vcs_phase(state)?;
        }

        Ok(())
    }

    fn check_cancelled(&self, phase: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError {
                phase: phase.to_string(),
                message: "cancelled".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn hook_runner(&self, state: &RunState) -> HookRunner {
        let workdir = state.root.clone().unwrap_or_else(|| self.cwd.clone());
        HookRunner::new(Arc::clone(&self.executor), self.config.hooks.clone(), workdir)
    }

    async fn run_hook(&self, state: &mut RunState, name: HookName) -> Result<()> {
        let context = json!({
            "packages": state.order,
            "dryRun": self.config.publish.dry_run,
        });

        let results = self.hook_runner(state).run(name, Some(&context)).await;
        let failed: Vec<String> =
            results.iter().filter(|r| !r.success).map(|r| r.hook.clone()).collect();

        for result in &results {
            if !result.success {
                state.warnings.push(format!(
                    "hook {} failed: {}",
                    result.hook,
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }

        if !failed.is_empty() && self.config.hooks.fail_on_error {
            return Err(PipelineError {
                phase: name.as_str().to_string(),
                message: format!("hook failed: {}", failed.join(", ")),
            }
            .into());
        }

        Ok(())
    }

    /// INIT: discover the workspace, compute the ordered selection, seed
    /// statuses.
    async fn init(&self, state: &mut RunState) -> Result<()> {
        let workspace = WorkspaceResolver::new(&self.cwd).initialize().await?;
        state.root = Some(workspace.root.clone());
        state.warnings.extend(workspace.warnings.iter().cloned());

        let selected = workspace.get_packages(&self.config.monorepo.filter, true)?;
        if selected.is_empty() {
            return Err(PipelineError {
                phase: "INIT".to_string(),
                message: "NO_PACKAGES: nothing matched the selection".to_string(),
            }
            .into());
        }

        let names: BTreeSet<String> = selected.iter().map(|pkg| pkg.name.clone()).collect();
        let order = workspace.graph.topological_order(Some(&names))?;

        let mut deps = BTreeMap::new();
        for name in &order {
            let intra: BTreeSet<String> = workspace
                .graph
                .dependencies_of(name)
                .into_iter()
                .filter(|dep| names.contains(dep))
                .collect();
            deps.insert(name.clone(), intra);
        }

        state.selection =
            selected.into_iter().map(|pkg| (pkg.name.clone(), pkg.clone())).collect();
        state.board.seed(order.iter().cloned());
        state.order = order;
        state.deps = deps;

        log::info!(
            "Selected {} package(s): {}",
            state.order.len(),
            state.order.join(", ")
        );

        Ok(())
    }

    /// VALIDATE: configuration, VCS state and every selected package.
    async fn validate(&self, state: &mut RunState) -> Result<()> {
        self.run_hook(state, HookName::PreValidate).await?;

        let mut report = ConfigValidator::validate(&self.config);

        if !self.config.publish.skip_git_check {
            report.merge(VcsValidator::validate(self.vcs.as_ref(), &self.config.git));
        }

        let validator = PackageValidator::new(&self.config.validation);
        for pkg in state.selection.values() {
            report.merge(validator.validate(pkg, Some(self.npm.as_ref())).await);
        }

        for warning in &report.warnings {
            state.warnings.push(format!("{}: {}", warning.code, warning.message));
        }

        if !report.valid() {
            for error in &report.errors {
                state.errors.push(format!("{}: {}", error.code, error.message));
            }
            self.run_hook(state, HookName::PostValidate).await?;
            return Err(PipelineError {
                phase: "VALIDATE".to_string(),
                message: format!("{} validation error(s)", report.errors.len()),
            }
            .into());
        }

        self.run_hook(state, HookName::PostValidate).await?;
        Ok(())
    }

    /// BUILD: run the build command for packages that declare a build
    /// script, honoring graph order and the worker pool.
    async fn build(&self, state: &mut RunState) -> Result<()> {
        let build_command = self.config.build_command.clone();
        let executor = Arc::clone(&self.executor);
        let dirs: BTreeMap<String, (PathBuf, bool)> = state
            .selection
            .values()
            .map(|pkg| (pkg.name.clone(), (pkg.dir.clone(), pkg.has_script("build"))))
            .collect();

        let outcome = run_graph_phase(
            &state.order,
            &state.deps,
            self.config.pool_size(),
            &self.cancel,
            self.config.validation.require_build,
            PhaseOutcome::default(),
            move |name| {
                let executor = Arc::clone(&executor);
                let build_command = build_command.clone();
                let entry = dirs.get(&name).cloned();
                async move {
                    let Some((dir, has_build)) = entry else { return Ok(()) };
                    if !has_build {
                        return Ok(());
                    }

                    log::info!("Building {name}");
                    let command = Command::new("sh")
                        .args(["-c", &build_command])
                        .current_dir(dir)
                        .timeout(BUILD_TIMEOUT);

                    match executor.execute(command).await {
                        Ok(output) if output.success() => Ok(()),
                        Ok(output) => Err(format!(
                            "build exited with status {}: {}",
                            output.status,
                            output.stderr.trim()
                        )),
                        Err(e) => Err(format!("build failed to run: {e}")),
                    }
                }
            },
        )
        .await;

        for (name, error) in &outcome.failed {
            state.board.fail(name, format!("build failed: {error}"));
        }
        for (name, cause) in &outcome.skipped {
            state.board.skip(name, cause.clone());
        }

        if self.config.validation.require_build && !outcome.failed.is_empty() {
            let names: Vec<&str> = outcome.failed.keys().map(String::as_str).collect();
            return Err(PipelineError {
                phase: "BUILD".to_string(),
                message: format!("build failed for {}", names.join(", ")),
            }
            .into());
        }

        Ok(())
    }

    /// BUMP: compute and apply new versions per the configured strategy.
    async fn bump_versions(
        &self,
        state: &mut RunState,
        options: &PublishRunOptions,
    ) -> Result<()> {
        self.run_hook(state, HookName::PreVersion).await?;

        let preid = options.preid.as_deref();
        let mut new_versions: BTreeMap<String, Version> = BTreeMap::new();

        match self.config.monorepo.strategy {
            VersionStrategy::Fixed => {
                let Some(base) =
                    state.selection.values().map(|pkg| pkg.version.clone()).max()
                else {
                    return Ok(());
                };

                let target = if let Some(exact) = &options.exact_version {
                    Some(exact.clone())
                } else if let Some(kind) = options.kind {
                    // A bump failure in fixed strategy is fatal for the run.
                    Some(bump(&base, kind, preid).map_err(PkgError::from)?)
                } else if options.recommend {
                    self.recommend_fixed(state, &base)?
                } else {
                    None
                };

                if let Some(target) = target {
                    for name in &state.order {
                        new_versions.insert(name.clone(), target.clone());
                    }
                }
            }
            VersionStrategy::Independent => {
                for pkg in state.live_packages() {
                    let next = if let Some(exact) = &options.exact_version {
                        Ok(Some(exact.clone()))
                    } else if let Some(kind) = options.kind {
                        bump(&pkg.version, kind, preid).map(Some)
                    } else if options.recommend {
                        match self.engine.recommend(self.vcs.as_ref(), pkg) {
                            Ok(recommendation) => Ok(recommendation.version),
                            Err(e) => {
                                log::warn!("No recommendation for {}: {e}", pkg.name);
                                Ok(None)
                            }
                        }
                    } else {
                        Ok(None)
                    };

                    match next {
                        Ok(Some(version)) if version != pkg.version => {
                            new_versions.insert(pkg.name.clone(), version);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            // Fatal only for the offending package.
                            state.board.fail(&pkg.name, format!("version bump failed: {e}"));
                        }
                    }
                }
            }
        }

        for (name, version) in &new_versions {
            state.board.set_new_version(name, &version.to_string());
        }

        if !self.config.publish.dry_run && !new_versions.is_empty() {
            let updates: Vec<(PathBuf, Version)> = new_versions
                .iter()
                .filter_map(|(name, version)| {
                    state.selection.get(name).map(|pkg| (pkg.manifest_path(), version.clone()))
                })
                .collect();

            self.engine.batch_update(&updates).await.map_err(crate::error::Error::from)?;

            for (name, version) in &new_versions {
                if let Some(pkg) = state.selection.get_mut(name) {
                    pkg.version = version.clone();
                    pkg.manifest.set_version(&version.to_string());
                }
            }

            if self.config.monorepo.rewrite_workspace_protocol {
                let mut packages: Vec<Package> = state.selection.values().cloned().collect();
                let rewritten = self
                    .engine
                    .rewrite_workspace_specs(&mut packages, &new_versions)
                    .await
                    .map_err(crate::error::Error::from)?;
                for pkg in packages {
                    state.selection.insert(pkg.name.clone(), pkg);
                }
                if !rewritten.is_empty() {
                    log::debug!("Rewrote workspace specifiers in: {}", rewritten.join(", "));
                }
            }
        }

        state.new_versions = new_versions;
        self.run_hook(state, HookName::PostVersion).await?;
        Ok(())
    }

    fn recommend_fixed(&self, state: &mut RunState, base: &Version) -> Result<Option<Version>> {
        let latest_tag = self.vcs.latest_tag().map_err(crate::error::Error::from)?;
        let commits =
            self.vcs.commits(latest_tag.as_deref(), None).map_err(crate::error::Error::from)?;

        let parser = shipit_pkg_tools::CommitParser::new();
        let (conventional, _) = parser.parse_all(&commits);
        let recommendation = self.engine.recommend_from_commits(&conventional, base);

        if recommendation.kind.is_none() {
            state.warnings.push("no version bump recommended".to_string());
        }
        Ok(recommendation.version)
    }

    /// CHANGELOG: write one entry per live package.
    async fn changelogs(&self, state: &mut RunState) -> Result<()> {
        self.run_hook(state, HookName::PreChangelog).await?;

        let remote_url = self.vcs.remote_url(&self.config.git.remote).unwrap_or_default();
        let links = RepoLinks::from_remote(&remote_url);
        let generator = ChangelogGenerator::new()
            .include_all_commits(self.config.changelog.include_all_commits);
        let formatter = ChangelogFormatter::new(links);
        let writer = ChangelogWriter::new().regenerate(self.config.changelog.regenerate);

        let all_tags = self.vcs.all_tags().unwrap_or_default();

        let live: Vec<(String, PathBuf, Version)> = state
            .live_packages()
            .into_iter()
            .map(|pkg| {
                let version =
                    state.new_versions.get(&pkg.name).unwrap_or(&pkg.version).clone();
                (pkg.name.clone(), pkg.dir.clone(), version)
            })
            .collect();

        for (name, dir, version) in live {
            let from = last_tag_for(&all_tags, &name, &self.config.git.tag_prefix);

            let content = match generator.generate(
                self.vcs.as_ref(),
                &version.to_string(),
                from.as_deref(),
                None,
            ) {
                Ok(content) => content,
                Err(e) => {
                    state.warnings.push(format!("changelog for {name} failed: {e}"));
                    continue;
                }
            };

            let rendered = formatter.render(&content);
            let path = dir.join(&self.config.changelog.file);
            match writer.write(&path, &version.to_string(), &rendered).await {
                Ok(true) => log::debug!("Wrote changelog entry {version} for {name}"),
                Ok(false) => state
                    .warnings
                    .push(format!("changelog for {name} already has an entry for {version}")),
                Err(e) => state.warnings.push(format!("changelog for {name} failed: {e}")),
            }
        }

        self.run_hook(state, HookName::PostChangelog).await?;
        Ok(())
    }

    /// PUBLISH: topologically ordered, pool-bounded, retried on transient
    /// failures.
    async fn publish(&self, state: &mut RunState) -> Result<()> {
        self.run_hook(state, HookName::PrePublish).await?;

        if self.config.publish.dry_run {
            for name in &state.order {
                if state.board.status_of(name) == Some(PackageStatus::Pending) {
                    state.board.record_attempt(name);
                    state.board.skip(name, "dry-run");
                }
            }
            return Ok(());
        }

        let mut registries = self.config.registry_manager()?;
        if let Err(e) = registries.load_tokens(None).await {
            state.warnings.push(format!("could not load registry credentials: {e}"));
        }

        // Per-package publish inputs, resolved up front so tasks stay
        // self-contained.
        let mut inputs: BTreeMap<String, (PathBuf, String)> = BTreeMap::new();
        for pkg in state.selection.values() {
            let registry = registries.select_for_package(&pkg.name);
            inputs.insert(pkg.name.clone(), (pkg.dir.clone(), registry.url.clone()));
            state.board.set_registry(&pkg.name, &registry.url);
        }

        // Packages that failed build or bump poison their dependents.
        let pre_failed: BTreeMap<String, String> = state
            .board
            .snapshot()
            .into_iter()
            .filter(|(_, outcome)| outcome.status == PackageStatus::Failed)
            .map(|(name, outcome)| {
                (name, outcome.error.unwrap_or_else(|| "failed".to_string()))
            })
            .collect();
        let pre_skipped: BTreeSet<String> = state
            .board
            .snapshot()
            .into_iter()
            .filter(|(_, outcome)| outcome.status == PackageStatus::Skipped)
            .map(|(name, _)| name)
            .collect();

        let order: Vec<String> = state
            .order
            .iter()
            .filter(|name| !pre_skipped.contains(*name))
            .cloned()
            .collect();

        let npm = Arc::clone(&self.npm);
        let board = state.board.clone();
        let policy = self.config.retry.policy();
        let publish_config = self.config.publish.clone();

        let outcome = run_graph_phase(
            &order,
            &state.deps,
            self.config.pool_size(),
            &self.cancel,
            self.config.publish.abort_on_failure,
            PhaseOutcome::with_pre_failed(pre_failed),
            move |name| {
                let npm = Arc::clone(&npm);
                let board = board.clone();
                let policy = policy.clone();
                let publish_config = publish_config.clone();
                let input = inputs.get(&name).cloned();
                async move {
                    let Some((dir, registry_url)) = input else {
                        return Err("package input missing".to_string());
                    };

                    board.record_attempt(&name);
                    board.set_status(&name, PackageStatus::Publishing);
                    log::info!("Publishing {name}");

                    let options = PublishOptions {
                        tag: publish_config.tag.clone(),
                        otp: publish_config.otp.clone(),
                        dry_run: false,
                        access: publish_config.access,
                        registry: Some(registry_url),
                    };

                    let result = policy
                        .run(PkgError::is_transient, || npm.publish(&dir, &options))
                        .await;

                    match result {
                        Ok(output) => {
                            log::debug!("{}", output.trim());
                            board.set_status(&name, PackageStatus::Published);
                            Ok(())
                        }
                        Err(e) => Err(e.to_string()),
                    }
                }
            },
        )
        .await;

        for (name, error) in &outcome.failed {
            if state.board.status_of(name) != Some(PackageStatus::Failed) {
                state.board.fail(name, error.clone());
            }
            state.errors.push(format!("{name}: {error}"));
        }
        for (name, cause) in &outcome.skipped {
            state.board.skip(name, cause.clone());
        }

        Ok(())
    }

    /// VCS: release commit and tags for whatever published.
    fn vcs_phase(&self, state: &mut RunState) -> Result<()> {
        let snapshot = state.board.snapshot();
        let published: Vec<String> = state
            .order
            .iter()
            .filter(|name| {
                snapshot.get(*name).is_some_and(|o| o.status == PackageStatus::Published)
            })
            .cloned()
            .collect();

        if published.is_empty() {
            return Ok(());
        }

        let git = &self.config.git;
        if !git.create_commit && !git.create_tag {
            return Ok(());
        }

        let versions_label = match self.config.monorepo.strategy {
            VersionStrategy::Fixed => state
                .new_versions
                .values()
                .next()
                .map(ToString::to_string)
                .or_else(|| {
                    // No bump happened; tag and commit the current version.
                    published
                        .iter()
                        .filter_map(|name| state.selection.get(name))
                        .map(|pkg| pkg.version.clone())
                        .max()
                        .map(|version| version.to_string())
                })
                .unwrap_or_default(),
            VersionStrategy::Independent => published
                .iter()
                .map(|name| {
                    let version = state
                        .new_versions
                        .get(name)
                        .map(ToString::to_string)
                        .or_else(|| {
                            state.selection.get(name).map(|pkg| pkg.version.to_string())
                        })
                        .unwrap_or_default();
                    format!("{name}@{version}")
                })
                .collect::<Vec<_>>()
                .join(", "),
        };

        if git.create_commit {
            let mut files: Vec<PathBuf> = Vec::new();
            for pkg in state.selection.values() {
                files.push(pkg.manifest_path());
                let changelog = pkg.dir.join(&self.config.changelog.file);
                if changelog.exists() {
                    files.push(changelog);
                }
            }
            if let Some(root) = &state.root {
                for lockfile in ["package-lock.json", "pnpm-lock.yaml", "yarn.lock"] {
                    let path = root.join(lockfile);
                    if path.exists() {
                        files.push(path);
                    }
                }
            }

            let message = git.commit_message.replace("{version}", &versions_label);
            match self.vcs.commit(&message, Some(&files), git.sign_commits) {
                Ok(sha) => {
                    log::info!("Created release commit {sha}");
                    state.commit = Some(sha);
                }
                Err(e) => state.errors.push(format!("release commit failed: {e}")),
            }

            if git.push_commit && state.commit.is_some() {
                if let Err(e) = self.vcs.push(&git.remote, None) {
                    state.errors.push(format!("push failed: {e}"));
                }
            }
        }

        if git.create_tag {
            let tags: Vec<String> = match self.config.monorepo.strategy {
                VersionStrategy::Fixed => {
                    vec![format!("{}{versions_label}", git.tag_prefix)]
                }
                VersionStrategy::Independent => published
                    .iter()
                    .map(|name| {
                        let version = state
                            .new_versions
                            .get(name)
                            .map(ToString::to_string)
                            .or_else(|| {
                                state.selection.get(name).map(|pkg| pkg.version.to_string())
                            })
                            .unwrap_or_default();
                        format!("{name}@{version}")
                    })
                    .collect(),
            };

            for tag in tags {
                match self.vcs.tag_exists(&tag) {
                    Ok(true) => {
                        state.warnings.push(format!("tag {tag} already exists; left intact"));
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        state.errors.push(format!("tag check for {tag} failed: {e}"));
                        continue;
                    }
                }

                match self.vcs.create_tag(&tag, None, git.sign_tags) {
                    Ok(()) => {
                        log::info!("Created tag {tag}");
                        if git.push_tag {
                            if let Err(e) = self.vcs.push_tag(&tag, &git.remote) {
                                state.errors.push(format!("pushing tag {tag} failed: {e}"));
                            }
                        }
                    }
                    Err(e) => state.errors.push(format!("creating tag {tag} failed: {e}")),
                }
            }
        }

        Ok(())
    }
}

/// The most recent release tag for a package: `name@<version>` tags win,
/// then `<prefix><version>` tags, newest version first.
fn last_tag_for(all_tags: &[String], name: &str, tag_prefix: &str) -> Option<String> {
    let per_package_prefix = format!("{name}@");
    let best_per_package = all_tags
        .iter()
        .filter_map(|tag| {
            let rest = tag.strip_prefix(&per_package_prefix)?;
            Version::parse(rest).ok().map(|version| (version, tag.clone()))
        })
        .max_by(|a, b| a.0.cmp(&b.0));

    if let Some((_, tag)) = best_per_package {
        return Some(tag);
    }

    all_tags
        .iter()
        .filter_map(|tag| {
            let rest = tag.strip_prefix(tag_prefix)?;
            Version::parse(rest).ok().map(|version| (version, tag.clone()))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, tag)| tag)
}
