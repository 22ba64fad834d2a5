use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use shipit_standard_tools::command::{Command, Executor};

use crate::error::{NpmClientError, PackageResult};
use crate::registry::RegistryAccess;

/// Options for a publish invocation.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Dist-tag to attach (`latest` when unset)
    pub tag: Option<String>,
    /// One-time password for registries that require it
    pub otp: Option<String>,
    /// Whether to pass `--dry-run`
    pub dry_run: bool,
    /// Access level; defaults to public
    pub access: RegistryAccess,
    /// Registry URL override
    pub registry: Option<String>,
}

/// Result of packing a tarball.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackInfo {
    /// Tarball filename
    pub filename: String,
    /// Unpacked size in bytes, when reported
    pub size: u64,
}

/// Operations the orchestrator needs from the package manager.
///
/// All operations may fail with network or auth errors; retrying is the
/// caller's responsibility.
#[async_trait::async_trait]
pub trait NpmClient: Send + Sync {
    /// Publishes the package in `pkg_dir`, returning the captured output.
    async fn publish(&self, pkg_dir: &Path, options: &PublishOptions) -> PackageResult<String>;

    /// Unpublishes a version (or the whole package when `version` is
    /// `None`). The force flag is always set; the registry may still refuse
    /// on policy grounds.
    async fn unpublish(
        &self,
        name: &str,
        version: Option<&str>,
        registry: Option<&str>,
    ) -> PackageResult<()>;

    /// Deprecates a published version with a message.
    async fn deprecate(
        &self,
        name: &str,
        version: &str,
        message: &str,
        registry: Option<&str>,
    ) -> PackageResult<()>;

    /// Fetches registry metadata, optionally a single field.
    ///
    /// Returns `None` when the package does not exist.
    async fn view(
        &self,
        name: &str,
        field: Option<&str>,
        registry: Option<&str>,
    ) -> PackageResult<Option<Value>>;

    /// Whether a specific version has been published.
    async fn version_exists(
        &self,
        name: &str,
        version: &str,
        registry: Option<&str>,
    ) -> PackageResult<bool> {
        let versions = self.versions(name, registry).await?;
        Ok(versions.iter().any(|v| v == version))
    }

    /// Latest published version, when the package exists.
    async fn latest_version(
        &self,
        name: &str,
        registry: Option<&str>,
    ) -> PackageResult<Option<String>> {
        let value = self.view(name, Some("dist-tags.latest"), registry).await?;
        Ok(value.and_then(|v| v.as_str().map(ToString::to_string)))
    }

    /// All published versions.
    async fn versions(&self, name: &str, registry: Option<&str>) -> PackageResult<Vec<String>> {
        let value = self.view(name, Some("versions"), registry).await?;
        Ok(match value {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect(),
            Some(Value::String(single)) => vec![single],
            _ => Vec::new(),
        })
    }

    /// Whether the registry knows the package at all.
    async fn package_exists(&self, name: &str, registry: Option<&str>) -> PackageResult<bool> {
        Ok(self.view(name, Some("name"), registry).await?.is_some())
    }

    /// The authenticated username, or `None` when not logged in.
    async fn whoami(&self, registry: Option<&str>) -> PackageResult<Option<String>>;

    /// Packs the package in `pkg_dir` into a tarball.
    async fn pack(&self, pkg_dir: &Path) -> PackageResult<PackInfo>;
}

const NETWORK_TIMEOUT: Duration = Duration::from_secs(60);
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(120);

/// [`NpmClient`] implementation that shells out to the `npm` binary.
#[derive(Clone)]
pub struct CliNpmClient {
    executor: Arc<dyn Executor>,
    binary: String,
}

impl std::fmt::Debug for CliNpmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliNpmClient").field("binary", &self.binary).finish_non_exhaustive()
    }
}

impl CliNpmClient {
    /// Creates a client using the given executor and the `npm` binary.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor, binary: "npm".to_string() }
    }

    /// Overrides the package-manager binary (e.g. for a shim in tests).
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn command(&self, args: &[String], cwd: Option<&Path>, timeout: Duration) -> Command {
        let mut command = Command::new(&self.binary).args(args.to_vec()).timeout(timeout);
        if let Some(dir) = cwd {
            command = command.current_dir(dir.to_path_buf());
        }
        command
    }

    async fn run(
        &self,
        operation: &str,
        package: &str,
        args: Vec<String>,
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> PackageResult<String> {
        let output = self
            .executor
            .execute(self.command(&args, cwd, timeout))
            .await
            .map_err(|e| NpmClientError::InvocationFailed { reason: e.to_string() })?;

        if output.success() {
            Ok(output.stdout)
        } else {
            Err(NpmClientError::OperationFailed {
                operation: operation.to_string(),
                package: package.to_string(),
                stderr: output.stderr,
            }
            .into())
        }
    }
}

#[async_trait::async_trait]
impl NpmClient for CliNpmClient {
    async fn publish(&self, pkg_dir: &Path, options: &PublishOptions) -> PackageResult<String> {
        let mut args = vec!["publish".to_string()];
        args.push("--access".to_string());
        args.push(options.access.as_str().to_string());

        if let Some(tag) = &options.tag {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }
        if let Some(otp) = &options.otp {
            args.push("--otp".to_string());
            args.push(otp.clone());
        }
        if let Some(registry) = &options.registry {
            args.push("--registry".to_string());
            args.push(registry.clone());
        }
        if options.dry_run {
            args.push("--dry-run".to_string());
        }

        let package = pkg_dir.display().to_string();
        self.run("publish", &package, args, Some(pkg_dir), PUBLISH_TIMEOUT).await
    }

    async fn unpublish(
        &self,
        name: &str,
        version: Option<&str>,
        registry: Option<&str>,
    ) -> PackageResult<()> {
        let spec = match version {
            Some(version) => format!("{name}@{version}"),
            None => name.to_string(),
        };

        let mut args = vec!["unpublish".to_string(), spec, "--force".to_string()];
        if let Some(registry) = registry {
            args.push("--registry".to_string());
            args.push(registry.to_string());
        }

        self.run("unpublish", name, args, None, NETWORK_TIMEOUT).await?;
        Ok(())
    }

    async fn deprecate(
        &self,
        name: &str,
        version: &str,
        message: &str,
        registry: Option<&str>,
    ) -> PackageResult<()> {
        let spec = format!("{name}@{version}");
        let mut args = vec!["deprecate".to_string(), spec, message.to_string()];
        if let Some(registry) = registry {
            args.push("--registry".to_string());
            args.push(registry.to_string());
        }

        self.run("deprecate", name, args, None, NETWORK_TIMEOUT).await?;
        Ok(())
    }

    async fn view(
        &self,
        name: &str,
        field: Option<&str>,
        registry: Option<&str>,
    ) -> PackageResult<Option<Value>> {
        let mut args = vec!["view".to_string(), name.to_string()];
        if let Some(field) = field {
            args.push(field.to_string());
        }
        args.push("--json".to_string());
        if let Some(registry) = registry {
            args.push("--registry".to_string());
            args.push(registry.to_string());
        }

        match self.run("view", name, args, None, NETWORK_TIMEOUT).await {
            Ok(stdout) => {
                let trimmed = stdout.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                let value: Value = serde_json::from_str(trimmed).map_err(|e| {
                    NpmClientError::UnparseableOutput {
                        operation: "view".to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Some(value))
            }
            Err(err) => {
                // A missing package is a normal answer, not a failure.
                if let crate::error::PkgError::Npm(NpmClientError::OperationFailed {
                    stderr,
                    ..
                }) = &err
                {
                    if stderr.contains("E404") || stderr.contains("404 Not Found") {
                        return Ok(None);
                    }
                }
                Err(err)
            }
        }
    }

    async fn whoami(&self, registry: Option<&str>) -> PackageResult<Option<String>> {
        let mut args = vec!["whoami".to_string()];
        if let Some(registry) = registry {
            args.push("--registry".to_string());
            args.push(registry.to_string());
        }

        match self.run("whoami", "-", args, None, NETWORK_TIMEOUT).await {
            Ok(stdout) => {
                let username = stdout.trim().to_string();
                Ok(if username.is_empty() { None } else { Some(username) })
            }
            Err(err) => {
                if let crate::error::PkgError::Npm(NpmClientError::OperationFailed {
                    stderr,
                    ..
                }) = &err
                {
                    if stderr.contains("ENEEDAUTH") {
                        return Ok(None);
                    }
                }
                Err(err)
            }
        }
    }

    async fn pack(&self, pkg_dir: &Path) -> PackageResult<PackInfo> {
        let args = vec!["pack".to_string(), "--json".to_string()];
        let package = pkg_dir.display().to_string();
        let stdout = self.run("pack", &package, args, Some(pkg_dir), NETWORK_TIMEOUT).await?;

        let parsed: Value = serde_json::from_str(stdout.trim()).map_err(|e| {
            NpmClientError::UnparseableOutput {
                operation: "pack".to_string(),
                reason: e.to_string(),
            }
        })?;

        let entry = parsed.get(0).cloned().unwrap_or(parsed);
        let filename = entry
            .get("filename")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| NpmClientError::UnparseableOutput {
                operation: "pack".to_string(),
                reason: "missing filename".to_string(),
            })?;
        let size = entry.get("size").and_then(Value::as_u64).unwrap_or(0);

        Ok(PackInfo { filename, size })
    }
}

/// Removes a pack tarball left behind in the package directory.
pub async fn cleanup_tarball(pkg_dir: &Path, filename: &str) -> std::io::Result<()> {
    let path: PathBuf = pkg_dir.join(filename);
    if path.exists() {
        tokio::fs::remove_file(path).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipit_standard_tools::command::{CommandOutput, DefaultCommandExecutor};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Executor fake that records commands and replays scripted outputs.
    #[derive(Default)]
    struct ScriptedExecutor {
        outputs: Mutex<HashMap<String, CommandOutput>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn script(&self, args_contain: &str, output: CommandOutput) {
            self.outputs.lock().expect("lock").insert(args_contain.to_string(), output);
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().expect("lock").clone()
        }
    }

    #[async_trait::async_trait]
    impl Executor for ScriptedExecutor {
        async fn execute(
            &self,
            command: Command,
        ) -> shipit_standard_tools::Result<CommandOutput> {
            let rendered = command.display();
            self.seen.lock().expect("lock").push(rendered.clone());

            let outputs = self.outputs.lock().expect("lock");
            for (needle, output) in outputs.iter() {
                if rendered.contains(needle) {
                    return Ok(output.clone());
                }
            }
            Ok(CommandOutput {
                status: 0,
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::from_millis(1),
            })
        }
    }

    fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            status: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            duration: Duration::from_millis(1),
        }
    }

    fn failed(stderr: &str) -> CommandOutput {
        CommandOutput {
            status: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_publish_builds_expected_arguments() {
        let executor = Arc::new(ScriptedExecutor::default());
        let client = CliNpmClient::new(Arc::clone(&executor) as Arc<dyn Executor>);

        let options = PublishOptions {
            tag: Some("beta".to_string()),
            otp: None,
            dry_run: true,
            access: RegistryAccess::Public,
            registry: Some("https://registry.npmjs.org".to_string()),
        };
        client.publish(Path::new("/tmp/pkg"), &options).await.expect("publish");

        let seen = executor.seen();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("publish"));
        assert!(seen[0].contains("--access public"));
        assert!(seen[0].contains("--tag beta"));
        assert!(seen[0].contains("--dry-run"));
        assert!(seen[0].contains("--registry https://registry.npmjs.org"));
    }

    #[tokio::test]
    async fn test_view_missing_package_is_none() {
        let executor = Arc::new(ScriptedExecutor::default());
        executor.script("view", failed("npm ERR! code E404"));
        let client = CliNpmClient::new(Arc::clone(&executor) as Arc<dyn Executor>);

        let value = client.view("ghost-pkg", None, None).await.expect("view");
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_latest_version_parses_json_string() {
        let executor = Arc::new(ScriptedExecutor::default());
        executor.script("view", ok("\"1.4.2\"\n"));
        let client = CliNpmClient::new(Arc::clone(&executor) as Arc<dyn Executor>);

        let latest = client.latest_version("some-pkg", None).await.expect("latest");
        assert_eq!(latest.as_deref(), Some("1.4.2"));
    }

    #[tokio::test]
    async fn test_unpublish_always_forces() {
        let executor = Arc::new(ScriptedExecutor::default());
        let client = CliNpmClient::new(Arc::clone(&executor) as Arc<dyn Executor>);

        client.unpublish("p", Some("1.2.3"), None).await.expect("unpublish");
        let seen = executor.seen();
        assert!(seen[0].contains("unpublish p@1.2.3 --force"));
    }

    #[tokio::test]
    async fn test_pack_parses_json_report() {
        let executor = Arc::new(ScriptedExecutor::default());
        executor.script(
            "pack",
            ok(r#"[{"filename": "pkg-1.0.0.tgz", "size": 2048, "files": []}]"#),
        );
        let client = CliNpmClient::new(Arc::clone(&executor) as Arc<dyn Executor>);

        let info = client.pack(Path::new("/tmp/pkg")).await.expect("pack");
        assert_eq!(info, PackInfo { filename: "pkg-1.0.0.tgz".to_string(), size: 2048 });
    }

    #[tokio::test]
    async fn test_transient_classification_from_stderr() {
        let transient = NpmClientError::OperationFailed {
            operation: "publish".to_string(),
            package: "p".to_string(),
            stderr: "npm ERR! network ETIMEDOUT".to_string(),
        };
        assert!(transient.is_transient());

        let auth = NpmClientError::OperationFailed {
            operation: "publish".to_string(),
            package: "p".to_string(),
            stderr: "npm ERR! code E401 unauthorized".to_string(),
        };
        assert!(!auth.is_transient());
    }

    #[tokio::test]
    async fn test_whoami_against_real_executor_shape() {
        // Exercise the argument plumbing through the real executor type with
        // a harmless binary.
        let executor = Arc::new(DefaultCommandExecutor::new());
        let client = CliNpmClient::new(executor as Arc<dyn Executor>).with_binary("echo");

        let result = client.whoami(None).await.expect("echo runs");
        assert_eq!(result.as_deref(), Some("whoami"));
    }
}
