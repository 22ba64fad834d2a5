use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use shipit_standard_tools::command::{Command, Executor};

use crate::hooks::types::{HookName, HookResult, HookValue, HooksConfig};

const HOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// Executes configured lifecycle hooks and records their results.
///
/// Hook failures are non-fatal by default: the runner records them and the
/// pipeline decides whether to escalate (`hooks.failOnError`).
#[derive(Clone)]
pub struct HookRunner {
    executor: Arc<dyn Executor>,
    config: HooksConfig,
    workdir: PathBuf,
}

impl std::fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRunner").field("workdir", &self.workdir).finish_non_exhaustive()
    }
}

impl HookRunner {
    /// Creates a runner for the given hook configuration.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, config: HooksConfig, workdir: PathBuf) -> Self {
        Self { executor, config, workdir }
    }

    /// Whether failures should fail the pipeline.
    #[must_use]
    pub fn escalates_failures(&self) -> bool {
        self.config.fail_on_error
    }

    /// Runs all entries of a hook in order, returning one result per entry.
    ///
    /// An unconfigured hook returns an empty list. Entries keep executing
    /// after a failure; every outcome is recorded.
    pub async fn run(&self, name: HookName, context: Option<&Value>) -> Vec<HookResult> {
        let Some(value) = self.config.get(name) else {
            return Vec::new();
        };

        log::debug!("Running {name} hook");

        match value {
            HookValue::Command(command) => {
                vec![self.run_command(name, command).await]
            }
            HookValue::Commands(commands) => {
                let mut results = Vec::with_capacity(commands.len());
                for command in commands {
                    results.push(self.run_command(name, command).await);
                }
                results
            }
            HookValue::Callback(callback) => {
                vec![Self::run_callback(name, callback.as_ref(), context)]
            }
        }
    }

    async fn run_command(&self, name: HookName, command: &str) -> HookResult {
        let started = Instant::now();

        let invocation = Command::new("sh")
            .args(["-c", command])
            .current_dir(self.workdir.clone())
            .timeout(HOOK_TIMEOUT);

        match self.executor.execute(invocation).await {
            Ok(output) if output.success() => HookResult {
                hook: name.as_str().to_string(),
                success: true,
                duration_ms: elapsed_ms(started),
                output: Some(output.stdout),
                error: None,
            },
            Ok(output) => {
                log::warn!("Hook {name} command exited with status {}", output.status);
                HookResult {
                    hook: name.as_str().to_string(),
                    success: false,
                    duration_ms: elapsed_ms(started),
                    output: Some(output.stdout),
                    error: Some(format!("exit status {}: {}", output.status, output.stderr)),
                }
            }
            Err(error) => {
                log::warn!("Hook {name} command failed to run: {error}");
                HookResult {
                    hook: name.as_str().to_string(),
                    success: false,
                    duration_ms: elapsed_ms(started),
                    output: None,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    fn run_callback(
        name: HookName,
        callback: &(dyn Fn(Option<&Value>) -> std::result::Result<(), String> + Send + Sync),
        context: Option<&Value>,
    ) -> HookResult {
        let started = Instant::now();

        match callback(context) {
            Ok(()) => HookResult {
                hook: name.as_str().to_string(),
                success: true,
                duration_ms: elapsed_ms(started),
                output: None,
                error: None,
            },
            Err(message) => {
                log::warn!("Hook {name} callback failed: {message}");
                HookResult {
                    hook: name.as_str().to_string(),
                    success: false,
                    duration_ms: elapsed_ms(started),
                    output: None,
                    error: Some(message),
                }
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
