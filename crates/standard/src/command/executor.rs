use std::{
    collections::HashMap,
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};

use tokio::{process::Command as TokioCommand, time::timeout};

use crate::error::{CommandError, Result};

/// Represents a command to be executed.
///
/// Contains all the information needed to execute a command, including the
/// program to run, its arguments, environment variables, working directory,
/// and timeout.
///
/// # Examples
///
/// ```
/// use shipit_standard_tools::command::Command;
/// use std::time::Duration;
///
/// let cmd = Command::new("npm")
///     .arg("publish")
///     .arg("--dry-run")
///     .current_dir("/tmp/pkg")
///     .timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    /// Program to run
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
    /// Working directory, or inherit when `None`
    pub current_dir: Option<PathBuf>,
    /// Maximum execution time, or unbounded when `None`
    pub timeout: Option<Duration>,
}

impl Command {
    /// Creates a command for the given program with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            current_dir: None,
            timeout: None,
        }
    }

    /// Appends a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Sets the execution timeout.
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Human-readable rendering used in error messages.
    #[must_use]
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Result of executing a command.
///
/// Contains the exit status, captured stdout and stderr output, and the
/// duration of the command execution.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit status code
    pub status: i32,
    /// Standard output content
    pub stdout: String,
    /// Standard error content
    pub stderr: String,
    /// Command execution duration
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true when the command exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Trait for executing commands.
///
/// This trait defines the contract for command executors, allowing the real
/// tokio-backed executor to be swapped for fakes in tests.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Executes a command and returns its captured output.
    ///
    /// A non-zero exit code is returned as a successful `CommandOutput`; it
    /// is the caller's decision whether that constitutes a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails to spawn or times out.
    async fn execute(&self, command: Command) -> Result<CommandOutput>;
}

/// Default command executor backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct DefaultCommandExecutor {
    /// Timeout applied when a command does not carry its own
    pub default_timeout: Option<Duration>,
}

impl DefaultCommandExecutor {
    /// Creates a new executor with no default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self { default_timeout: None }
    }

    /// Creates a new executor with a default timeout for all commands.
    #[must_use]
    pub fn with_default_timeout(default_timeout: Duration) -> Self {
        Self { default_timeout: Some(default_timeout) }
    }
}

#[async_trait::async_trait]
impl Executor for DefaultCommandExecutor {
    async fn execute(&self, command: Command) -> Result<CommandOutput> {
        let started = Instant::now();
        let display = command.display();

        let mut cmd = TokioCommand::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let effective_timeout = command.timeout.or(self.default_timeout);

        log::debug!("Executing command: {display}");

        let child = cmd.spawn().map_err(|e| CommandError::SpawnFailed {
            cmd: display.clone(),
            message: e.to_string(),
        })?;

        let wait = child.wait_with_output();

        let output = if let Some(limit) = effective_timeout {
            match timeout(limit, wait).await {
                Ok(result) => result,
                Err(_) => {
                    // kill_on_drop reaps the child once the future is dropped
                    return Err(
                        CommandError::Timeout { cmd: display, duration: limit }.into()
                    );
                }
            }
        } else {
            wait.await
        }
        .map_err(|e| CommandError::ExecutionFailed {
            cmd: display.clone(),
            message: e.to_string(),
        })?;

        let result = CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: started.elapsed(),
        };

        log::debug!(
            "Command finished: {display} (status {}, {:?})",
            result.status,
            result.duration
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_captures_stdout() {
        let executor = DefaultCommandExecutor::new();
        let output = executor
            .execute(Command::new("echo").arg("hello"))
            .await
            .expect("echo should run");

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_execute_nonzero_exit_is_reported_in_output() {
        let executor = DefaultCommandExecutor::new();
        let output = executor
            .execute(Command::new("sh").args(["-c", "exit 3"]))
            .await
            .expect("sh should run");

        assert!(!output.success());
        assert_eq!(output.status, 3);
    }

    #[tokio::test]
    async fn test_execute_timeout_kills_command() {
        let executor = DefaultCommandExecutor::new();
        let command = Command::new("sleep").arg("5").timeout(Duration::from_millis(100));

        let result = executor.execute(command).await;
        match result {
            Err(crate::error::Error::Command(CommandError::Timeout { .. })) => {}
            other => panic!("expected timeout error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_missing_program_is_spawn_failure() {
        let executor = DefaultCommandExecutor::new();
        let result = executor.execute(Command::new("definitely-not-a-command-xyz")).await;

        match result {
            Err(crate::error::Error::Command(CommandError::SpawnFailed { .. })) => {}
            other => panic!("expected spawn failure, got {other:?}"),
        }
    }
}
