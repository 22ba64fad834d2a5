use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The named lifecycle extension points the pipeline fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    /// Before the VALIDATE phase
    PreValidate,
    /// After the VALIDATE phase
    PostValidate,
    /// Before the BUMP phase
    PreVersion,
    /// After the BUMP phase
    PostVersion,
    /// Before the CHANGELOG phase
    PreChangelog,
    /// After the CHANGELOG phase
    PostChangelog,
    /// Before the PUBLISH phase
    PrePublish,
    /// After the REPORT phase, with the report as context
    PostPublish,
}

impl HookName {
    /// The configuration key for this hook.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreValidate => "preValidate",
            Self::PostValidate => "postValidate",
            Self::PreVersion => "preVersion",
            Self::PostVersion => "postVersion",
            Self::PreChangelog => "preChangelog",
            Self::PostChangelog => "postChangelog",
            Self::PrePublish => "prePublish",
            Self::PostPublish => "postPublish",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An in-process hook callback.
///
/// Receives the optional phase context and reports failure as a message.
pub type HookCallback =
    Arc<dyn Fn(Option<&serde_json::Value>) -> std::result::Result<(), String> + Send + Sync>;

/// A configured hook: one command, a command list, or a callback.
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum HookValue {
    /// A single shell command
    Command(String),
    /// An ordered list of shell commands
    Commands(Vec<String>),
    /// An in-process callback; only available to programmatic configs
    #[serde(skip)]
    Callback(HookCallback),
}

impl fmt::Debug for HookValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            Self::Commands(cmds) => f.debug_tuple("Commands").field(cmds).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Hook assignments, keyed like the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HooksConfig {
    /// Runs before validation
    pub pre_validate: Option<HookValue>,
    /// Runs after validation
    pub post_validate: Option<HookValue>,
    /// Runs before version bumping
    pub pre_version: Option<HookValue>,
    /// Runs after version bumping
    pub post_version: Option<HookValue>,
    /// Runs before changelog generation
    pub pre_changelog: Option<HookValue>,
    /// Runs after changelog generation
    pub post_changelog: Option<HookValue>,
    /// Runs before publishing
    pub pre_publish: Option<HookValue>,
    /// Runs after the report is assembled
    pub post_publish: Option<HookValue>,
    /// Escalate hook failures to pipeline failures
    pub fail_on_error: bool,
}

impl HooksConfig {
    /// The configured value for a hook, when any.
    #[must_use]
    pub fn get(&self, name: HookName) -> Option<&HookValue> {
        match name {
            HookName::PreValidate => self.pre_validate.as_ref(),
            HookName::PostValidate => self.post_validate.as_ref(),
            HookName::PreVersion => self.pre_version.as_ref(),
            HookName::PostVersion => self.post_version.as_ref(),
            HookName::PreChangelog => self.pre_changelog.as_ref(),
            HookName::PostChangelog => self.post_changelog.as_ref(),
            HookName::PrePublish => self.pre_publish.as_ref(),
            HookName::PostPublish => self.post_publish.as_ref(),
        }
    }
}

/// Outcome of one hook entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResult {
    /// The hook that ran
    pub hook: String,
    /// Whether the entry succeeded
    pub success: bool,
    /// Execution time in milliseconds
    pub duration_ms: u64,
    /// Captured output for command entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Failure detail, when the entry failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
