//! Shared command context: configuration loading and client construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shipit_git_tools::{GitClient, NoRepo, VcsClient};
use shipit_monorepo_tools::ShipitConfig;
use shipit_pkg_tools::npm::{CliNpmClient, NpmClient};
use shipit_standard_tools::command::{DefaultCommandExecutor, Executor};

use crate::error::{CliError, Result};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "shipit.config.json";

/// Everything a command handler needs.
pub struct App {
    /// Resolved working directory
    pub cwd: PathBuf,
    /// Loaded (or default) configuration
    pub config: ShipitConfig,
}

impl App {
    /// Loads the configuration for a working directory.
    ///
    /// A missing configuration file falls back to the complete defaults; a
    /// present-but-broken one is an error.
    pub async fn load(cwd: &Path, config_path: Option<&Path>) -> Result<Self> {
        let cwd = cwd
            .canonicalize()
            .map_err(|e| CliError::Usage(format!("invalid --cwd {}: {e}", cwd.display())))?;

        let path = config_path.map(Path::to_path_buf).unwrap_or_else(|| cwd.join(CONFIG_FILE));

        let config = if path.exists() {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
            serde_json::from_str(&content)
                .map_err(|e| CliError::Config(format!("cannot parse {}: {e}", path.display())))?
        } else if config_path.is_some() {
            return Err(CliError::Config(format!("{} does not exist", path.display())));
        } else {
            ShipitConfig::default()
        };

        Ok(Self { cwd, config })
    }

    /// The VCS client for the working directory.
    ///
    /// Falls back to the no-repository client so validators can report the
    /// state instead of the CLI crashing on construction.
    #[must_use]
    pub fn vcs(&self) -> Arc<dyn VcsClient> {
        match GitClient::discover(&self.cwd) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                log::debug!("No repository for {}: {e}", self.cwd.display());
                Arc::new(NoRepo)
            }
        }
    }

    /// The subprocess executor.
    #[must_use]
    pub fn executor(&self) -> Arc<dyn Executor> {
        Arc::new(DefaultCommandExecutor::new())
    }

    /// The package-manager client.
    #[must_use]
    pub fn npm(&self) -> Arc<dyn NpmClient> {
        Arc::new(CliNpmClient::new(self.executor()))
    }
}
