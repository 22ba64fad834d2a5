//! Command-line interface for the shipit publish orchestrator.
//!
//! The CLI stays thin: it parses arguments, loads the configuration, builds
//! the real VCS/npm/executor clients, and delegates to the library crates.
//! Rendering lives in [`output`]; the per-command handlers in [`commands`].

pub mod app;
pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

use clap::Parser;

use crate::app::App;
use crate::cli::{Cli, Command};
use crate::error::Result;

/// Parses arguments and runs the selected command.
pub async fn run() -> Result<()> {
    let parsed = Cli::parse();
    let app = App::load(&parsed.cwd, parsed.config.as_deref()).await?;

    match parsed.command {
        Command::Publish(args) => commands::publish::run(app, args).await,
        Command::Version(args) => commands::version::run(app, args).await,
        Command::Changelog(args) => commands::changelog::run(app, args).await,
        Command::Rollback(args) => commands::rollback::run(app, args).await,
        Command::Precheck(args) => commands::precheck::run(app, args).await,
        Command::Stats(args) => commands::stats::run(app, args).await,
    }
}
