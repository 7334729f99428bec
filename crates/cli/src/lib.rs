pub mod cli;
pub mod commands;
pub mod config;

use anyhow::{Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

pub use routine_core as core;
pub use routine_core::model;
pub use routine_core::AppConfig;

use crate::cli::{Cli, CliCommand, FilterArgs};
use crate::commands::{App, CommandStatus};

/// Run one command on an internal Tokio runtime, writing to stdout.
pub fn run_blocking(cli: Cli) -> Result<CommandStatus> {
    init_tracing(cli.log_filter.clone())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run(cli))
}

pub async fn run(cli: Cli) -> Result<CommandStatus> {
    let config = config::from_cli(&cli)?;
    tracing::debug!(data_dir = %config.data_dir().display(), "resolved configuration");
    let app = App::open(&config)?;
    let command = cli
        .command
        .unwrap_or_else(|| CliCommand::Week(FilterArgs::default()));

    let stdout = std::io::stdout();
    let handle = stdout.lock();
    commands::execute(&app, command, handle).await
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "warn".to_string());
    let directive: Directive = filter.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
    Ok(())
}
