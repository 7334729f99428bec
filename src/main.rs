use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<ExitCode> {
    let cli = routine::cli::Cli::parse();

    match routine::run_blocking(cli)? {
        routine::commands::CommandStatus::Success => Ok(ExitCode::SUCCESS),
        routine::commands::CommandStatus::Failed => Ok(ExitCode::FAILURE),
    }
}
