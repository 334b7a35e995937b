//! report-relay
//!
//! Runs SQL reports on cron schedules and delivers them over FTP/SFTP.

mod cli;
mod cmd_check;
mod cmd_run;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use relay_config::{ConfigLoader, ServiceConfig};
use tracing::error;

use crate::cli::{Cli, Commands};

/// Job definitions path from settings, with `~` expanded.
pub(crate) fn definitions_path(config: &ServiceConfig) -> PathBuf {
    PathBuf::from(ConfigLoader::expand_path(
        &config.service.job_definitions.to_string_lossy(),
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(dir) = &cli.work_dir {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("Cannot change to working directory {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let config = match ConfigLoader::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid settings in {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_tracing(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run::run(&config).await,
        Commands::Check => cmd_check::check(&config),
        Commands::RunOnce { job_id } => cmd_run::run_once(&config, &job_id).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
