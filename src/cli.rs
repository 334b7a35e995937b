//! CLI definitions for report-relay.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// report-relay CLI.
#[derive(Parser)]
#[command(name = "report-relay")]
#[command(about = "Scheduled SQL report export and FTP/SFTP delivery")]
#[command(version)]
pub(crate) struct Cli {
    /// Service settings file
    #[arg(
        short,
        long,
        default_value = "config/service.toml",
        env = "REPORT_RELAY_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Working directory; relative paths in settings and job definitions
    /// resolve against it
    #[arg(short, long, global = true)]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub(crate) enum Commands {
    /// Run the scheduler in the foreground until stopped (default)
    Run,

    /// Validate settings and job definitions, then exit
    Check,

    /// Execute one job immediately and exit
    RunOnce {
        /// Job id from the definitions file
        job_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["report-relay"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.work_dir.is_none());
    }

    #[test]
    fn test_run_once() {
        let cli = Cli::try_parse_from(["report-relay", "run-once", "daily-sales", "-w", "/srv"])
            .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::RunOnce {
                job_id: "daily-sales".to_string()
            })
        );
        assert_eq!(cli.work_dir, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn test_check_with_config() {
        let cli =
            Cli::try_parse_from(["report-relay", "check", "--config", "/etc/relay.toml"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Check));
        assert_eq!(cli.config, PathBuf::from("/etc/relay.toml"));
    }
}
