//! Collection-status CLI
//!
//! Replays a recorded monitoring fixture through the reconciler and prints
//! which instances are internally collected, migrated, or in between.

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use observability::{init_tracing, level_for_verbosity, TracingConfig};

use crate::commands::{init, status};

#[derive(Parser)]
#[command(name = "collection-status")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Reconciler configuration file (TOML)
    #[arg(short, long, env = "COLLECTION_STATUS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the collection status of a recorded deployment
    Status(status::StatusArgs),

    /// Write a configuration file with the default settings
    Init(init::InitArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(
        TracingConfig::new("collection-status")
            .with_level(level_for_verbosity(cli.verbose))
            .with_json(cli.log_json),
    )?;

    let result = match cli.command {
        Commands::Status(args) => status::execute(args, cli.config.as_deref(), cli.format).await,
        Commands::Init(args) => init::execute(args).await,
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_status_arguments() {
        let cli = Cli::try_parse_from([
            "collection-status",
            "status",
            "--fixture",
            "fixture.json",
            "--cluster-uuid",
            "c1",
            "--skip-live-data",
            "--format",
            "json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_fixture_is_required() {
        assert!(Cli::try_parse_from(["collection-status", "status"]).is_err());
    }
}
