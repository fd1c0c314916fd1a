//! Write a default configuration file.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use status_config::StatusConfig;

use crate::error::Result;
use crate::output;

#[derive(Args)]
pub struct InitArgs {
    /// Where to write the configuration
    #[arg(default_value = "collection-status.toml")]
    path: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    force: bool,
}

pub async fn execute(args: InitArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        output::warn("Configuration already exists. Use --force to overwrite.");
        let existing = StatusConfig::load(&args.path).await?;
        output::section("Current Configuration");
        print_summary(&existing);
        return Ok(());
    }

    let config = StatusConfig::default();
    config.save(&args.path).await?;
    output::success(&format!("Wrote {}", args.path.display()));
    print_summary(&config);
    Ok(())
}

fn print_summary(config: &StatusConfig) {
    println!("  {} {}", "Max bucket size:".dimmed(), config.max_bucket_size);
    println!("  {} {}s", "Look-back:".dimmed(), config.seconds_ago);
    println!("  {} {}", "Shipper token:".dimmed(), config.shipper_token);
    if let Some(ccs) = &config.ccs {
        println!("  {} {}", "Remote cluster:".dimmed(), ccs);
    }
    for target in &config.detection_targets {
        println!(
            "  {} {}",
            format!("Detect {}:", target.product).dimmed(),
            target.patterns.join(", ")
        );
    }
}
