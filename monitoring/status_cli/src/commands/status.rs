//! Status command - compute the collection status of a recorded deployment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use collection_status::{CollectionStatusService, StatusRequest, StatusSources};
use monitoring_source_interface::TimeRange;
use monitoring_sources::FixtureSources;
use observability::status_span;
use status_config::StatusConfig;
use tracing::Instrument;

use crate::error::{CliError, Result};
use crate::output::print_report;
use crate::OutputFormat;

#[derive(Args)]
pub struct StatusArgs {
    /// JSON fixture with the search response and live cluster state
    #[arg(short, long)]
    fixture: PathBuf,

    /// Restrict the report to one cluster
    #[arg(long)]
    cluster_uuid: Option<String>,

    /// Restrict the report to one instance
    #[arg(long)]
    node_uuid: Option<String>,

    /// Start of the time window (date math, e.g. `now-1h`)
    #[arg(long)]
    from: Option<String>,

    /// End of the time window
    #[arg(long)]
    to: Option<String>,

    /// Ignore live cluster and Kibana signals
    #[arg(long)]
    skip_live_data: bool,

    /// Remote cluster alias, overriding the configuration
    #[arg(long)]
    ccs: Option<String>,
}

impl StatusArgs {
    fn to_request(&self, config: &StatusConfig) -> Result<StatusRequest> {
        for (name, value) in [("--from", &self.from), ("--to", &self.to)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(CliError::invalid_argument(format!("{} must not be empty", name)));
            }
        }

        Ok(StatusRequest {
            cluster_uuid: self.cluster_uuid.clone(),
            node_uuid: self.node_uuid.clone(),
            time_range: TimeRange {
                min: self.from.clone(),
                max: self.to.clone(),
            },
            skip_live_data: self.skip_live_data,
            ccs: self.ccs.clone().or_else(|| config.ccs.clone()),
        })
    }
}

pub async fn execute(
    args: StatusArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let config = StatusConfig::load_or_default(config_path).await?;
    let request = args.to_request(&config)?;

    let sources = FixtureSources::load(&args.fixture).await?;
    let service = CollectionStatusService::new(
        StatusSources::from_shared(Arc::new(sources)),
        config.to_settings(),
    );

    let span = status_span!("status", fixture = %args.fixture.display());
    let report = service.collection_status(&request).instrument(span).await?;

    print_report(&report, format)
}
