//! Tracing configuration and initialization.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    /// Used unless `RUST_LOG` is set
    pub log_level: Level,
    /// Report span close events with their timings
    pub include_span_events: bool,
    pub json_output: bool,
    /// Include file and line numbers
    pub include_location: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "collection-status".to_string(),
            log_level: Level::WARN,
            include_span_events: false,
            json_output: false,
            include_location: false,
        }
    }
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }

    pub fn with_span_events(mut self, include: bool) -> Self {
        self.include_span_events = include;
        self
    }

    pub fn with_location(mut self, include: bool) -> Self {
        self.include_location = include;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.to_string()))
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_span_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Map a `-v` count onto a log level: warn, info, debug, then trace.
pub fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Fails if one is already installed.
///
/// ```no_run
/// use observability::{init_tracing, TracingConfig};
/// use tracing::Level;
///
/// init_tracing(TracingConfig::new("collection-status").with_level(Level::DEBUG)).ok();
/// ```
pub fn init_tracing(config: TracingConfig) -> Result<(), TryInitError> {
    let filter = config.build_filter();

    if config.json_output {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(config.span_events())
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_current_span(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(config.span_events())
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    }

    tracing::debug!(
        service = %config.service_name,
        level = %config.log_level,
        "Tracing initialized"
    );
    Ok(())
}

/// Span around one CLI command.
#[macro_export]
macro_rules! status_span {
    ($command:expr) => {
        tracing::info_span!("status_command", command = $command)
    };
    ($command:expr, $($field:tt)*) => {
        tracing::info_span!("status_command", command = $command, $($field)*)
    };
}
