//! Logging setup for the collection-status tools.
//!
//! Log output always goes to stderr so that a report written to stdout stays
//! machine-readable.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, level_for_verbosity, TracingConfig};

pub use tracing::{debug, error, info, instrument, trace, warn, Level};
