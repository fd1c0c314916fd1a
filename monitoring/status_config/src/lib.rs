//! Configuration of the collection-status reconciler.
//!
//! Settings live in a single TOML file. Every key is optional:
//!
//! ```toml
//! max_bucket_size = 10000
//! seconds_ago = 30
//! shipper_token = "-mb-"
//! kibana_uuid = "5b2de169-2785-441b-ae8c-186a1936b17d"
//! ccs = "remote"
//!
//! [[detection]]
//! product = "beats"
//! patterns = ["*beat-*", ".management-beats*"]
//! ```

pub mod config;
mod error;

pub use config::StatusConfig;
pub use error::{ConfigError, Result};
