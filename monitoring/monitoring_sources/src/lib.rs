//! Implementations of the monitoring source interfaces.
//!
//! - [`mock`]: in-memory sources with call counters for tests
//! - [`fixture`]: sources answering from a recorded JSON fixture file

pub mod fixture;
pub mod mock;

pub use fixture::{FixtureSources, SourceFixture};
pub use mock::{
    AggregationResponseBuilder, MockLiveCluster, MockLiveKibana, MockMonitoringSearch,
    MockPrivilegeChecker, PrivilegeOutcome,
};
