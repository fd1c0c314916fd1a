//! Collection status reconciliation.
//!
//! The pipeline runs leaf first:
//!
//! ```text
//! ┌────────┐    ┌──────────┐    ┌──────┐    ┌───────┐    ┌───────────┐
//! │ Ingest │───▶│ Classify │───▶│ Fold │───▶│ Merge │───▶│ Aggregate │
//! └────────┘    └──────────┘    └──────┘    └───────┘    └───────────┘
//!                                   ▲
//!                               ┌────────┐
//!                               │ Detect │
//!                               └────────┘
//! ```
//!
//! 1. **Ingest**: validate the raw aggregation into typed index buckets
//! 2. **Classify**: decide which buckets count for which product
//! 3. **Fold**: build the internal / fully migrated / partially migrated maps
//! 4. **Detect**: circumstantial evidence for products with no documents
//! 5. **Merge**: add live-only instances as net-new
//! 6. **Aggregate**: assemble the per-product report
//!
//! Everything here is synchronous except detection, which is fetched ahead
//! of the fold together with the other inputs.

pub mod aggregate;
pub mod classify;
pub mod detect;
pub mod fold;
pub mod ingest;
pub mod merge;

pub use aggregate::{product_status, reconcile, ReconcileInputs};
pub use classify::{belongs_to, classify, should_skip, Classification};
pub use detect::{default_detection_targets, DetectedProducts, DetectionTarget, ProductDetector};
pub use fold::{considers_all_migrated, FoldContext, InstanceRecord, StateMapBuilder, StateMaps};
pub use ingest::parse_index_buckets;
pub use merge::{merge_live_kibana, merge_live_nodes, merge_live_signals, LiveSignals};
