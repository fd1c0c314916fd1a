//! Synchronous status aggregation over already-fetched inputs.
//!
//! One uninterrupted pass: ingest the search response, fold every product,
//! attach detection results and live signals, then assemble the report.

use std::collections::BTreeMap;

use monitoring_shared_types::{
    ClusterUuid, IndexBucket, Product, ProductStatus, ReportMeta, RunMeta, StatusReport,
};
use serde_json::Value;
use tracing::debug;

use super::detect::DetectedProducts;
use super::fold::{considers_all_migrated, FoldContext, StateMapBuilder};
use super::ingest::parse_index_buckets;
use super::merge::{merge_live_signals, LiveSignals};
use crate::settings::ReconcilerSettings;

/// Everything besides the search response that the fold consumes.
#[derive(Debug, Clone)]
pub struct ReconcileInputs<'a> {
    pub settings: &'a ReconcilerSettings,
    pub request_cluster_uuid: Option<&'a str>,
    pub live_cluster_uuid: Option<&'a ClusterUuid>,
    /// `None` when the cluster settings could not be read.
    pub internal_collection_enabled: Option<bool>,
    pub detected: &'a DetectedProducts,
    pub live: &'a LiveSignals,
}

pub fn reconcile(response: &Value, inputs: &ReconcileInputs<'_>) -> StatusReport {
    let mut parsed: BTreeMap<&'static str, Vec<IndexBucket>> = BTreeMap::new();
    let mut products = BTreeMap::new();

    for product in Product::ALL {
        let bucket_name = product.uuid_bucket_name();
        let index_buckets = parsed
            .entry(bucket_name)
            .or_insert_with(|| parse_index_buckets(response, bucket_name));
        let status = product_status(product, index_buckets, inputs);
        debug!(
            product = %product,
            instances = status.total_unique_instance_count,
            "Product status computed"
        );
        products.insert(product, status);
    }

    StatusReport {
        products,
        meta: ReportMeta::Run(RunMeta {
            seconds_ago: inputs.settings.seconds_ago,
            live_cluster_uuid: inputs.live_cluster_uuid.cloned(),
            has_permissions: true,
        }),
    }
}

pub fn product_status(
    product: Product,
    index_buckets: &[IndexBucket],
    inputs: &ReconcileInputs<'_>,
) -> ProductStatus {
    let context = FoldContext {
        kibana_uuid: inputs.settings.kibana_uuid.as_deref(),
        shipper_token: &inputs.settings.shipper_token,
        consider_all_migrated: considers_all_migrated(
            product,
            inputs.request_cluster_uuid,
            inputs.live_cluster_uuid.map(String::as_str),
            inputs.internal_collection_enabled,
        ),
    };

    let mut status = StateMapBuilder::build(product, index_buckets, context).into_product_status();
    if status.total_unique_instance_count == 0 {
        status.detected = Some(inputs.detected.get(product));
    }
    merge_live_signals(product, &mut status, inputs.live);
    status
}
