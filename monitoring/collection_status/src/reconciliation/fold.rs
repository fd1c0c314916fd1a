//! Instance state map building.
//!
//! Folds a product's index buckets into one arena of [`InstanceRecord`]s
//! keyed by instance id. Every record carries exactly one
//! [`CollectionState`], so the internal, fully migrated and partially
//! migrated views are disjoint by construction.
//!
//! - No index bucket: nothing is known about the product.
//! - One index bucket: every instance takes that index's mechanism; partial
//!   migration needs two indices to be observable.
//! - Several index buckets: an instance seen under both mechanisms becomes
//!   partially migrated, keeping the metadata recorded at first sighting.

use std::collections::{BTreeMap, HashMap};

use monitoring_shared_types::{
    CollectionState, IndexBucket, InstanceBucket, InstanceId, InstanceStatus, Product,
    ProductStatus,
};
use tracing::{debug, trace};

use super::classify::{product_index_buckets, should_skip};

/// Inputs of a fold that do not come from the buckets themselves.
#[derive(Debug, Clone, Copy)]
pub struct FoldContext<'a> {
    /// Uuid of the Kibana answering the request, used for `isPrimary`.
    pub kibana_uuid: Option<&'a str>,
    pub shipper_token: &'a str,
    /// Treat every index as shipper-collected (multi-index folds only).
    pub consider_all_migrated: bool,
}

/// Whether every Elasticsearch index should count as migrated.
///
/// Only holds when the request targets the live cluster and that cluster has
/// internal collection confirmed disabled. An unknown setting never overrides.
pub fn considers_all_migrated(
    product: Product,
    request_cluster_uuid: Option<&str>,
    live_cluster_uuid: Option<&str>,
    internal_collection_enabled: Option<bool>,
) -> bool {
    product == Product::Elasticsearch
        && request_cluster_uuid.is_some()
        && request_cluster_uuid == live_cluster_uuid
        && internal_collection_enabled == Some(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub instance_id: InstanceId,
    pub state: CollectionState,
    pub last_seen: Option<i64>,
    pub cluster_uuid: Option<String>,
    pub beat_type: Option<String>,
    pub is_primary: bool,
    pub last_internally_collected: Option<i64>,
}

impl InstanceRecord {
    fn first_sighting(
        product: Product,
        bucket: &InstanceBucket,
        state: CollectionState,
        context: &FoldContext<'_>,
    ) -> Self {
        Self {
            instance_id: bucket.key.clone(),
            state,
            last_seen: bucket.last_seen,
            cluster_uuid: bucket.cluster_uuid.clone(),
            beat_type: if product == Product::Beats {
                bucket.beat_type.clone()
            } else {
                None
            },
            is_primary: product == Product::Kibana
                && context.kibana_uuid == Some(bucket.key.as_str()),
            last_internally_collected: None,
        }
    }

    // Later sightings only fill gaps; recorded metadata is never replaced
    fn observe(&mut self, product: Product, bucket: &InstanceBucket) {
        self.last_seen = self.last_seen.max(bucket.last_seen);
        if self.cluster_uuid.is_none() {
            self.cluster_uuid = bucket.cluster_uuid.clone();
        }
        if product == Product::Beats && self.beat_type.is_none() {
            self.beat_type = bucket.beat_type.clone();
        }
    }

    pub fn into_status(self) -> InstanceStatus {
        let partially_migrated = self.state == CollectionState::PartiallyMigrated;
        InstanceStatus {
            last_timestamp: self.last_seen,
            is_primary: self.is_primary,
            beat_type: self.beat_type,
            cluster_uuid: self.cluster_uuid,
            is_internal_collector: self.state == CollectionState::InternalOnly,
            is_partially_migrated: partially_migrated,
            is_fully_migrated: self.state == CollectionState::FullyMigrated,
            last_internally_collected_timestamp: if partially_migrated {
                self.last_internally_collected
            } else {
                None
            },
            is_net_new_user: false,
            node: None,
            instance: None,
        }
    }
}

/// Frozen result of a fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMaps {
    records: BTreeMap<InstanceId, InstanceRecord>,
}

impl StateMaps {
    pub fn get(&self, instance_id: &str) -> Option<&InstanceRecord> {
        self.records.get(instance_id)
    }

    /// View of the records in one collection state.
    pub fn map(&self, state: CollectionState) -> BTreeMap<&str, &InstanceRecord> {
        self.records
            .iter()
            .filter(|(_, record)| record.state == state)
            .map(|(id, record)| (id.as_str(), record))
            .collect()
    }

    pub fn internal_map(&self) -> BTreeMap<&str, &InstanceRecord> {
        self.map(CollectionState::InternalOnly)
    }

    pub fn fully_migrated_map(&self) -> BTreeMap<&str, &InstanceRecord> {
        self.map(CollectionState::FullyMigrated)
    }

    pub fn partially_migrated_map(&self) -> BTreeMap<&str, &InstanceRecord> {
        self.map(CollectionState::PartiallyMigrated)
    }

    pub fn count(&self, state: CollectionState) -> usize {
        self.records
            .values()
            .filter(|record| record.state == state)
            .count()
    }

    /// Size of the union of the three views.
    pub fn total_unique_instance_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_product_status(self) -> ProductStatus {
        ProductStatus {
            total_unique_instance_count: self.total_unique_instance_count(),
            total_unique_internally_collected_count: self.count(CollectionState::InternalOnly),
            total_unique_fully_migrated_count: self.count(CollectionState::FullyMigrated),
            total_unique_partially_migrated_count: self
                .count(CollectionState::PartiallyMigrated),
            detected: None,
            by_instance_id: self
                .records
                .into_iter()
                .map(|(id, record)| (id, record.into_status()))
                .collect(),
        }
    }
}

/// Mutable arena used while folding one product.
pub struct StateMapBuilder<'a> {
    product: Product,
    context: FoldContext<'a>,
    records: BTreeMap<InstanceId, InstanceRecord>,
    internal_sightings: HashMap<InstanceId, Vec<i64>>,
}

impl<'a> StateMapBuilder<'a> {
    /// An empty builder for `product`; [`StateMapBuilder::build`] drives it.
    pub fn new(product: Product, context: FoldContext<'a>) -> Self {
        Self {
            product,
            context,
            records: BTreeMap::new(),
            internal_sightings: HashMap::new(),
        }
    }

    /// Fold every index bucket of `buckets` that belongs to `product`.
    pub fn build(product: Product, buckets: &[IndexBucket], context: FoldContext<'a>) -> StateMaps {
        let index_buckets = product_index_buckets(product, buckets);
        let mut builder = Self::new(product, context);

        match index_buckets.as_slice() {
            [] => {
                trace!(product = %product, "No index buckets");
            }
            [single] => builder.fold_single(single),
            many => {
                for index_bucket in many {
                    builder.fold_index(index_bucket);
                }
            }
        }

        builder.finish()
    }

    fn fold_single(&mut self, index_bucket: &IndexBucket) {
        let state = if index_bucket.is_shipper_collected(self.context.shipper_token) {
            CollectionState::FullyMigrated
        } else {
            CollectionState::InternalOnly
        };
        debug!(
            product = %self.product,
            index = %index_bucket.key,
            state = ?state,
            "Single index bucket, classifying wholesale"
        );

        for bucket in &index_bucket.instances {
            if should_skip(self.product, bucket) {
                continue;
            }
            match self.records.get_mut(&bucket.key) {
                Some(record) => record.observe(self.product, bucket),
                None => {
                    let record =
                        InstanceRecord::first_sighting(self.product, bucket, state, &self.context);
                    self.records.insert(bucket.key.clone(), record);
                }
            }
        }
    }

    fn fold_index(&mut self, index_bucket: &IndexBucket) {
        let migrated = self.context.consider_all_migrated
            || index_bucket.is_shipper_collected(self.context.shipper_token);
        let state = if migrated {
            CollectionState::FullyMigrated
        } else {
            CollectionState::InternalOnly
        };

        for bucket in &index_bucket.instances {
            if should_skip(self.product, bucket) {
                continue;
            }

            match self.records.get_mut(&bucket.key) {
                Some(record) => {
                    if record.state != state && record.state != CollectionState::PartiallyMigrated {
                        debug!(
                            product = %self.product,
                            instance = %bucket.key,
                            "Instance seen under both collection mechanisms"
                        );
                        record.state = CollectionState::PartiallyMigrated;
                    }
                    record.observe(self.product, bucket);
                }
                None => {
                    let record =
                        InstanceRecord::first_sighting(self.product, bucket, state, &self.context);
                    self.records.insert(bucket.key.clone(), record);
                }
            }

            if !migrated {
                if let Some(timestamp) = bucket.last_seen {
                    self.internal_sightings
                        .entry(bucket.key.clone())
                        .or_default()
                        .push(timestamp);
                }
            }
        }
    }

    pub fn finish(mut self) -> StateMaps {
        for (instance_id, sightings) in self.internal_sightings.drain() {
            if let Some(record) = self.records.get_mut(&instance_id) {
                if record.state == CollectionState::PartiallyMigrated {
                    record.last_internally_collected = sightings.into_iter().max();
                }
            }
        }
        StateMaps {
            records: self.records,
        }
    }
}
