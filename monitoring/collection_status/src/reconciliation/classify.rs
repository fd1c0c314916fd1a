//! Bucket classification.
//!
//! APM and Beats are separate products but both monitor into the
//! `.monitoring-beats-*` indices; the only way to tell their documents apart
//! is the beat type sub-aggregation. A bucket whose top beat type is
//! `apm-server` belongs to APM and must be ignored for Beats, and the
//! reverse holds for APM.

use monitoring_shared_types::{IndexBucket, InstanceBucket, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub belongs_to: bool,
    pub skip: bool,
}

impl Classification {
    pub fn contributes(&self) -> bool {
        self.belongs_to && !self.skip
    }
}

/// Whether an index key names one of `product`'s monitoring indices.
pub fn belongs_to(product: Product, index_key: &str) -> bool {
    index_key.contains(product.index_token())
}

/// Whether a bucket inside a shared Beats index belongs to the other product.
pub fn should_skip(product: Product, bucket: &InstanceBucket) -> bool {
    match product {
        Product::Beats => bucket.is_apm_server(),
        Product::Apm => !bucket.is_apm_server(),
        _ => false,
    }
}

/// Membership and skip decision for one instance bucket of one index.
pub fn classify(product: Product, index_key: &str, bucket: &InstanceBucket) -> Classification {
    Classification {
        belongs_to: belongs_to(product, index_key),
        skip: should_skip(product, bucket),
    }
}

/// Index buckets whose key carries the product's token.
pub fn product_index_buckets(product: Product, buckets: &[IndexBucket]) -> Vec<&IndexBucket> {
    buckets
        .iter()
        .filter(|bucket| belongs_to(product, &bucket.key))
        .collect()
}
