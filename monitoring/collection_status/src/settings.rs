//! Runtime settings of the reconciler.

use monitoring_shared_types::{DEFAULT_SECONDS_AGO, SHIPPER_INDEX_TOKEN};

use crate::reconciliation::detect::{default_detection_targets, DetectionTarget};

/// Default size of every per-instance terms aggregation.
pub const DEFAULT_MAX_BUCKET_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    pub max_bucket_size: usize,
    /// Look-back window when the request has no explicit time range.
    pub seconds_ago: u64,
    /// Index-name marker identifying shipper-collected indices.
    pub shipper_token: String,
    /// Uuid of the Kibana instance running the reconciler.
    pub kibana_uuid: Option<String>,
    pub detection_targets: Vec<DetectionTarget>,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            max_bucket_size: DEFAULT_MAX_BUCKET_SIZE,
            seconds_ago: DEFAULT_SECONDS_AGO,
            shipper_token: SHIPPER_INDEX_TOKEN.to_string(),
            kibana_uuid: None,
            detection_targets: default_detection_targets(),
        }
    }
}

impl ReconcilerSettings {
    pub fn with_kibana_uuid(mut self, kibana_uuid: impl Into<String>) -> Self {
        self.kibana_uuid = Some(kibana_uuid.into());
        self
    }
}
