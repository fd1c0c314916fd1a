use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub type InstanceId = String; // node id, kibana/beat/logstash uuid
pub type ClusterUuid = String;

/// Index-name marker left by the lightweight shipper (metricbeat) collection path.
pub const SHIPPER_INDEX_TOKEN: &str = "-mb-";

/// Beat type reported by APM Server when it ships into the beats monitoring indices.
pub const APM_SERVER_BEAT_TYPE: &str = "apm-server";

/// Default look-back window of the recent documents query.
pub const DEFAULT_SECONDS_AGO: u64 = 30;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Monitoring search failed: {0}")]
    Search(String),
    #[error("Existence probe failed: {0}")]
    Probe(String),
    #[error("Live signal unavailable: {0}")]
    LiveSignal(String),
    #[error("Security privilege endpoint unavailable: {0}")]
    SecurityEndpointUnavailable(String),
    #[error("Privilege check failed: {0}")]
    Privilege(String),
    #[error("Fixture error: {0}")]
    Fixture(String),
}

// Monitored products, in the order the reconciler evaluates them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Kibana,
    Beats,
    Logstash,
    Apm,
    Elasticsearch,
}

impl Product {
    pub const ALL: [Product; 5] = [
        Product::Kibana,
        Product::Beats,
        Product::Logstash,
        Product::Apm,
        Product::Elasticsearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Kibana => "kibana",
            Product::Beats => "beats",
            Product::Logstash => "logstash",
            Product::Apm => "apm",
            Product::Elasticsearch => "elasticsearch",
        }
    }

    /// Substring an index key must contain to hold this product's documents.
    pub fn index_token(&self) -> &'static str {
        match self {
            Product::Kibana => "kibana",
            Product::Beats => "beats",
            Product::Logstash => "logstash",
            Product::Apm => "-beats-",
            Product::Elasticsearch => "-es-",
        }
    }

    /// Name of the nested terms aggregation holding per-instance buckets.
    ///
    /// APM and Beats share `beats_uuids` because they share the beats
    /// monitoring indices.
    pub fn uuid_bucket_name(&self) -> &'static str {
        match self {
            Product::Elasticsearch => "es_uuids",
            Product::Kibana => "kibana_uuids",
            Product::Beats | Product::Apm => "beats_uuids",
            Product::Logstash => "logstash_uuids",
        }
    }

    /// Module segment of the legacy `.monitoring-<module>-*` index pattern.
    pub fn legacy_index_module(&self) -> &'static str {
        match self {
            Product::Kibana => "kibana",
            Product::Beats | Product::Apm => "beats",
            Product::Logstash => "logstash",
            Product::Elasticsearch => "es",
        }
    }

    /// Kibana answers the request and Elasticsearch serves it, so both exist by definition.
    pub fn is_self_evident(&self) -> bool {
        matches!(self, Product::Kibana | Product::Elasticsearch)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// One instance bucket nested under an index bucket of the recent documents aggregation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceBucket {
    pub key: InstanceId,
    pub last_seen: Option<i64>, // epoch millis, max(timestamp)
    pub beat_type: Option<String>,
    pub cluster_uuid: Option<ClusterUuid>,
}

impl InstanceBucket {
    pub fn new(key: impl Into<InstanceId>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn seen_at(mut self, timestamp: i64) -> Self {
        self.last_seen = Some(timestamp);
        self
    }

    pub fn with_beat_type(mut self, beat_type: impl Into<String>) -> Self {
        self.beat_type = Some(beat_type.into());
        self
    }

    pub fn with_cluster_uuid(mut self, cluster_uuid: impl Into<ClusterUuid>) -> Self {
        self.cluster_uuid = Some(cluster_uuid.into());
        self
    }

    pub fn is_apm_server(&self) -> bool {
        self.beat_type.as_deref() == Some(APM_SERVER_BEAT_TYPE)
    }
}

// One `_index` bucket and the instance buckets found under it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexBucket {
    pub key: String,
    pub instances: Vec<InstanceBucket>,
}

impl IndexBucket {
    pub fn new(key: impl Into<String>, instances: Vec<InstanceBucket>) -> Self {
        Self {
            key: key.into(),
            instances,
        }
    }

    pub fn is_shipper_collected(&self, shipper_token: &str) -> bool {
        self.key.contains(shipper_token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionState {
    InternalOnly,
    FullyMigrated,
    PartiallyMigrated,
}

// A currently connected Elasticsearch node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveNode {
    pub id: InstanceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl LiveNode {
    pub fn new(id: impl Into<InstanceId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            transport_address: None,
            roles: Vec::new(),
        }
    }
}

// The Kibana instance answering the request, as reported by its own stats collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveKibanaInstance {
    pub uuid: InstanceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl LiveKibanaInstance {
    pub fn new(uuid: impl Into<InstanceId>) -> Self {
        Self {
            uuid: uuid.into(),
            name: None,
            host: None,
            version: None,
            status: None,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Per-instance entry of a product's `byUuid` map.
///
/// Historical instances carry exactly one of the collection flags; live-only
/// instances carry nothing but `isNetNewUser`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_uuid: Option<ClusterUuid>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_internal_collector: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_partially_migrated: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_fully_migrated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_internally_collected_timestamp: Option<i64>,
    pub is_net_new_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<LiveNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<LiveKibanaInstance>,
}

impl InstanceStatus {
    pub fn net_new_node(node: LiveNode) -> Self {
        Self {
            is_net_new_user: true,
            node: Some(node),
            ..Default::default()
        }
    }

    pub fn net_new_kibana(instance: LiveKibanaInstance) -> Self {
        Self {
            is_net_new_user: true,
            instance: Some(instance),
            ..Default::default()
        }
    }

    pub fn collection_state(&self) -> Option<CollectionState> {
        if self.is_fully_migrated {
            Some(CollectionState::FullyMigrated)
        } else if self.is_partially_migrated {
            Some(CollectionState::PartiallyMigrated)
        } else if self.is_internal_collector {
            Some(CollectionState::InternalOnly)
        } else {
            None
        }
    }
}

/// Circumstantial evidence for a product that produced no monitoring documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub does_exist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub might_exist: Option<bool>,
}

impl DetectedProduct {
    pub fn exists() -> Self {
        Self {
            does_exist: Some(true),
            might_exist: None,
        }
    }

    pub fn might_exist(found: bool) -> Self {
        Self {
            does_exist: None,
            might_exist: Some(found),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStatus {
    pub total_unique_instance_count: usize,
    pub total_unique_internally_collected_count: usize,
    pub total_unique_fully_migrated_count: usize,
    pub total_unique_partially_migrated_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected: Option<DetectedProduct>,
    #[serde(rename = "byUuid", default)]
    pub by_instance_id: BTreeMap<InstanceId, InstanceStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    pub seconds_ago: u64,
    pub live_cluster_uuid: Option<ClusterUuid>,
    pub has_permissions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeniedMeta {
    pub has_permissions: bool,
}

// `Run` is listed first so untagged deserialization prefers the richer shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportMeta {
    Run(RunMeta),
    Denied(DeniedMeta),
}

impl ReportMeta {
    pub fn has_permissions(&self) -> bool {
        match self {
            ReportMeta::Run(meta) => meta.has_permissions,
            ReportMeta::Denied(meta) => meta.has_permissions,
        }
    }
}

/// Final collection-status report: one entry per product plus `_meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub products: BTreeMap<Product, ProductStatus>,
    #[serde(rename = "_meta")]
    pub meta: ReportMeta,
}

impl StatusReport {
    pub fn permission_denied() -> Self {
        Self {
            products: BTreeMap::new(),
            meta: ReportMeta::Denied(DeniedMeta {
                has_permissions: false,
            }),
        }
    }

    pub fn has_permissions(&self) -> bool {
        self.meta.has_permissions()
    }

    pub fn product(&self, product: Product) -> Option<&ProductStatus> {
        self.products.get(&product)
    }
}

// Generic result type for collection-status operations
pub type Result<T> = std::result::Result<T, StatusError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_lookup_tables() {
        assert_eq!(Product::Apm.uuid_bucket_name(), Product::Beats.uuid_bucket_name());
        assert_eq!(Product::Elasticsearch.index_token(), "-es-");
        assert_eq!(Product::Apm.legacy_index_module(), "beats");
        assert!(Product::Kibana.is_self_evident());
        assert!(!Product::Logstash.is_self_evident());
    }

    #[test]
    fn test_denied_report_shape() {
        let report = StatusReport::permission_denied();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value, json!({ "_meta": { "hasPermissions": false } }));
    }

    #[test]
    fn test_report_meta_deserializes_both_shapes() {
        let denied: ReportMeta =
            serde_json::from_value(json!({ "hasPermissions": false })).unwrap();
        assert!(matches!(denied, ReportMeta::Denied(_)));

        let run: ReportMeta = serde_json::from_value(json!({
            "secondsAgo": 30,
            "liveClusterUuid": null,
            "hasPermissions": true
        }))
        .unwrap();
        assert!(matches!(run, ReportMeta::Run(_)));
    }

    #[test]
    fn test_net_new_status_serializes_only_net_new_flag() {
        let status = InstanceStatus::net_new_node(LiveNode::new("n1"));
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value, json!({ "isNetNewUser": true, "node": { "id": "n1" } }));
        assert_eq!(status.collection_state(), None);
    }

    #[test]
    fn test_product_keys_serialize_lowercase() {
        let mut report = StatusReport::permission_denied();
        report.products.insert(Product::Apm, ProductStatus::default());
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("apm").is_some());
        assert_eq!(value["apm"]["byUuid"], json!({}));
    }
}
