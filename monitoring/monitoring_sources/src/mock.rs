//! Mock monitoring sources for testing and development.
//!
//! These provide in-memory implementations that simulate the monitoring
//! cluster without requiring a running Elasticsearch.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use monitoring_shared_types::{
    ClusterUuid, InstanceBucket, LiveKibanaInstance, LiveNode, Result, StatusError,
};
use monitoring_source_interface::{
    LiveClusterSource, LiveKibanaSource, MonitoringSearch, PrivilegeApiError, PrivilegeChecker,
    RecentDocumentsRequest,
};

/// Builds a raw `aggregations.indices.buckets` search response.
#[derive(Debug, Default)]
pub struct AggregationResponseBuilder {
    indices: Vec<(String, Map<String, Value>)>,
}

impl AggregationResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add instance buckets under `uuid_bucket_name` of the index bucket `index_key`.
    pub fn index(
        mut self,
        index_key: &str,
        uuid_bucket_name: &str,
        instances: Vec<InstanceBucket>,
    ) -> Self {
        let buckets: Vec<Value> = instances.iter().map(raw_instance_bucket).collect();
        let position = match self.indices.iter().position(|(key, _)| key == index_key) {
            Some(position) => position,
            None => {
                self.indices.push((index_key.to_string(), Map::new()));
                self.indices.len() - 1
            }
        };
        self.indices[position]
            .1
            .insert(uuid_bucket_name.to_string(), json!({ "buckets": buckets }));
        self
    }

    pub fn build(self) -> Value {
        let buckets: Vec<Value> = self
            .indices
            .into_iter()
            .map(|(key, mut aggs)| {
                aggs.insert("key".to_string(), Value::String(key));
                Value::Object(aggs)
            })
            .collect();
        json!({ "aggregations": { "indices": { "buckets": buckets } } })
    }
}

fn raw_instance_bucket(bucket: &InstanceBucket) -> Value {
    let mut single_type = Map::new();
    single_type.insert(
        "by_timestamp".to_string(),
        json!({ "value": bucket.last_seen }),
    );
    if let Some(beat_type) = &bucket.beat_type {
        single_type.insert(
            "beat_type".to_string(),
            json!({ "buckets": [{ "key": beat_type }] }),
        );
    }
    if let Some(cluster_uuid) = &bucket.cluster_uuid {
        single_type.insert(
            "cluster_uuid".to_string(),
            json!({ "buckets": [{ "key": cluster_uuid }] }),
        );
    }
    json!({ "key": bucket.key, "single_type": single_type })
}

/// Mock monitoring search with a canned aggregation response.
#[derive(Debug, Default)]
pub struct MockMonitoringSearch {
    response: RwLock<Value>,
    /// Probe patterns that report existing documents
    populated_patterns: RwLock<HashSet<String>>,
    last_request: RwLock<Option<RecentDocumentsRequest>>,
    fail_search: AtomicBool,
    fail_probes: AtomicBool,
    search_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl MockMonitoringSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(response: Value) -> Self {
        Self {
            response: RwLock::new(response),
            ..Default::default()
        }
    }

    /// Mark a probe pattern as having documents.
    pub async fn populate(&self, pattern: &str) {
        self.populated_patterns
            .write()
            .await
            .insert(pattern.to_string());
    }

    pub fn set_should_fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn set_should_fail_probes(&self, fail: bool) {
        self.fail_probes.store(fail, Ordering::SeqCst);
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub async fn last_request(&self) -> Option<RecentDocumentsRequest> {
        self.last_request.read().await.clone()
    }
}

#[async_trait]
impl MonitoringSearch for MockMonitoringSearch {
    async fn recent_documents(&self, request: &RecentDocumentsRequest) -> Result<Value> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.write().await = Some(request.clone());
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(StatusError::Search(
                "Simulated monitoring search failure".to_string(),
            ));
        }
        debug!("MockMonitoringSearch: Serving recent documents");
        Ok(self.response.read().await.clone())
    }

    async fn index_has_documents(&self, patterns: &[String]) -> Result<bool> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_probes.load(Ordering::SeqCst) {
            return Err(StatusError::Probe(format!(
                "Simulated probe failure for {}",
                patterns.join(",")
            )));
        }
        let populated = self.populated_patterns.read().await;
        Ok(patterns.iter().any(|pattern| populated.contains(pattern)))
    }
}

/// Mock live cluster with a fixed uuid, node list and settings.
#[derive(Debug, Default)]
pub struct MockLiveCluster {
    cluster_uuid: RwLock<Option<ClusterUuid>>,
    nodes: RwLock<Vec<LiveNode>>,
    settings: RwLock<Value>,
    fail_cluster_uuid: AtomicBool,
    fail_nodes: AtomicBool,
    fail_settings: AtomicBool,
    calls: AtomicUsize,
}

impl MockLiveCluster {
    pub fn new(cluster_uuid: Option<&str>) -> Self {
        Self {
            cluster_uuid: RwLock::new(cluster_uuid.map(str::to_string)),
            settings: RwLock::new(json!({})),
            ..Default::default()
        }
    }

    pub async fn add_node(&self, node: LiveNode) {
        debug!("MockLiveCluster: Adding node {}", node.id);
        self.nodes.write().await.push(node);
    }

    pub async fn set_settings(&self, settings: Value) {
        *self.settings.write().await = settings;
    }

    /// Report internal collection as enabled or disabled through persistent settings.
    pub async fn set_internal_collection(&self, enabled: bool) {
        self.set_settings(json!({
            "persistent": {
                "xpack": { "monitoring": { "elasticsearch": { "collection": {
                    "enabled": enabled.to_string()
                } } } }
            }
        }))
        .await;
    }

    pub fn set_should_fail_cluster_uuid(&self, fail: bool) {
        self.fail_cluster_uuid.store(fail, Ordering::SeqCst);
    }

    pub fn set_should_fail_nodes(&self, fail: bool) {
        self.fail_nodes.store(fail, Ordering::SeqCst);
    }

    pub fn set_should_fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    /// Total number of calls across all live cluster endpoints.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveClusterSource for MockLiveCluster {
    async fn cluster_uuid(&self) -> Result<Option<ClusterUuid>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cluster_uuid.load(Ordering::SeqCst) {
            return Err(StatusError::LiveSignal("Simulated cluster state failure".into()));
        }
        Ok(self.cluster_uuid.read().await.clone())
    }

    async fn live_nodes(&self) -> Result<Vec<LiveNode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_nodes.load(Ordering::SeqCst) {
            return Err(StatusError::LiveSignal("Simulated nodes failure".into()));
        }
        Ok(self.nodes.read().await.clone())
    }

    async fn cluster_settings(&self) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(StatusError::LiveSignal("Simulated settings failure".into()));
        }
        Ok(self.settings.read().await.clone())
    }
}

/// Mock stats collector of the requesting Kibana.
#[derive(Debug, Default)]
pub struct MockLiveKibana {
    instance: RwLock<Option<LiveKibanaInstance>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockLiveKibana {
    pub fn new(instance: Option<LiveKibanaInstance>) -> Self {
        Self {
            instance: RwLock::new(instance),
            ..Default::default()
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveKibanaSource for MockLiveKibana {
    async fn self_instance(&self) -> Result<Option<LiveKibanaInstance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StatusError::LiveSignal("Simulated stats collector failure".into()));
        }
        Ok(self.instance.read().await.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeOutcome {
    Granted,
    Denied,
    /// The privilege API is not present on the cluster
    EndpointMissing,
    Fails,
}

#[derive(Debug)]
pub struct MockPrivilegeChecker {
    security_enabled: bool,
    outcome: PrivilegeOutcome,
    checked: RwLock<Vec<String>>,
}

impl MockPrivilegeChecker {
    pub fn new(security_enabled: bool, outcome: PrivilegeOutcome) -> Self {
        Self {
            security_enabled,
            outcome,
            checked: RwLock::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(true, PrivilegeOutcome::Granted)
    }

    pub fn denied() -> Self {
        Self::new(true, PrivilegeOutcome::Denied)
    }

    /// Privileges requested so far.
    pub async fn checked_privileges(&self) -> Vec<String> {
        self.checked.read().await.clone()
    }
}

#[async_trait]
impl PrivilegeChecker for MockPrivilegeChecker {
    async fn security_enabled(&self) -> bool {
        self.security_enabled
    }

    async fn has_cluster_privilege(&self, privilege: &str) -> Result<bool> {
        self.checked.write().await.push(privilege.to_string());
        match self.outcome {
            PrivilegeOutcome::Granted => Ok(true),
            PrivilegeOutcome::Denied => Ok(false),
            PrivilegeOutcome::EndpointMissing => Err(PrivilegeApiError::MissingHandler.into()),
            PrivilegeOutcome::Fails => {
                Err(PrivilegeApiError::Request("Simulated privilege failure".into()).into())
            }
        }
    }
}
