//! Monitoring sources backed by a recorded JSON fixture.
//!
//! A fixture captures everything one collection-status run reads from the
//! outside world, so a run can be replayed offline:
//!
//! ```json
//! {
//!   "recent_documents": { "aggregations": { "indices": { "buckets": [] } } },
//!   "populated_patterns": ["apm-*"],
//!   "live_cluster_uuid": "abc",
//!   "live_nodes": [{ "id": "n1" }],
//!   "live_kibana": { "uuid": "k1" },
//!   "cluster_settings": {},
//!   "security_enabled": true,
//!   "has_monitor_privilege": true
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

use monitoring_shared_types::{ClusterUuid, LiveKibanaInstance, LiveNode, Result, StatusError};
use monitoring_source_interface::{
    LiveClusterSource, LiveKibanaSource, MonitoringSearch, PrivilegeChecker,
    RecentDocumentsRequest,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFixture {
    /// Raw response of the recent documents search. Absent means the search fails.
    #[serde(default)]
    pub recent_documents: Option<Value>,
    /// Probe patterns that have at least one document.
    #[serde(default)]
    pub populated_patterns: Vec<String>,
    #[serde(default)]
    pub live_cluster_uuid: Option<ClusterUuid>,
    #[serde(default)]
    pub live_nodes: Vec<LiveNode>,
    #[serde(default)]
    pub live_kibana: Option<LiveKibanaInstance>,
    #[serde(default)]
    pub cluster_settings: Value,
    #[serde(default = "default_true")]
    pub security_enabled: bool,
    #[serde(default = "default_true")]
    pub has_monitor_privilege: bool,
}

impl Default for SourceFixture {
    fn default() -> Self {
        Self {
            recent_documents: None,
            populated_patterns: Vec::new(),
            live_cluster_uuid: None,
            live_nodes: Vec::new(),
            live_kibana: None,
            cluster_settings: Value::Null,
            security_enabled: true,
            has_monitor_privilege: true,
        }
    }
}

/// Replays a [`SourceFixture`] through every monitoring source interface.
#[derive(Debug, Clone)]
pub struct FixtureSources {
    fixture: SourceFixture,
    last_search_body: Arc<RwLock<Option<Value>>>,
}

impl FixtureSources {
    pub fn new(fixture: SourceFixture) -> Self {
        Self {
            fixture,
            last_search_body: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let fixture: SourceFixture = serde_json::from_str(content)
            .map_err(|e| StatusError::Fixture(format!("invalid fixture: {}", e)))?;
        Ok(Self::new(fixture))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StatusError::Fixture(format!("{}: {}", path.display(), e)))?;
        let sources = Self::from_json(&content)?;
        info!(fixture = %path.display(), "Loaded monitoring source fixture");
        Ok(sources)
    }

    pub fn fixture(&self) -> &SourceFixture {
        &self.fixture
    }

    /// Body rendered for the most recent search, as a live backend would send it.
    pub async fn last_search_body(&self) -> Option<Value> {
        self.last_search_body.read().await.clone()
    }
}

#[async_trait]
impl MonitoringSearch for FixtureSources {
    async fn recent_documents(&self, request: &RecentDocumentsRequest) -> Result<Value> {
        debug!(indices = ?request.index_patterns, "Replaying recent documents search");
        let body = request.to_search_body();
        trace!(body = %body, "Rendered recent documents search");
        *self.last_search_body.write().await = Some(body);
        self.fixture
            .recent_documents
            .clone()
            .ok_or_else(|| StatusError::Search("fixture has no recent_documents".to_string()))
    }

    async fn index_has_documents(&self, patterns: &[String]) -> Result<bool> {
        Ok(patterns
            .iter()
            .any(|pattern| self.fixture.populated_patterns.contains(pattern)))
    }
}

#[async_trait]
impl LiveClusterSource for FixtureSources {
    async fn cluster_uuid(&self) -> Result<Option<ClusterUuid>> {
        Ok(self.fixture.live_cluster_uuid.clone())
    }

    async fn live_nodes(&self) -> Result<Vec<LiveNode>> {
        Ok(self.fixture.live_nodes.clone())
    }

    async fn cluster_settings(&self) -> Result<Value> {
        Ok(self.fixture.cluster_settings.clone())
    }
}

#[async_trait]
impl LiveKibanaSource for FixtureSources {
    async fn self_instance(&self) -> Result<Option<LiveKibanaInstance>> {
        Ok(self.fixture.live_kibana.clone())
    }
}

#[async_trait]
impl PrivilegeChecker for FixtureSources {
    async fn security_enabled(&self) -> bool {
        self.fixture.security_enabled
    }

    async fn has_cluster_privilege(&self, _privilege: &str) -> Result<bool> {
        Ok(self.fixture.has_monitor_privilege)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let sources = FixtureSources::from_json("{}").unwrap();
        let fixture = sources.fixture();
        assert!(fixture.recent_documents.is_none());
        assert!(fixture.security_enabled);
        assert!(fixture.has_monitor_privilege);
        assert!(fixture.live_nodes.is_empty());
    }

    #[test]
    fn test_invalid_fixture() {
        let err = FixtureSources::from_json("{ not json").unwrap_err();
        assert!(matches!(err, StatusError::Fixture(_)));
    }

    #[tokio::test]
    async fn test_load_and_replay() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "recent_documents": {{ "aggregations": {{ "indices": {{ "buckets": [] }} }} }},
                "populated_patterns": ["apm-*"],
                "live_cluster_uuid": "c1",
                "live_nodes": [{{ "id": "n1", "name": "es-01" }}],
                "live_kibana": {{ "uuid": "k1" }}
            }}"#
        )
        .unwrap();

        let sources = FixtureSources::load(file.path()).await.unwrap();
        let request = RecentDocumentsRequest::for_products(&[], None, 10);
        assert!(sources.recent_documents(&request).await.is_ok());
        assert!(sources.index_has_documents(&["apm-*".to_string()]).await.unwrap());
        assert_eq!(sources.cluster_uuid().await.unwrap().as_deref(), Some("c1"));
        assert_eq!(sources.live_nodes().await.unwrap()[0].name.as_deref(), Some("es-01"));
        assert_eq!(sources.self_instance().await.unwrap().unwrap().uuid, "k1");
    }

    #[tokio::test]
    async fn test_missing_search_response_fails() {
        let sources = FixtureSources::new(SourceFixture::default());
        let request = RecentDocumentsRequest::for_products(&[], None, 10);
        let err = sources.recent_documents(&request).await.unwrap_err();
        assert!(matches!(err, StatusError::Search(_)));
    }

    #[tokio::test]
    async fn test_replay_records_rendered_search_body() {
        let sources = FixtureSources::new(SourceFixture::default());
        assert!(sources.last_search_body().await.is_none());

        let request = RecentDocumentsRequest::for_products(&[], None, 10)
            .with_cluster_uuid(Some("c1".to_string()));
        let _ = sources.recent_documents(&request).await;

        let body = sources.last_search_body().await.unwrap();
        assert_eq!(body["size"], 0);
        assert_eq!(body["query"]["bool"]["filter"][1]["term"]["cluster_uuid"], "c1");
        assert!(body["aggs"]["indices"]["aggs"]["es_uuids"].is_object());
    }
}
