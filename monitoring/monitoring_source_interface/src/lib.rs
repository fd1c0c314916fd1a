//! Collaborator interfaces for the collection-status reconciler.
//!
//! Every external input the reconciler consumes (the monitoring search, live
//! cluster signals, the requesting Kibana's own stats and the privilege
//! check) is expressed as a trait here and injected explicitly.

pub mod request;
pub mod settings;

use async_trait::async_trait;
use monitoring_shared_types::{ClusterUuid, LiveKibanaInstance, LiveNode, Result, StatusError};

pub use request::{legacy_index_pattern, RecentDocumentsRequest, TimeRange};
pub use settings::internal_collection_enabled;

/// Cluster privilege required to read monitoring data.
pub const MONITOR_PRIVILEGE: &str = "monitor";

/// Search access to the monitoring indices.
#[async_trait]
pub trait MonitoringSearch: Send + Sync {
    /// Run the recent documents aggregation and return the raw response body.
    async fn recent_documents(&self, request: &RecentDocumentsRequest) -> Result<serde_json::Value>;
    /// Whether at least one document exists in any index matching `patterns`.
    /// Missing indices must count as "no documents", not as an error.
    async fn index_has_documents(&self, patterns: &[String]) -> Result<bool>;
}

/// Live view of the Elasticsearch cluster this Kibana is connected to.
#[async_trait]
pub trait LiveClusterSource: Send + Sync {
    async fn cluster_uuid(&self) -> Result<Option<ClusterUuid>>;
    async fn live_nodes(&self) -> Result<Vec<LiveNode>>;
    /// Raw `_cluster/settings?include_defaults` response.
    async fn cluster_settings(&self) -> Result<serde_json::Value>;
}

/// The Kibana instance answering the request.
#[async_trait]
pub trait LiveKibanaSource: Send + Sync {
    /// `None` when the stats collector is not ready yet.
    async fn self_instance(&self) -> Result<Option<LiveKibanaInstance>>;
}

#[async_trait]
pub trait PrivilegeChecker: Send + Sync {
    async fn security_enabled(&self) -> bool;
    /// Errors with [`StatusError::SecurityEndpointUnavailable`] when the
    /// privilege API itself does not exist on the cluster.
    async fn has_cluster_privilege(&self, privilege: &str) -> Result<bool>;
}

// Specific failures of the privilege API as reported by the cluster
#[derive(Debug, thiserror::Error)]
pub enum PrivilegeApiError {
    #[error("no handler found for uri [/_security/user/_has_privileges] and method [POST]")]
    MissingHandler,
    #[error("Invalid index name [_security]")]
    InvalidSecurityIndex,
    #[error("privilege request failed: {0}")]
    Request(String),
}

impl From<PrivilegeApiError> for StatusError {
    fn from(err: PrivilegeApiError) -> Self {
        match err {
            PrivilegeApiError::MissingHandler | PrivilegeApiError::InvalidSecurityIndex => {
                StatusError::SecurityEndpointUnavailable(err.to_string())
            }
            PrivilegeApiError::Request(msg) => StatusError::Privilege(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_api_error_mapping() {
        let err: StatusError = PrivilegeApiError::MissingHandler.into();
        assert!(matches!(err, StatusError::SecurityEndpointUnavailable(_)));

        let err: StatusError = PrivilegeApiError::InvalidSecurityIndex.into();
        assert!(matches!(err, StatusError::SecurityEndpointUnavailable(_)));

        let err: StatusError = PrivilegeApiError::Request("timeout".into()).into();
        assert!(matches!(err, StatusError::Privilege(ref msg) if msg == "timeout"));
    }
}
