//! Collection-status reconciler.
//!
//! Reports, per monitored product, which instances are collected by the
//! legacy internal path, which by the shipper, and which by both while a
//! migration is under way. Live cluster state fills in instances that have
//! not produced monitoring documents yet.

pub mod permissions;
pub mod reconciliation;
pub mod settings;

use std::sync::Arc;

use monitoring_shared_types::{
    ClusterUuid, InstanceId, LiveKibanaInstance, LiveNode, Product, Result, StatusReport,
};
use monitoring_source_interface::{
    internal_collection_enabled, LiveClusterSource, LiveKibanaSource, MonitoringSearch,
    PrivilegeChecker, RecentDocumentsRequest, TimeRange,
};
use tracing::{debug, info, info_span, warn, Instrument};

use permissions::has_necessary_permissions;
use reconciliation::{reconcile, LiveSignals, ProductDetector, ReconcileInputs};
pub use settings::ReconcilerSettings;

/// The collaborators one reconciliation reads from.
#[derive(Clone)]
pub struct StatusSources {
    pub search: Arc<dyn MonitoringSearch>,
    pub live_cluster: Arc<dyn LiveClusterSource>,
    pub live_kibana: Arc<dyn LiveKibanaSource>,
    pub privileges: Arc<dyn PrivilegeChecker>,
}

impl StatusSources {
    /// All four roles served by one value, as fixtures and test doubles do.
    pub fn from_shared<S>(source: Arc<S>) -> Self
    where
        S: MonitoringSearch + LiveClusterSource + LiveKibanaSource + PrivilegeChecker + 'static,
    {
        Self {
            search: source.clone(),
            live_cluster: source.clone(),
            live_kibana: source.clone(),
            privileges: source,
        }
    }
}

/// Parameters of one collection status run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRequest {
    pub cluster_uuid: Option<ClusterUuid>,
    pub node_uuid: Option<InstanceId>,
    pub time_range: TimeRange,
    pub skip_live_data: bool,
    /// Remote cluster alias for cross-cluster search.
    pub ccs: Option<String>,
}

impl StatusRequest {
    /// Request scoped to a single cluster.
    pub fn for_cluster(cluster_uuid: impl Into<ClusterUuid>) -> Self {
        Self {
            cluster_uuid: Some(cluster_uuid.into()),
            ..Default::default()
        }
    }
}

/// Computes collection status reports from injected sources.
pub struct CollectionStatusService {
    sources: StatusSources,
    settings: ReconcilerSettings,
    detector: ProductDetector,
}

impl CollectionStatusService {
    /// Build a service whose detector probes `settings.detection_targets`.
    pub fn new(sources: StatusSources, settings: ReconcilerSettings) -> Self {
        let detector = ProductDetector::new(settings.detection_targets.clone());
        Self {
            sources,
            settings,
            detector,
        }
    }

    /// Settings the service was built with.
    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Compute the collection status report for `request`.
    ///
    /// Only a failure of the recent documents search is an error. Every other
    /// collaborator degrades to "unknown" and the run carries on.
    pub async fn collection_status(&self, request: &StatusRequest) -> Result<StatusReport> {
        let span = info_span!(
            "collection_status",
            run_id = %uuid::Uuid::new_v4(),
            cluster_uuid = request.cluster_uuid.as_deref().unwrap_or("-"),
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: &StatusRequest) -> Result<StatusReport> {
        if !has_necessary_permissions(self.sources.privileges.as_ref()).await {
            info!("Caller lacks the monitor privilege");
            return Ok(StatusReport::permission_denied());
        }

        let fetch_live = !request.skip_live_data;
        let live_cluster_uuid = if fetch_live {
            self.live_cluster_uuid().await
        } else {
            None
        };
        let is_live_cluster = request.cluster_uuid.is_none()
            || request.cluster_uuid.as_ref() == live_cluster_uuid.as_ref();
        debug!(
            live_cluster_uuid = ?live_cluster_uuid,
            is_live_cluster,
            "Resolved live cluster"
        );

        let search_request = RecentDocumentsRequest::for_products(
            &Product::ALL,
            request.ccs.as_deref(),
            self.settings.max_bucket_size,
        )
        .with_time_range(request.time_range.clone())
        .with_seconds_ago(self.settings.seconds_ago)
        .with_cluster_uuid(request.cluster_uuid.clone())
        .with_node_uuid(request.node_uuid.clone());

        // Live nodes and the requesting Kibana only describe the live cluster
        let merge_live = fetch_live && is_live_cluster;
        let (recent, detected, nodes, kibana, internal_enabled) = tokio::join!(
            self.sources.search.recent_documents(&search_request),
            self.detector.detect(self.sources.search.as_ref(), is_live_cluster),
            self.live_nodes(merge_live),
            self.live_kibana(merge_live),
            self.internal_collection_enabled(fetch_live),
        );
        let recent = recent?;

        let live = LiveSignals { nodes, kibana };
        let inputs = ReconcileInputs {
            settings: &self.settings,
            request_cluster_uuid: request.cluster_uuid.as_deref(),
            live_cluster_uuid: live_cluster_uuid.as_ref(),
            internal_collection_enabled: internal_enabled,
            detected: &detected,
            live: &live,
        };
        let report = reconcile(&recent, &inputs);
        info!(products = report.products.len(), "Collection status computed");
        Ok(report)
    }

    async fn live_cluster_uuid(&self) -> Option<ClusterUuid> {
        match self.sources.live_cluster.cluster_uuid().await {
            Ok(uuid) => uuid,
            Err(e) => {
                warn!(error = %e, "Failed to read live cluster uuid");
                None
            }
        }
    }

    async fn live_nodes(&self, fetch: bool) -> Vec<LiveNode> {
        if !fetch {
            return Vec::new();
        }
        self.sources.live_cluster.live_nodes().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read live nodes");
            Vec::new()
        })
    }

    async fn live_kibana(&self, fetch: bool) -> Option<LiveKibanaInstance> {
        if !fetch {
            return None;
        }
        self.sources.live_kibana.self_instance().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read own Kibana stats");
            None
        })
    }

    async fn internal_collection_enabled(&self, fetch_live: bool) -> Option<bool> {
        if !fetch_live {
            return None;
        }
        match self.sources.live_cluster.cluster_settings().await {
            Ok(settings) => Some(internal_collection_enabled(&settings)),
            Err(e) => {
                warn!(error = %e, "Failed to read cluster settings");
                None
            }
        }
    }
}
