//! Descriptor of the recent monitoring documents search.
//!
//! The reconciler hands this descriptor to [`crate::MonitoringSearch`]; a
//! search implementation may render it with [`RecentDocumentsRequest::to_search_body`].

use monitoring_shared_types::{ClusterUuid, InstanceId, Product, DEFAULT_SECONDS_AGO};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Number of `_index` buckets requested from the aggregation.
const MAX_INDEX_BUCKETS: usize = 50;

/// Date-math bounds of the query window. Unset bounds fall back to the
/// default look-back window ending now.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

impl TimeRange {
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    pub fn start(&self, seconds_ago: u64) -> String {
        self.min
            .clone()
            .unwrap_or_else(|| format!("now-{}s", seconds_ago))
    }

    pub fn end(&self) -> String {
        self.max.clone().unwrap_or_else(|| "now".to_string())
    }
}

/// Legacy monitoring index pattern for a product, prefixed for cross-cluster search.
pub fn legacy_index_pattern(product: Product, ccs: Option<&str>) -> String {
    let pattern = format!(".monitoring-{}-*", product.legacy_index_module());
    match ccs {
        Some(remote) if !remote.is_empty() => format!("{}:{}", remote, pattern),
        _ => pattern,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDocumentsRequest {
    pub index_patterns: Vec<String>,
    pub time_range: TimeRange,
    pub seconds_ago: u64,
    pub cluster_uuid: Option<ClusterUuid>,
    pub node_uuid: Option<InstanceId>,
    /// Size of every per-instance terms aggregation.
    pub size: usize,
}

impl RecentDocumentsRequest {
    pub fn for_products(products: &[Product], ccs: Option<&str>, size: usize) -> Self {
        let mut index_patterns: Vec<String> = Vec::with_capacity(products.len());
        for product in products {
            let pattern = legacy_index_pattern(*product, ccs);
            if !index_patterns.contains(&pattern) {
                index_patterns.push(pattern);
            }
        }
        Self {
            index_patterns,
            time_range: TimeRange::default(),
            seconds_ago: DEFAULT_SECONDS_AGO,
            cluster_uuid: None,
            node_uuid: None,
            size,
        }
    }

    /// Query window bounds; unset bounds use `seconds_ago`.
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    /// Look-back used when the window has no start.
    pub fn with_seconds_ago(mut self, seconds_ago: u64) -> Self {
        self.seconds_ago = seconds_ago;
        self
    }

    /// Restrict documents to one cluster.
    pub fn with_cluster_uuid(mut self, cluster_uuid: Option<ClusterUuid>) -> Self {
        self.cluster_uuid = cluster_uuid;
        self
    }

    /// Restrict documents to one instance of any product.
    pub fn with_node_uuid(mut self, node_uuid: Option<InstanceId>) -> Self {
        self.node_uuid = node_uuid;
        self
    }

    /// Search body: a zero-hit query whose `indices` aggregation splits by
    /// `_index` and then by instance uuid for every product family.
    ///
    /// Backends that talk to a real document store send this as the request
    /// body; the fixture backend records it.
    pub fn to_search_body(&self) -> Value {
        let mut filters = vec![json!({
            "range": {
                "timestamp": {
                    "gte": self.time_range.start(self.seconds_ago),
                    "lte": self.time_range.end(),
                }
            }
        })];
        if let Some(cluster_uuid) = &self.cluster_uuid {
            filters.push(json!({ "term": { "cluster_uuid": cluster_uuid } }));
        }

        let mut bool_query = Map::new();
        bool_query.insert("filter".to_string(), Value::Array(filters));
        if let Some(node_uuid) = &self.node_uuid {
            bool_query.insert(
                "must".to_string(),
                json!([{
                    "bool": {
                        "should": [
                            { "term": { "node_stats.node_id": node_uuid } },
                            { "term": { "kibana_stats.kibana.uuid": node_uuid } },
                            { "term": { "beats_stats.beat.uuid": node_uuid } },
                            { "term": { "logstash_stats.logstash.uuid": node_uuid } },
                        ]
                    }
                }]),
            );
        }

        let size = self.size;
        let cluster_terms = json!({ "terms": { "field": "cluster_uuid", "size": size } });
        let beat_type_terms =
            json!({ "terms": { "field": "beats_stats.beat.type", "size": size } });

        json!({
            "size": 0,
            "query": { "bool": bool_query },
            "aggs": {
                "indices": {
                    "terms": { "field": "_index", "size": MAX_INDEX_BUCKETS },
                    "aggs": {
                        "es_uuids": uuid_agg(
                            "node_stats.node_id",
                            "node_stats",
                            "node_stats",
                            size,
                            &[],
                        ),
                        "kibana_uuids": uuid_agg(
                            "kibana_stats.kibana.uuid",
                            "kibana_stats",
                            "stats",
                            size,
                            &[],
                        ),
                        "beats_uuids": uuid_agg(
                            "beats_stats.beat.uuid",
                            "beats_stats",
                            "beats_stats",
                            size,
                            &[
                                ("beat_type", beat_type_terms),
                                ("cluster_uuid", cluster_terms.clone()),
                            ],
                        ),
                        "logstash_uuids": uuid_agg(
                            "logstash_stats.logstash.uuid",
                            "logstash_stats",
                            "stats",
                            size,
                            &[("cluster_uuid", cluster_terms)],
                        ),
                    }
                }
            }
        })
    }
}

fn uuid_agg(
    field: &str,
    doc_type: &str,
    metricset: &str,
    size: usize,
    extra: &[(&str, Value)],
) -> Value {
    let mut single_type_aggs = Map::new();
    single_type_aggs.insert(
        "by_timestamp".to_string(),
        json!({ "max": { "field": "timestamp" } }),
    );
    for (name, agg) in extra {
        single_type_aggs.insert((*name).to_string(), agg.clone());
    }

    json!({
        "terms": { "field": field, "size": size },
        "aggs": {
            "single_type": {
                "filter": {
                    "bool": {
                        "should": [
                            { "term": { "type": doc_type } },
                            { "term": { "metricset.name": metricset } },
                        ]
                    }
                },
                "aggs": single_type_aggs,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_index_pattern() {
        assert_eq!(legacy_index_pattern(Product::Elasticsearch, None), ".monitoring-es-*");
        assert_eq!(legacy_index_pattern(Product::Apm, None), ".monitoring-beats-*");
        assert_eq!(
            legacy_index_pattern(Product::Kibana, Some("remote")),
            "remote:.monitoring-kibana-*"
        );
        assert_eq!(legacy_index_pattern(Product::Logstash, Some("")), ".monitoring-logstash-*");
    }

    #[test]
    fn test_default_window() {
        let request = RecentDocumentsRequest::for_products(&Product::ALL, None, 100);
        let body = request.to_search_body();
        let range = &body["query"]["bool"]["filter"][0]["range"]["timestamp"];
        assert_eq!(range["gte"], "now-30s");
        assert_eq!(range["lte"], "now");
        assert!(body["query"]["bool"].get("must").is_none());
        assert_eq!(request.index_patterns.len(), 4);
        assert_eq!(request.index_patterns.iter().filter(|p| p.contains("beats")).count(), 1);
    }

    #[test]
    fn test_filters_for_cluster_and_node() {
        let body = RecentDocumentsRequest::for_products(&Product::ALL, None, 10)
            .with_time_range(TimeRange::new("now-1h", "now-5m"))
            .with_cluster_uuid(Some("c1".into()))
            .with_node_uuid(Some("n1".into()))
            .to_search_body();

        let filters = body["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0]["range"]["timestamp"]["gte"], "now-1h");
        assert_eq!(filters[1]["term"]["cluster_uuid"], "c1");

        let should = &body["query"]["bool"]["must"][0]["bool"]["should"];
        assert_eq!(should.as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_beats_aggregation_carries_type_and_cluster() {
        let body = RecentDocumentsRequest::for_products(&Product::ALL, None, 7).to_search_body();
        let beats = &body["aggs"]["indices"]["aggs"]["beats_uuids"];
        assert_eq!(beats["terms"]["size"], 7);
        let sub = &beats["aggs"]["single_type"]["aggs"];
        assert!(sub.get("by_timestamp").is_some());
        assert!(sub.get("beat_type").is_some());
        assert!(sub.get("cluster_uuid").is_some());

        let es = &body["aggs"]["indices"]["aggs"]["es_uuids"]["aggs"]["single_type"]["aggs"];
        assert!(es.get("cluster_uuid").is_none());
    }
}
