//! Ingestion of the raw recent documents aggregation.
//!
//! The search response is loosely shaped JSON. It is validated here, once,
//! into [`IndexBucket`]s; anything missing or ill-typed contributes nothing.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use monitoring_shared_types::{IndexBucket, InstanceBucket};

#[derive(Debug, Deserialize)]
struct RawInstanceBucket {
    key: String,
    #[serde(default)]
    single_type: Option<RawSingleType>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSingleType {
    #[serde(default)]
    by_timestamp: Option<RawMetric>,
    #[serde(default)]
    beat_type: Option<RawTerms>,
    #[serde(default)]
    cluster_uuid: Option<RawTerms>,
}

#[derive(Debug, Deserialize)]
struct RawMetric {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawTerms {
    #[serde(default)]
    buckets: Vec<RawTermsKey>,
}

#[derive(Debug, Deserialize)]
struct RawTermsKey {
    key: String,
}

impl RawTerms {
    fn top_key(self) -> Option<String> {
        self.buckets
            .into_iter()
            .next()
            .map(|bucket| bucket.key)
            .filter(|key| !key.is_empty())
    }
}

impl From<RawInstanceBucket> for InstanceBucket {
    fn from(raw: RawInstanceBucket) -> Self {
        let single_type = raw.single_type.unwrap_or_default();
        InstanceBucket {
            key: raw.key,
            last_seen: single_type
                .by_timestamp
                .and_then(|metric| metric.value)
                .map(|value| value as i64),
            beat_type: single_type.beat_type.and_then(RawTerms::top_key),
            cluster_uuid: single_type.cluster_uuid.and_then(RawTerms::top_key),
        }
    }
}

/// Index buckets of `aggregations.indices.buckets`, each carrying the
/// instance buckets found under `uuid_bucket_name`.
///
/// An index bucket without that nested aggregation is kept with no
/// instances: it still counts as an observed index.
pub fn parse_index_buckets(response: &Value, uuid_bucket_name: &str) -> Vec<IndexBucket> {
    let Some(indices) = response
        .pointer("/aggregations/indices/buckets")
        .and_then(Value::as_array)
    else {
        debug!("Search response has no index buckets");
        return Vec::new();
    };

    indices
        .iter()
        .filter_map(|index| {
            let key = index.get("key").and_then(Value::as_str)?;
            let instances = index
                .get(uuid_bucket_name)
                .and_then(|agg| agg.get("buckets"))
                .and_then(Value::as_array)
                .map(|buckets| buckets.iter().filter_map(parse_instance_bucket).collect())
                .unwrap_or_default();
            Some(IndexBucket::new(key, instances))
        })
        .collect()
}

fn parse_instance_bucket(raw: &Value) -> Option<InstanceBucket> {
    match RawInstanceBucket::deserialize(raw) {
        Ok(bucket) => Some(bucket.into()),
        Err(e) => {
            debug!(error = %e, "Skipping malformed instance bucket");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_aggregations() {
        assert!(parse_index_buckets(&json!({}), "es_uuids").is_empty());
        let no_buckets = json!({ "aggregations": { "indices": {} } });
        assert!(parse_index_buckets(&no_buckets, "es_uuids").is_empty());
    }

    #[test]
    fn test_full_instance_bucket() {
        let response = json!({
            "aggregations": { "indices": { "buckets": [{
                "key": ".monitoring-beats-7-2024.01.01",
                "beats_uuids": { "buckets": [{
                    "key": "b1",
                    "single_type": {
                        "by_timestamp": { "value": 1700000000123.0 },
                        "beat_type": { "buckets": [{ "key": "apm-server" }] },
                        "cluster_uuid": { "buckets": [{ "key": "c1" }] }
                    }
                }] }
            }] } }
        });

        let buckets = parse_index_buckets(&response, "beats_uuids");
        assert_eq!(buckets.len(), 1);
        assert_eq!(
            buckets[0].instances,
            vec![InstanceBucket::new("b1")
                .seen_at(1_700_000_000_123)
                .with_beat_type("apm-server")
                .with_cluster_uuid("c1")]
        );
    }

    #[test]
    fn test_index_without_uuid_agg_is_kept_empty() {
        let response = json!({
            "aggregations": { "indices": { "buckets": [
                { "key": ".monitoring-es-7", "es_uuids": { "buckets": [{ "key": "n1" }] } },
                { "key": ".monitoring-es-7-mb" }
            ] } }
        });

        let buckets = parse_index_buckets(&response, "es_uuids");
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].instances, vec![InstanceBucket::new("n1")]);
        assert!(buckets[1].instances.is_empty());
    }

    #[test]
    fn test_malformed_pieces_are_dropped() {
        let response = json!({
            "aggregations": { "indices": { "buckets": [
                { "no_key": true },
                { "key": ".monitoring-logstash-7", "logstash_uuids": { "buckets": [
                    { "key": 42 },
                    {
                        "key": "l1",
                        "single_type": { "cluster_uuid": { "buckets": [{ "key": "" }] } }
                    }
                ] } }
            ] } }
        });

        let buckets = parse_index_buckets(&response, "logstash_uuids");
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].instances, vec![InstanceBucket::new("l1")]);
    }
}
