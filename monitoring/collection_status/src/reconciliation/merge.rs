//! Merging of live signals into a folded product status.
//!
//! Elasticsearch merges additively: every live node without historical data
//! is added as net-new. Kibana is different: when the requesting instance has
//! no historical record, it replaces the whole `byUuid` map with itself.
//! That asymmetry is intentional compatibility behaviour and is kept as is.

use monitoring_shared_types::{InstanceStatus, LiveKibanaInstance, LiveNode, Product, ProductStatus};
use tracing::debug;

/// Live signals gathered before the fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSignals {
    pub nodes: Vec<LiveNode>,
    pub kibana: Option<LiveKibanaInstance>,
}

/// Returns the number of net-new nodes added.
pub fn merge_live_nodes(status: &mut ProductStatus, nodes: &[LiveNode]) -> usize {
    let mut added = 0;
    for node in nodes {
        if status.by_instance_id.contains_key(&node.id) {
            continue;
        }
        debug!(node_id = %node.id, "Live node without monitoring data");
        status
            .by_instance_id
            .insert(node.id.clone(), InstanceStatus::net_new_node(node.clone()));
        status.total_unique_instance_count += 1;
        added += 1;
    }
    added
}

/// Returns whether the live instance was merged in.
pub fn merge_live_kibana(
    status: &mut ProductStatus,
    instance: Option<&LiveKibanaInstance>,
) -> bool {
    let Some(instance) = instance else {
        return false;
    };
    if instance.uuid.is_empty() || status.by_instance_id.contains_key(&instance.uuid) {
        return false;
    }

    debug!(kibana_uuid = %instance.uuid, "Requesting Kibana has no monitoring data");
    status.total_unique_instance_count += 1;
    status.by_instance_id.clear();
    status
        .by_instance_id
        .insert(instance.uuid.clone(), InstanceStatus::net_new_kibana(instance.clone()));
    true
}

/// Apply whichever live signal exists for `product`.
pub fn merge_live_signals(product: Product, status: &mut ProductStatus, signals: &LiveSignals) {
    match product {
        Product::Elasticsearch => {
            merge_live_nodes(status, &signals.nodes);
        }
        Product::Kibana => {
            merge_live_kibana(status, signals.kibana.as_ref());
        }
        Product::Beats | Product::Logstash | Product::Apm => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn historical(ids: &[&str]) -> ProductStatus {
        let mut status = ProductStatus::default();
        for id in ids {
            status.by_instance_id.insert(
                id.to_string(),
                InstanceStatus {
                    is_internal_collector: true,
                    ..Default::default()
                },
            );
        }
        status.total_unique_instance_count = ids.len();
        status.total_unique_internally_collected_count = ids.len();
        status
    }

    #[test]
    fn test_net_new_node_on_empty_status() {
        let mut status = ProductStatus::default();
        let added = merge_live_nodes(&mut status, &[LiveNode::new("n1")]);
        assert_eq!(added, 1);
        assert_eq!(status.total_unique_instance_count, 1);
        assert!(status.by_instance_id["n1"].is_net_new_user);
        assert_eq!(status.by_instance_id["n1"].node.as_ref().unwrap().id, "n1");
    }

    #[test]
    fn test_known_node_is_left_untouched() {
        let mut status = historical(&["n1"]);
        let before = status.by_instance_id["n1"].clone();
        let added = merge_live_nodes(&mut status, &[LiveNode::new("n1"), LiveNode::new("n2")]);

        assert_eq!(added, 1);
        assert_eq!(status.by_instance_id["n1"], before);
        assert_eq!(status.total_unique_instance_count, 2);
        assert_eq!(status.total_unique_internally_collected_count, 1);
    }

    #[test]
    fn test_unknown_kibana_replaces_map() {
        let mut status = historical(&["k-other-1", "k-other-2"]);
        let live = LiveKibanaInstance::new("k-self");
        assert!(merge_live_kibana(&mut status, Some(&live)));

        assert_eq!(status.by_instance_id.len(), 1);
        assert!(status.by_instance_id["k-self"].is_net_new_user);
        assert_eq!(status.total_unique_instance_count, 3);
    }

    #[test]
    fn test_known_or_missing_kibana_is_noop() {
        let mut status = historical(&["k-self"]);
        assert!(!merge_live_kibana(&mut status, Some(&LiveKibanaInstance::new("k-self"))));
        assert!(!merge_live_kibana(&mut status, Some(&LiveKibanaInstance::new(""))));
        assert!(!merge_live_kibana(&mut status, None));
        assert_eq!(status, historical(&["k-self"]));
    }

    #[test]
    fn test_other_products_get_no_live_merge() {
        let signals = LiveSignals {
            nodes: vec![LiveNode::new("n1")],
            kibana: Some(LiveKibanaInstance::new("k1")),
        };
        for product in [Product::Beats, Product::Logstash, Product::Apm] {
            let mut status = ProductStatus::default();
            merge_live_signals(product, &mut status, &signals);
            assert_eq!(status, ProductStatus::default());
        }

        let mut es = ProductStatus::default();
        merge_live_signals(Product::Elasticsearch, &mut es, &signals);
        assert!(es.by_instance_id.contains_key("n1"));
        assert!(!es.by_instance_id.contains_key("k1"));
    }
}
