//! Circumstantial product detection.
//!
//! Used for products that produced no monitoring documents. Kibana and
//! Elasticsearch exist by definition; Beats, Logstash and APM are probed for
//! indices they usually leave behind, but only on the live cluster.

use std::collections::BTreeMap;

use monitoring_shared_types::{DetectedProduct, Product};
use monitoring_source_interface::MonitoringSearch;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Index patterns whose documents hint that a product is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionTarget {
    pub product: Product,
    pub patterns: Vec<String>,
}

impl DetectionTarget {
    pub fn new(product: Product, patterns: &[&str]) -> Self {
        Self {
            product,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

pub fn default_detection_targets() -> Vec<DetectionTarget> {
    vec![
        DetectionTarget::new(Product::Beats, &["*beat-*", ".management-beats*"]),
        DetectionTarget::new(Product::Logstash, &["logstash-*", ".logstash*"]),
        DetectionTarget::new(Product::Apm, &["apm-*"]),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedProducts {
    by_product: BTreeMap<Product, DetectedProduct>,
}

impl Default for DetectedProducts {
    fn default() -> Self {
        let by_product = Product::ALL
            .iter()
            .map(|product| {
                let detected = if product.is_self_evident() {
                    DetectedProduct::exists()
                } else {
                    DetectedProduct::might_exist(false)
                };
                (*product, detected)
            })
            .collect();
        Self { by_product }
    }
}

impl DetectedProducts {
    pub fn get(&self, product: Product) -> DetectedProduct {
        self.by_product
            .get(&product)
            .copied()
            .unwrap_or_else(|| DetectedProduct::might_exist(false))
    }

    fn mark_might_exist(&mut self, product: Product) {
        self.by_product
            .insert(product, DetectedProduct::might_exist(true));
    }
}

#[derive(Debug, Clone)]
pub struct ProductDetector {
    targets: Vec<DetectionTarget>,
}

impl Default for ProductDetector {
    fn default() -> Self {
        Self::new(default_detection_targets())
    }
}

impl ProductDetector {
    pub fn new(targets: Vec<DetectionTarget>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[DetectionTarget] {
        &self.targets
    }

    /// Probe the detection targets. Nothing is probed unless `is_live_cluster`.
    pub async fn detect(
        &self,
        search: &dyn MonitoringSearch,
        is_live_cluster: bool,
    ) -> DetectedProducts {
        let mut detected = DetectedProducts::default();
        if !is_live_cluster {
            debug!("Not the live cluster, skipping product detection");
            return detected;
        }

        for target in &self.targets {
            if target.product.is_self_evident() {
                continue;
            }
            match search.index_has_documents(&target.patterns).await {
                Ok(true) => {
                    debug!(product = %target.product, "Detected product indices");
                    detected.mark_might_exist(target.product);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        product = %target.product,
                        error = %e,
                        "Product detection probe failed, treating as not found"
                    );
                }
            }
        }
        detected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitoring_sources::MockMonitoringSearch;

    #[test]
    fn test_defaults() {
        let detected = DetectedProducts::default();
        assert_eq!(detected.get(Product::Kibana), DetectedProduct::exists());
        assert_eq!(detected.get(Product::Elasticsearch), DetectedProduct::exists());
        assert_eq!(detected.get(Product::Apm), DetectedProduct::might_exist(false));
    }

    #[tokio::test]
    async fn test_not_live_never_probes() {
        let search = MockMonitoringSearch::new();
        search.populate("apm-*").await;
        let detected = ProductDetector::default().detect(&search, false).await;

        assert_eq!(detected.get(Product::Apm), DetectedProduct::might_exist(false));
        assert_eq!(search.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_live_probes_each_target() {
        let search = MockMonitoringSearch::new();
        search.populate(".logstash*").await;
        let detected = ProductDetector::default().detect(&search, true).await;

        assert_eq!(search.probe_count(), 3);
        assert_eq!(detected.get(Product::Logstash), DetectedProduct::might_exist(true));
        assert_eq!(detected.get(Product::Beats), DetectedProduct::might_exist(false));
        assert_eq!(detected.get(Product::Kibana), DetectedProduct::exists());
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_found() {
        let search = MockMonitoringSearch::new();
        search.populate("apm-*").await;
        search.set_should_fail_probes(true);
        let detected = ProductDetector::default().detect(&search, true).await;

        assert_eq!(detected.get(Product::Apm), DetectedProduct::might_exist(false));
        assert_eq!(search.probe_count(), 3);
    }

    #[tokio::test]
    async fn test_custom_targets() {
        let search = MockMonitoringSearch::new();
        search.populate("custom-beats-*").await;
        let detector = ProductDetector::new(vec![
            DetectionTarget::new(Product::Beats, &["custom-beats-*"]),
            DetectionTarget::new(Product::Kibana, &[".kibana*"]),
        ]);
        let detected = detector.detect(&search, true).await;

        assert_eq!(detected.get(Product::Beats), DetectedProduct::might_exist(true));
        assert_eq!(search.probe_count(), 1);
    }
}
