//! Interpretation of the live cluster settings response.

use serde_json::Value;

const SETTING_SOURCES: [&str; 3] = ["persistent", "transient", "defaults"];
const COLLECTION_PATH: [&str; 5] =
    ["xpack", "monitoring", "elasticsearch", "collection", "enabled"];

/// Whether internal collection is enabled in any settings source.
///
/// Settings may come back nested or with flat dotted keys; both are accepted.
/// The settings API reports values as strings; a boolean `true` is accepted too.
pub fn internal_collection_enabled(settings: &Value) -> bool {
    SETTING_SOURCES.iter().any(|source| {
        settings
            .get(source)
            .and_then(|section| lookup(section, &COLLECTION_PATH))
            .map(|value| value.as_str() == Some("true") || value.as_bool() == Some(true))
            .unwrap_or(false)
    })
}

// Resolve a path where any prefix of segments may be joined with dots
fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let object = value.as_object()?;
    (1..=path.len()).find_map(|take| {
        let key = path[..take].join(".");
        object.get(&key).and_then(|child| lookup(child, &path[take..]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_persistent_setting() {
        let collection = json!({ "collection": { "enabled": "true" } });
        let settings = json!({
            "persistent": { "xpack": { "monitoring": { "elasticsearch": collection } } }
        });
        assert!(internal_collection_enabled(&settings));
    }

    #[test]
    fn test_dotted_default_setting() {
        let settings = json!({
            "defaults": { "xpack.monitoring.elasticsearch.collection.enabled": "true" }
        });
        assert!(internal_collection_enabled(&settings));
    }

    #[test]
    fn test_disabled_or_missing() {
        assert!(!internal_collection_enabled(&json!({})));
        let collection = json!({ "collection": { "enabled": "false" } });
        let settings = json!({
            "transient": { "xpack": { "monitoring": { "elasticsearch": collection } } },
            "defaults": { "xpack.monitoring.collection.enabled": "true" }
        });
        assert!(!internal_collection_enabled(&settings));
    }
}
