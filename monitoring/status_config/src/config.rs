//! TOML-backed reconciler configuration.

use std::path::Path;

use collection_status::reconciliation::{default_detection_targets, DetectionTarget};
use collection_status::settings::DEFAULT_MAX_BUCKET_SIZE;
use collection_status::ReconcilerSettings;
use monitoring_shared_types::{DEFAULT_SECONDS_AGO, SHIPPER_INDEX_TOKEN};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_max_bucket_size")]
    pub max_bucket_size: usize,

    #[serde(default = "default_seconds_ago")]
    pub seconds_ago: u64,

    #[serde(default = "default_shipper_token")]
    pub shipper_token: String,

    /// Uuid of the Kibana instance the report is produced for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kibana_uuid: Option<String>,

    /// Remote cluster alias used for cross-cluster search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccs: Option<String>,

    #[serde(default = "default_detection_targets", rename = "detection")]
    pub detection_targets: Vec<DetectionTarget>,
}

fn default_max_bucket_size() -> usize {
    DEFAULT_MAX_BUCKET_SIZE
}

fn default_seconds_ago() -> u64 {
    DEFAULT_SECONDS_AGO
}

fn default_shipper_token() -> String {
    SHIPPER_INDEX_TOKEN.to_string()
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            max_bucket_size: default_max_bucket_size(),
            seconds_ago: default_seconds_ago(),
            shipper_token: default_shipper_token(),
            kibana_uuid: None,
            ccs: None,
            detection_targets: default_detection_targets(),
        }
    }
}

impl StatusConfig {
    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "Loaded status configuration");
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = self.to_toml()?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_bucket_size == 0 {
            return Err(ConfigError::validation("max_bucket_size must be positive"));
        }
        if self.seconds_ago == 0 {
            return Err(ConfigError::validation("seconds_ago must be positive"));
        }
        if self.shipper_token.is_empty() {
            return Err(ConfigError::validation("shipper_token must not be empty"));
        }
        for target in &self.detection_targets {
            if target.patterns.iter().any(|pattern| pattern.trim().is_empty()) {
                return Err(ConfigError::validation(format!(
                    "detection patterns for {} must not be empty",
                    target.product
                )));
            }
        }
        Ok(())
    }

    pub fn to_settings(&self) -> ReconcilerSettings {
        self.clone().into()
    }
}

impl From<StatusConfig> for ReconcilerSettings {
    fn from(config: StatusConfig) -> Self {
        Self {
            max_bucket_size: config.max_bucket_size,
            seconds_ago: config.seconds_ago,
            shipper_token: config.shipper_token,
            kibana_uuid: config.kibana_uuid,
            detection_targets: config.detection_targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitoring_shared_types::Product;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = StatusConfig::from_toml("").unwrap();
        assert_eq!(config, StatusConfig::default());
        assert_eq!(config.to_settings(), ReconcilerSettings::default());
    }

    #[test]
    fn test_partial_file() {
        let config = StatusConfig::from_toml(
            r#"
            seconds_ago = 120
            kibana_uuid = "k-self"

            [[detection]]
            product = "logstash"
            patterns = ["custom-logstash-*"]
            "#,
        )
        .unwrap();

        assert_eq!(config.seconds_ago, 120);
        assert_eq!(config.max_bucket_size, 10_000);
        assert_eq!(config.shipper_token, "-mb-");
        assert_eq!(config.detection_targets.len(), 1);
        assert_eq!(config.detection_targets[0].product, Product::Logstash);

        let settings: ReconcilerSettings = config.into();
        assert_eq!(settings.kibana_uuid.as_deref(), Some("k-self"));
    }

    #[test]
    fn test_validation() {
        let err = StatusConfig::from_toml("max_bucket_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = StatusConfig::from_toml("shipper_token = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = StatusConfig::from_toml(
            "[[detection]]\nproduct = \"apm\"\npatterns = [\" \"]",
        )
        .unwrap_err();
        assert!(err.to_string().contains("apm"));

        let err = StatusConfig::from_toml("seconds_ago = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.toml");

        let mut config = StatusConfig::default();
        config.ccs = Some("remote".to_string());
        config.save(&path).await.unwrap();

        let loaded = StatusConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = StatusConfig::load(dir.path().join("absent.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));

        let config = StatusConfig::load_or_default(None).await.unwrap();
        assert_eq!(config, StatusConfig::default());
    }
}
