use anyhow::{anyhow, Context, Result};
use koperator_core::cluster::ObjectKey;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;

use crate::pod::BROKER_ID_LABEL;
use crate::rack_affinity::DEFAULT_FAILURE_DOMAIN_LABELS;

const DEFAULT_ALERT_RETENTION_SECS: u64 = 300;

/// configuration settings loaded from the config file
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadConfiguration {
    /// Name of the managed cluster record
    pub cluster_name: String,
    /// Namespace of the managed cluster record
    pub namespace: String,
    /// Pod label carrying the broker id (defaults to `brokerId`)
    #[serde(default)]
    pub broker_id_label: Option<String>,
    /// Node labels describing a failure domain, most significant first
    #[serde(default)]
    pub failure_domain_labels: Option<Vec<String>>,
    /// How long resolved alerts are kept before garbage collection
    #[serde(default)]
    pub alert_retention_secs: Option<u64>,
}

/// validated settings of the broker state engine
#[derive(Debug, Clone, PartialEq)]
pub struct StateConfiguration {
    pub cluster: ObjectKey,
    pub broker_id_label: String,
    pub failure_domain_labels: Vec<String>,
    pub alert_retention: Duration,
}

impl StateConfiguration {
    /// Loads the configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let load_config: LoadConfiguration =
            serde_yaml::from_str(content).context("Failed to parse configuration")?;
        load_config.try_into()
    }
}

/// Implementing the TryFrom trait to transform LoadConfiguration into StateConfiguration
impl TryFrom<LoadConfiguration> for StateConfiguration {
    type Error = anyhow::Error;

    fn try_from(config: LoadConfiguration) -> Result<Self> {
        if config.cluster_name.trim().is_empty() {
            return Err(anyhow!("cluster_name must not be empty"));
        }
        if config.namespace.trim().is_empty() {
            return Err(anyhow!("namespace must not be empty"));
        }

        let broker_id_label = config
            .broker_id_label
            .unwrap_or_else(|| BROKER_ID_LABEL.to_string());
        if broker_id_label.trim().is_empty() {
            return Err(anyhow!("broker_id_label must not be empty"));
        }

        let failure_domain_labels = config.failure_domain_labels.unwrap_or_else(|| {
            DEFAULT_FAILURE_DOMAIN_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect()
        });
        if let Some(label) = failure_domain_labels.iter().find(|l| l.trim().is_empty()) {
            return Err(anyhow!("invalid failure domain label: {:?}", label));
        }

        Ok(StateConfiguration {
            cluster: ObjectKey::new(config.cluster_name, config.namespace),
            broker_id_label,
            failure_domain_labels,
            alert_retention: Duration::from_secs(
                config
                    .alert_retention_secs
                    .unwrap_or(DEFAULT_ALERT_RETENTION_SECS),
            ),
        })
    }
}
