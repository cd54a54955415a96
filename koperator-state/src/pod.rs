use koperator_core::cluster::BrokerId;
use std::collections::BTreeMap;

use crate::errors::{Result, StateError};

/// Default pod label carrying the broker id.
pub const BROKER_ID_LABEL: &str = "brokerId";

/// The pod running a broker, reduced to what topology changes need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerPod {
    pub broker_id: BrokerId,
    /// Node the pod is scheduled on.
    pub node_name: String,
}

impl BrokerPod {
    pub fn new(broker_id: BrokerId, node_name: impl Into<String>) -> Self {
        BrokerPod {
            broker_id,
            node_name: node_name.into(),
        }
    }

    /// Reads the broker id from the `label_key` pod label.
    pub fn from_labels(
        node_name: impl Into<String>,
        labels: &BTreeMap<String, String>,
        label_key: &str,
    ) -> Result<Self> {
        let value = labels.get(label_key);
        let broker_id = value
            .and_then(|value| value.parse::<BrokerId>().ok())
            .ok_or_else(|| StateError::InvalidBrokerLabel {
                label: label_key.to_string(),
                value: value.cloned(),
            })?;
        Ok(BrokerPod::new(broker_id, node_name))
    }
}
