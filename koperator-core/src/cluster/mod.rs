mod affinity;
pub use affinity::{
    NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, SelectorOperator,
};

mod broker_id;
pub use broker_id::BrokerId;

mod status;
pub use status::{
    BrokerState, ClusterStatus, CruiseControlState, CruiseControlTopicStatus, GracefulActionState,
    RackAwarenessState,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker configuration key holding the rack of a broker.
pub const RACK_CONFIG_KEY: &str = "broker.rack";

/// Identity of a record in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub name: String,
    pub namespace: String,
}

impl ObjectKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        ObjectKey {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Kind and version tag of a record. The store does not hand it back on
/// writes, while owner references built from the record need it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl TypeMeta {
    pub fn is_empty(&self) -> bool {
        self.api_version.is_empty() && self.kind.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    /// Optimistic concurrency token, assigned by the store on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<u64>,
}

/// The persisted root object describing one managed cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ClusterSpec,
    #[serde(default)]
    pub status: ClusterStatus,
}

impl ClusterRecord {
    pub fn new(key: &ObjectKey, type_meta: TypeMeta) -> Self {
        ClusterRecord {
            type_meta,
            metadata: ObjectMeta {
                name: key.name.clone(),
                namespace: key.namespace.clone(),
                resource_version: None,
            },
            spec: ClusterSpec::default(),
            status: ClusterStatus::default(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.metadata.name, &self.metadata.namespace)
    }
}

/// Desired state of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(rename = "brokerConfigs", default)]
    pub brokers: Vec<BrokerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_awareness: Option<RackAwareness>,
}

impl ClusterSpec {
    pub fn broker(&self, broker_id: BrokerId) -> Option<&BrokerConfig> {
        self.brokers.iter().find(|broker| broker.id == broker_id)
    }

    pub fn broker_mut(&mut self, broker_id: BrokerId) -> Option<&mut BrokerConfig> {
        self.brokers.iter_mut().find(|broker| broker.id == broker_id)
    }

    pub fn contains_broker(&self, broker_id: BrokerId) -> bool {
        self.broker(broker_id).is_some()
    }

    /// Removes every entry with the given id, keeping the order of the rest.
    /// Returns false when no broker matched.
    pub fn remove_broker(&mut self, broker_id: BrokerId) -> bool {
        let before = self.brokers.len();
        self.brokers.retain(|broker| broker.id != broker_id);
        self.brokers.len() != before
    }
}

/// Node label keys whose values make up the rack of a broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackAwareness {
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Declarative configuration of one cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConfig {
    pub id: BrokerId,
    /// Line oriented `key=value` broker configuration.
    #[serde(default)]
    pub config: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_affinity: Option<NodeAffinity>,
    #[serde(default)]
    pub storage_configs: Vec<StorageConfig>,
}

impl BrokerConfig {
    pub fn new(id: BrokerId) -> Self {
        BrokerConfig {
            id,
            config: String::new(),
            node_affinity: None,
            storage_configs: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage_configs.push(storage);
        self
    }

    /// Value of the first `key=value` line for `key`.
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.lines().find_map(|line| {
            let (line_key, value) = line.trim().split_once('=')?;
            (line_key.trim() == key).then(|| value.trim())
        })
    }

    /// Appends `key=value` unless a line for `key` already exists.
    pub fn append_config_entry(&mut self, key: &str, value: &str) -> bool {
        if self.config_value(key).is_some() {
            return false;
        }
        if !self.config.is_empty() && !self.config.ends_with('\n') {
            self.config.push('\n');
        }
        self.config.push_str(&format!("{}={}\n", key, value));
        true
    }

    pub fn set_node_affinity(&mut self, affinity: NodeAffinity) -> bool {
        if self.node_affinity.as_ref() == Some(&affinity) {
            return false;
        }
        self.node_affinity = Some(affinity);
        true
    }
}

/// One storage volume attached to a broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub mount_path: String,
    /// Requested capacity, e.g. `10Gi`.
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl StorageConfig {
    pub fn new(mount_path: impl Into<String>, size: impl Into<String>) -> Self {
        StorageConfig {
            mount_path: mount_path.into(),
            size: size.into(),
            storage_class: None,
        }
    }
}
