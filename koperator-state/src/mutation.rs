use koperator_core::cluster::{
    BrokerConfig, BrokerId, ClusterRecord, CruiseControlTopicStatus, GracefulActionState,
    NodeAffinity, RackAwarenessState, StorageConfig, RACK_CONFIG_KEY,
};
use std::fmt;

use crate::errors::{Result, StateError};

/// Path a mutation is persisted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// Status subresource, falling back to a whole-object write when the
    /// subresource does not exist.
    Status,
    /// Whole-object write.
    Object,
}

/// One logical change to a cluster record.
///
/// Applying a mutation is pure and can be repeated on a freshly fetched record
/// after a write conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterMutation {
    RackAwareness {
        broker_id: BrokerId,
        state: RackAwarenessState,
    },
    GracefulAction {
        broker_id: BrokerId,
        state: GracefulActionState,
    },
    TopicStatus(CruiseControlTopicStatus),
    DeleteBrokerState(BrokerId),
    AddBroker(BrokerConfig),
    RemoveBroker(BrokerId),
    AddStorage {
        broker_id: BrokerId,
        storage: StorageConfig,
    },
    NodeAffinity {
        broker_id: BrokerId,
        affinity: NodeAffinity,
    },
    RackConfig {
        broker_id: BrokerId,
        rack: String,
    },
}

impl ClusterMutation {
    pub fn target(&self) -> WriteTarget {
        match self {
            ClusterMutation::RackAwareness { .. }
            | ClusterMutation::GracefulAction { .. }
            | ClusterMutation::TopicStatus(_)
            | ClusterMutation::DeleteBrokerState(_) => WriteTarget::Status,
            ClusterMutation::AddBroker(_)
            | ClusterMutation::RemoveBroker(_)
            | ClusterMutation::AddStorage { .. }
            | ClusterMutation::NodeAffinity { .. }
            | ClusterMutation::RackConfig { .. } => WriteTarget::Object,
        }
    }

    pub fn broker_id(&self) -> Option<BrokerId> {
        match self {
            ClusterMutation::RackAwareness { broker_id, .. }
            | ClusterMutation::GracefulAction { broker_id, .. }
            | ClusterMutation::AddStorage { broker_id, .. }
            | ClusterMutation::NodeAffinity { broker_id, .. }
            | ClusterMutation::RackConfig { broker_id, .. } => Some(*broker_id),
            ClusterMutation::DeleteBrokerState(broker_id)
            | ClusterMutation::RemoveBroker(broker_id) => Some(*broker_id),
            ClusterMutation::AddBroker(broker) => Some(broker.id),
            ClusterMutation::TopicStatus(_) => None,
        }
    }

    /// Name of the record field the mutation changes.
    pub fn field(&self) -> &'static str {
        match self {
            ClusterMutation::RackAwareness { .. } => "rackAwarenessState",
            ClusterMutation::GracefulAction { .. } => "gracefulActionState",
            ClusterMutation::TopicStatus(_) => "cruiseControlTopicStatus",
            ClusterMutation::DeleteBrokerState(_) => "brokersState",
            ClusterMutation::AddBroker(_) | ClusterMutation::RemoveBroker(_) => "brokerConfigs",
            ClusterMutation::AddStorage { .. } => "storageConfigs",
            ClusterMutation::NodeAffinity { .. } => "nodeAffinity",
            ClusterMutation::RackConfig { .. } => "config",
        }
    }

    /// New value of the field, or the removed broker for deletions.
    pub fn value(&self) -> String {
        match self {
            ClusterMutation::RackAwareness { state, .. } => state.to_string(),
            ClusterMutation::GracefulAction { state, .. } => state.to_string(),
            ClusterMutation::TopicStatus(status) => status.to_string(),
            ClusterMutation::DeleteBrokerState(broker_id)
            | ClusterMutation::RemoveBroker(broker_id) => broker_id.to_string(),
            ClusterMutation::AddBroker(broker) => broker.id.to_string(),
            ClusterMutation::AddStorage { storage, .. } => {
                format!("{}:{}", storage.mount_path, storage.size)
            }
            ClusterMutation::NodeAffinity { affinity, .. } => {
                let terms = affinity.required.as_ref().map_or(0, |s| s.terms.len());
                format!("{} required node selector terms", terms)
            }
            ClusterMutation::RackConfig { rack, .. } => format!("{}={}", RACK_CONFIG_KEY, rack),
        }
    }

    /// Applies the change to `cluster` and reports whether anything changed.
    /// Changes aimed at a broker missing from the spec leave the record untouched.
    pub fn apply(&self, cluster: &mut ClusterRecord) -> Result<bool> {
        let changed = match self {
            ClusterMutation::RackAwareness { broker_id, state } => {
                cluster.status.set_rack_awareness(*broker_id, *state)
            }
            ClusterMutation::GracefulAction { broker_id, state } => {
                cluster.status.set_graceful_action(*broker_id, state.clone())
            }
            ClusterMutation::TopicStatus(status) => cluster.status.set_topic_status(*status),
            ClusterMutation::DeleteBrokerState(broker_id) => {
                cluster.status.remove_broker_state(*broker_id)
            }
            ClusterMutation::AddBroker(broker) => {
                if cluster.spec.contains_broker(broker.id) {
                    return Err(StateError::DuplicateBroker(broker.id));
                }
                cluster.spec.brokers.push(broker.clone());
                true
            }
            ClusterMutation::RemoveBroker(broker_id) => cluster.spec.remove_broker(*broker_id),
            ClusterMutation::AddStorage { broker_id, storage } => {
                match cluster.spec.broker_mut(*broker_id) {
                    Some(broker) => {
                        broker.storage_configs.push(storage.clone());
                        true
                    }
                    None => false,
                }
            }
            ClusterMutation::NodeAffinity {
                broker_id,
                affinity,
            } => cluster
                .spec
                .broker_mut(*broker_id)
                .is_some_and(|broker| broker.set_node_affinity(affinity.clone())),
            ClusterMutation::RackConfig { broker_id, rack } => cluster
                .spec
                .broker_mut(*broker_id)
                .is_some_and(|broker| broker.append_config_entry(RACK_CONFIG_KEY, rack)),
        };
        Ok(changed)
    }
}

impl fmt::Display for ClusterMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterMutation::RackAwareness { broker_id, state } => {
                write!(f, "update broker {} rack state to '{}'", broker_id, state)
            }
            ClusterMutation::GracefulAction { broker_id, state } => {
                write!(f, "update broker {} graceful action state to '{}'", broker_id, state)
            }
            ClusterMutation::TopicStatus(status) => {
                write!(f, "update cruise control topic state to '{}'", status)
            }
            ClusterMutation::DeleteBrokerState(broker_id) => {
                write!(f, "delete broker {} state", broker_id)
            }
            ClusterMutation::AddBroker(broker) => write!(f, "add broker {}", broker.id),
            ClusterMutation::RemoveBroker(broker_id) => write!(f, "remove broker {}", broker_id),
            ClusterMutation::AddStorage { broker_id, storage } => write!(
                f,
                "add storage {} to broker {}",
                storage.mount_path, broker_id
            ),
            ClusterMutation::NodeAffinity { broker_id, .. } => {
                write!(f, "set node affinity of broker {}", broker_id)
            }
            ClusterMutation::RackConfig { broker_id, rack } => {
                write!(f, "set rack of broker {} to '{}'", broker_id, rack)
            }
        }
    }
}
