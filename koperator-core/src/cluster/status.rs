use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::BrokerId;

/// Observed state of the cluster, written through the status subresource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Per broker state, keyed by broker id. Entries are created lazily on the
    /// first write for a broker and removed when the broker leaves the cluster.
    #[serde(default)]
    pub brokers_state: BTreeMap<BrokerId, BrokerState>,
    #[serde(default)]
    pub cruise_control_topic_status: CruiseControlTopicStatus,
}

impl ClusterStatus {
    pub fn broker_state(&self, broker_id: BrokerId) -> Option<&BrokerState> {
        self.brokers_state.get(&broker_id)
    }

    /// Sets the rack awareness state of a broker, keeping its graceful action state.
    /// Returns whether anything changed.
    pub fn set_rack_awareness(&mut self, broker_id: BrokerId, state: RackAwarenessState) -> bool {
        let entry = self.brokers_state.entry(broker_id).or_default();
        if entry.rack_awareness_state == Some(state) {
            return false;
        }
        entry.rack_awareness_state = Some(state);
        true
    }

    /// Sets the graceful action state of a broker, keeping its rack awareness state.
    /// Returns whether anything changed.
    pub fn set_graceful_action(&mut self, broker_id: BrokerId, state: GracefulActionState) -> bool {
        let entry = self.brokers_state.entry(broker_id).or_default();
        if entry.graceful_action_state == state {
            return false;
        }
        entry.graceful_action_state = state;
        true
    }

    pub fn set_topic_status(&mut self, status: CruiseControlTopicStatus) -> bool {
        if self.cruise_control_topic_status == status {
            return false;
        }
        self.cruise_control_topic_status = status;
        true
    }

    /// Drops the state of a broker. Missing entries are not an error.
    pub fn remove_broker_state(&mut self, broker_id: BrokerId) -> bool {
        self.brokers_state.remove(&broker_id).is_some()
    }
}

/// Two independently settable substates of one broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_awareness_state: Option<RackAwarenessState>,
    #[serde(default)]
    pub graceful_action_state: GracefulActionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RackAwarenessState {
    /// The broker is running with its rack configured
    Configured,
    /// The broker is waiting for the rack awareness config
    WaitingForRackAwareness,
}

impl RackAwarenessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RackAwarenessState::Configured => "Configured",
            RackAwarenessState::WaitingForRackAwareness => "WaitingForRackAwareness",
        }
    }
}

impl fmt::Display for RackAwarenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CruiseControlState {
    GracefulUpdateSucceeded,
    GracefulUpdateFailed,
    GracefulUpdateRequired,
}

impl CruiseControlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CruiseControlState::GracefulUpdateSucceeded => "GracefulUpdateSucceeded",
            CruiseControlState::GracefulUpdateFailed => "GracefulUpdateFailed",
            CruiseControlState::GracefulUpdateRequired => "GracefulUpdateRequired",
        }
    }
}

impl fmt::Display for CruiseControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a graceful action (e.g. a safe decommission) on one broker.
///
/// The constructors only attach an error message to
/// [`CruiseControlState::GracefulUpdateFailed`]. Deserialization does not check
/// this; entries written by other actors are read as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GracefulActionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cruise_control_state: Option<CruiseControlState>,
    #[serde(default)]
    error_message: String,
}

impl GracefulActionState {
    pub fn new(state: CruiseControlState) -> Self {
        GracefulActionState {
            cruise_control_state: Some(state),
            error_message: String::new(),
        }
    }

    pub fn succeeded() -> Self {
        Self::new(CruiseControlState::GracefulUpdateSucceeded)
    }

    pub fn required() -> Self {
        Self::new(CruiseControlState::GracefulUpdateRequired)
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        GracefulActionState {
            cruise_control_state: Some(CruiseControlState::GracefulUpdateFailed),
            error_message: error_message.into(),
        }
    }

    pub fn state(&self) -> Option<CruiseControlState> {
        self.cruise_control_state
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }
}

impl fmt::Display for GracefulActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cruise_control_state {
            None => f.write_str("<unset>"),
            Some(state) if self.error_message.is_empty() => write!(f, "{}", state),
            Some(state) => write!(f, "{} ({})", state, self.error_message),
        }
    }
}

/// Whether the topic required by cruise control exists. Cluster scoped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CruiseControlTopicStatus {
    #[default]
    #[serde(rename = "CruiseControlTopicNotReady")]
    TopicNotReady,
    #[serde(rename = "CruiseControlTopicReady")]
    TopicReady,
}

impl CruiseControlTopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CruiseControlTopicStatus::TopicNotReady => "CruiseControlTopicNotReady",
            CruiseControlTopicStatus::TopicReady => "CruiseControlTopicReady",
        }
    }
}

impl fmt::Display for CruiseControlTopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
