use koperator_core::cluster::{
    BrokerId, ClusterRecord, CruiseControlTopicStatus, GracefulActionState, RackAwarenessState,
};
use koperator_core::store::ClusterStore;
use std::sync::Arc;

use crate::errors::Result;
use crate::mutation::ClusterMutation;
use crate::writer::ClusterWriter;

/// Status updates of individual brokers and of the cluster, written through
/// the status subresource.
///
/// Each update works on the caller's copy of the cluster and leaves it holding
/// the persisted record, so a reconciliation loop can keep using it.
#[derive(Debug)]
pub struct BrokerStateUpdater<S> {
    writer: ClusterWriter<S>,
}

impl<S> Clone for BrokerStateUpdater<S> {
    fn clone(&self) -> Self {
        BrokerStateUpdater {
            writer: self.writer.clone(),
        }
    }
}

impl<S: ClusterStore> BrokerStateUpdater<S> {
    pub fn new(store: Arc<S>) -> Self {
        BrokerStateUpdater {
            writer: ClusterWriter::new(store),
        }
    }

    pub fn from_writer(writer: ClusterWriter<S>) -> Self {
        BrokerStateUpdater { writer }
    }

    /// Sets the rack awareness state of a broker, keeping its graceful action state.
    pub async fn set_rack_awareness(
        &self,
        cluster: &mut ClusterRecord,
        broker_id: BrokerId,
        state: RackAwarenessState,
    ) -> Result<()> {
        self.writer
            .apply(cluster, &ClusterMutation::RackAwareness { broker_id, state })
            .await
    }

    /// Sets the graceful action state of a broker, keeping its rack awareness state.
    pub async fn set_graceful_action(
        &self,
        cluster: &mut ClusterRecord,
        broker_id: BrokerId,
        state: GracefulActionState,
    ) -> Result<()> {
        self.writer
            .apply(cluster, &ClusterMutation::GracefulAction { broker_id, state })
            .await
    }

    pub async fn set_topic_status(
        &self,
        cluster: &mut ClusterRecord,
        status: CruiseControlTopicStatus,
    ) -> Result<()> {
        self.writer
            .apply(cluster, &ClusterMutation::TopicStatus(status))
            .await
    }

    /// Deletes the state of a broker. A broker without state is not an error.
    pub async fn delete_broker_state(
        &self,
        cluster: &mut ClusterRecord,
        broker_id: BrokerId,
    ) -> Result<()> {
        self.writer
            .apply(cluster, &ClusterMutation::DeleteBrokerState(broker_id))
            .await
    }
}
