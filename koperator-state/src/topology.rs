use koperator_core::cluster::{
    BrokerConfig, BrokerId, ClusterRecord, NodeAffinity, ObjectKey, StorageConfig,
};
use koperator_core::store::ClusterStore;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{Result, StateError};
use crate::mutation::ClusterMutation;
use crate::pod::BrokerPod;
use crate::rack_affinity::RackAffinityResolver;
use crate::writer::ClusterWriter;

/// Changes to cluster membership and per broker configuration.
///
/// Every operation fetches the cluster by identity, changes the broker list
/// and writes the whole object through the same conflict-resilient path as
/// status updates, so concurrent list rewrites are not lost.
#[derive(Debug)]
pub struct TopologyMutator<S, R> {
    writer: ClusterWriter<S>,
    resolver: R,
}

impl<S: ClusterStore, R: RackAffinityResolver> TopologyMutator<S, R> {
    pub fn new(store: Arc<S>, resolver: R) -> Self {
        TopologyMutator {
            writer: ClusterWriter::new(store),
            resolver,
        }
    }

    /// Returns the cluster record stored under `key`.
    pub async fn get_cluster(&self, key: &ObjectKey) -> Result<ClusterRecord> {
        self.writer
            .store()
            .get(key)
            .await
            .map_err(|source| StateError::GetCluster {
                cluster: key.clone(),
                source,
            })
    }

    /// Appends a broker to the cluster. An id already in use is rejected.
    pub async fn add_broker(&self, key: &ObjectKey, broker: BrokerConfig) -> Result<()> {
        self.mutate(key, ClusterMutation::AddBroker(broker)).await
    }

    /// Removes a broker from the cluster. Removing an unknown broker does nothing.
    pub async fn remove_broker(&self, key: &ObjectKey, broker_id: BrokerId) -> Result<()> {
        self.mutate(key, ClusterMutation::RemoveBroker(broker_id)).await
    }

    /// Attaches one more storage volume to a broker. Unknown brokers are skipped.
    pub async fn add_storage(
        &self,
        key: &ObjectKey,
        broker_id: BrokerId,
        storage: StorageConfig,
    ) -> Result<()> {
        self.mutate(key, ClusterMutation::AddStorage { broker_id, storage })
            .await
    }

    /// Pins the broker running in `pod` to the failure domain of its node.
    /// Nothing changes when the node has no failure domain labels.
    pub async fn assign_node_affinity(&self, key: &ObjectKey, pod: &BrokerPod) -> Result<()> {
        let terms = self.resolver.selectors_for_node(&pod.node_name).await?;
        if terms.is_empty() {
            debug!(
                cluster = %key,
                broker_id = %pod.broker_id,
                node = %pod.node_name,
                "node has no failure domain labels, leaving node affinity unset"
            );
            return Ok(());
        }

        self.mutate(
            key,
            ClusterMutation::NodeAffinity {
                broker_id: pod.broker_id,
                affinity: NodeAffinity::required(terms),
            },
        )
        .await
    }

    /// Adds a `broker.rack` entry built from the rack awareness labels of the
    /// pod's node, unless the broker configuration already has one.
    pub async fn assign_rack_config(&self, key: &ObjectKey, pod: &BrokerPod) -> Result<()> {
        let mut cluster = self.get_cluster(key).await?;

        let label_keys = match cluster.spec.rack_awareness.as_ref() {
            Some(rack_awareness) if !rack_awareness.labels.is_empty() => {
                rack_awareness.labels.clone()
            }
            _ => {
                debug!(cluster = %key, "rack awareness is not configured");
                return Ok(());
            }
        };

        let labels = self
            .resolver
            .labels_for_node(&pod.node_name, &label_keys)
            .await?;
        let rack = label_keys
            .iter()
            .filter_map(|label| labels.get(label).map(String::as_str))
            .collect::<Vec<_>>()
            .join(",");
        if rack.is_empty() {
            debug!(
                cluster = %key,
                broker_id = %pod.broker_id,
                node = %pod.node_name,
                "node carries none of the rack awareness labels"
            );
            return Ok(());
        }

        self.writer
            .apply(
                &mut cluster,
                &ClusterMutation::RackConfig {
                    broker_id: pod.broker_id,
                    rack,
                },
            )
            .await
    }

    async fn mutate(&self, key: &ObjectKey, mutation: ClusterMutation) -> Result<()> {
        let mut cluster = self.get_cluster(key).await?;
        self.writer.apply(&mut cluster, &mutation).await
    }
}
