use koperator_core::cluster::{ClusterRecord, ObjectKey};
use koperator_core::store::{self, ClusterStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{Result, StateError};
use crate::mutation::{ClusterMutation, WriteTarget};

/// Applies mutations to cluster records and persists them, recovering from
/// concurrent modification.
///
/// A write that fails with a conflict is retried exactly once: the record is
/// refetched, the same mutation is applied to the fresh copy and the write is
/// attempted again. A second conflict is returned to the caller, whose
/// reconciliation loop converges on its next pass. Any other store error is
/// terminal straight away.
#[derive(Debug)]
pub struct ClusterWriter<S> {
    store: Arc<S>,
}

impl<S> Clone for ClusterWriter<S> {
    fn clone(&self) -> Self {
        ClusterWriter {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ClusterStore> ClusterWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        ClusterWriter { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Applies `mutation` to `cluster` and persists it.
    ///
    /// On return `cluster` holds the record as last seen in the store (after a
    /// conflict that is the refetched copy with the mutation applied). A
    /// mutation that leaves the caller's copy unchanged is only skipped once the
    /// store confirms that copy is current; a stale copy is replaced by the
    /// latest record and the mutation applied to that instead. The caller's type
    /// descriptor is restored, since store responses don't carry it.
    pub async fn apply(&self, cluster: &mut ClusterRecord, mutation: &ClusterMutation) -> Result<()> {
        let type_meta = cluster.type_meta.clone();
        let result = self.apply_with_retry(cluster, mutation).await;
        cluster.type_meta = type_meta;
        result
    }

    async fn apply_with_retry(
        &self,
        cluster: &mut ClusterRecord,
        mutation: &ClusterMutation,
    ) -> Result<()> {
        let key = cluster.key();
        let target = mutation.target();

        if !mutation.apply(cluster)? {
            // an unchanged copy proves nothing unless it is still the stored version
            let latest = self.refetch(&key).await?;
            if latest.metadata.resource_version == cluster.metadata.resource_version {
                debug!(cluster = %key, field = mutation.field(), "{} is a no-op, skipping write", mutation);
                return Ok(());
            }
            *cluster = latest;
            if !mutation.apply(cluster)? {
                debug!(cluster = %key, field = mutation.field(), "latest cluster already reflects {}", mutation);
                return Ok(());
            }
        }

        match self.write(cluster, target).await {
            Ok(()) => {}
            Err(err) if err.is_conflict() => {
                warn!(
                    cluster = %key,
                    field = mutation.field(),
                    error = %err,
                    "write conflict, refetching cluster to retry"
                );
                *cluster = self.refetch(&key).await?;

                if !mutation.apply(cluster)? {
                    debug!(cluster = %key, field = mutation.field(), "latest cluster already reflects {}", mutation);
                    return Ok(());
                }
                self.write(cluster, target)
                    .await
                    .map_err(|source| StateError::Write {
                        cluster: key.clone(),
                        mutation: mutation.to_string(),
                        source,
                    })?;
            }
            Err(source) => {
                return Err(StateError::Write {
                    cluster: key,
                    mutation: mutation.to_string(),
                    source,
                })
            }
        }

        match mutation.broker_id() {
            Some(broker_id) => info!(
                cluster = %key,
                broker_id = %broker_id,
                field = mutation.field(),
                value = %mutation.value(),
                "cluster state updated"
            ),
            None => info!(
                cluster = %key,
                field = mutation.field(),
                value = %mutation.value(),
                "cluster state updated"
            ),
        }
        Ok(())
    }

    async fn refetch(&self, key: &ObjectKey) -> Result<ClusterRecord> {
        self.store
            .get(key)
            .await
            .map_err(|source| StateError::Refetch {
                cluster: key.clone(),
                source,
            })
    }

    async fn write(&self, cluster: &mut ClusterRecord, target: WriteTarget) -> store::Result<()> {
        match target {
            WriteTarget::Status => match self.store.update_status(cluster).await {
                Err(err) if err.is_not_found() => self.store.update(cluster).await,
                result => result,
            },
            WriteTarget::Object => self.store.update(cluster).await,
        }
    }
}
