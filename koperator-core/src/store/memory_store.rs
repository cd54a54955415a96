use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    errors::{Result, StoreError},
    store::{ClusterStore, NodeLabelSource, StoreOp},
};
use crate::cluster::{ClusterRecord, ObjectKey, TypeMeta};

/// MemoryClusterStore keeps cluster records in memory and behaves like the
/// remote object store: version checked writes, an optional status subresource,
/// and responses without the type descriptor.
/// SHOULD BE USED ONLY FOR TESTING PURPOSES
#[derive(Debug, Clone)]
pub struct MemoryClusterStore {
    inner: Arc<DashMap<ObjectKey, ClusterRecord>>,
    revision: Arc<AtomicU64>,
    status_subresource: bool,
    faults: Arc<Mutex<VecDeque<(StoreOp, StoreError)>>>,
}

impl Default for MemoryClusterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClusterStore {
    pub fn new() -> Self {
        MemoryClusterStore {
            inner: Arc::new(DashMap::new()),
            revision: Arc::new(AtomicU64::new(0)),
            status_subresource: true,
            faults: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Store whose record kind has no status subresource: status writes report
    /// `NotFound` and whole-object writes carry the status along.
    pub fn without_status_subresource() -> Self {
        MemoryClusterStore {
            status_subresource: false,
            ..Self::new()
        }
    }

    /// Inserts a new record and returns it as stored.
    pub fn create(&self, mut record: ClusterRecord) -> Result<ClusterRecord> {
        let key = record.key();
        if key.name.is_empty() || key.namespace.is_empty() {
            return Err(StoreError::InvalidArguments(format!(
                "record needs a name and a namespace: {}",
                key
            )));
        }
        if self.inner.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{} already exists", key)));
        }
        record.metadata.resource_version = Some(self.next_revision());
        self.inner.insert(key, record.clone());
        record.type_meta = TypeMeta::default();
        Ok(record)
    }

    /// Makes the next call of `op` fail with `error`. Faults are consumed in
    /// the order they were injected.
    pub async fn inject_fault(&self, op: StoreOp, error: StoreError) {
        self.faults.lock().await.push_back((op, error));
    }

    /// Number of injected faults not yet consumed.
    pub async fn pending_faults(&self) -> usize {
        self.faults.lock().await.len()
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn take_fault(&self, op: StoreOp) -> Option<StoreError> {
        let mut faults = self.faults.lock().await;
        let pos = faults.iter().position(|(fault_op, _)| *fault_op == op)?;
        faults.remove(pos).map(|(_, error)| error)
    }

    // Compare-and-swap of one record; `write` merges the caller's record into the stored one.
    fn write<F>(&self, record: &mut ClusterRecord, write: F) -> Result<()>
    where
        F: FnOnce(&mut ClusterRecord, &ClusterRecord),
    {
        let key = record.key();
        let mut stored = self
            .inner
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("cluster {}", key)))?;

        match record.metadata.resource_version {
            None => {
                return Err(StoreError::InvalidArguments(format!(
                    "resource version must be set to update {}",
                    key
                )))
            }
            Some(version) if stored.metadata.resource_version != Some(version) => {
                debug!(
                    cluster = %key,
                    expected = version,
                    "rejecting write with a stale resource version"
                );
                return Err(StoreError::Conflict(format!(
                    "the object {} has been modified; please apply your changes to the latest version and try again",
                    key
                )));
            }
            Some(_) => {}
        }

        write(&mut *stored, &*record);
        stored.metadata.resource_version = Some(self.next_revision());

        *record = (*stored).clone();
        drop(stored);
        record.type_meta = TypeMeta::default();
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for MemoryClusterStore {
    async fn get(&self, key: &ObjectKey) -> Result<ClusterRecord> {
        if let Some(fault) = self.take_fault(StoreOp::Get).await {
            return Err(fault);
        }
        self.inner
            .get(key)
            .map(|record| record.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("cluster {}", key)))
    }

    async fn update(&self, record: &mut ClusterRecord) -> Result<()> {
        if let Some(fault) = self.take_fault(StoreOp::Update).await {
            return Err(fault);
        }
        let status_subresource = self.status_subresource;
        self.write(record, |stored, incoming| {
            stored.spec = incoming.spec.clone();
            if !status_subresource {
                stored.status = incoming.status.clone();
            }
        })
    }

    async fn update_status(&self, record: &mut ClusterRecord) -> Result<()> {
        if let Some(fault) = self.take_fault(StoreOp::UpdateStatus).await {
            return Err(fault);
        }
        if !self.status_subresource {
            return Err(StoreError::NotFound(format!(
                "status subresource of cluster {}",
                record.key()
            )));
        }
        self.write(record, |stored, incoming| {
            stored.status = incoming.status.clone();
        })
    }
}

/// Fixed node labels, keyed by node name.
/// SHOULD BE USED ONLY FOR TESTING PURPOSES
#[derive(Debug, Clone, Default)]
pub struct StaticNodeLabels {
    nodes: Arc<DashMap<String, BTreeMap<String, String>>>,
}

impl StaticNodeLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_node<I, K, V>(&self, node_name: &str, labels: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let labels = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.nodes.insert(node_name.to_string(), labels);
    }
}

#[async_trait]
impl NodeLabelSource for StaticNodeLabels {
    async fn node_labels(&self, node_name: &str) -> Result<BTreeMap<String, String>> {
        self.nodes
            .get(node_name)
            .map(|labels| labels.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("node {}", node_name)))
    }
}
