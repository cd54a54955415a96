use async_trait::async_trait;
use std::collections::BTreeMap;

use super::errors::Result;
use crate::cluster::{ClusterRecord, ObjectKey};

/// Versioned object store holding cluster records.
///
/// Writes are single-object compare-and-swap on `metadata.resource_version`:
/// a stale version fails with [`StoreError::Conflict`](super::StoreError::Conflict).
/// On success the record is replaced by the object as stored, carrying the new
/// version. The type descriptor is not part of the returned object.
#[async_trait]
pub trait ClusterStore: Send + Sync + 'static {
    async fn get(&self, key: &ObjectKey) -> Result<ClusterRecord>;

    /// Writes the whole object.
    async fn update(&self, record: &mut ClusterRecord) -> Result<()>;

    /// Writes through the status subresource. Reports `NotFound` when the
    /// record kind has no status subresource.
    async fn update_status(&self, record: &mut ClusterRecord) -> Result<()>;
}

/// Source of node labels, used to work out the failure domain of a broker.
#[async_trait]
pub trait NodeLabelSource: Send + Sync + 'static {
    async fn node_labels(&self, node_name: &str) -> Result<BTreeMap<String, String>>;
}

/// Store operation a fault can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    Update,
    UpdateStatus,
}
