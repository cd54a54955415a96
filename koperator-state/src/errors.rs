use koperator_core::cluster::{BrokerId, ObjectKey};
use koperator_core::store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("could not get cluster {cluster}: {source}")]
    GetCluster {
        cluster: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("could not refetch cluster {cluster}: {source}")]
    Refetch {
        cluster: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("could not {mutation} in cluster {cluster}: {source}")]
    Write {
        cluster: ObjectKey,
        mutation: String,
        #[source]
        source: StoreError,
    },

    #[error("determining node selector failed for node {node}: {source}")]
    NodeSelector {
        node: String,
        #[source]
        source: StoreError,
    },

    #[error("fetching rack awareness labels failed for node {node}: {source}")]
    RackLabels {
        node: String,
        #[source]
        source: StoreError,
    },

    #[error("broker {0} already exists in the cluster")]
    DuplicateBroker(BrokerId),

    #[error("pod label {label} does not hold a broker id: {value:?}")]
    InvalidBrokerLabel {
        label: String,
        value: Option<String>,
    },

    #[error("alert {0} doesn't exist")]
    AlertNotFound(u64),
}
