//! `koperator-state`: reconciles broker state and cluster topology into the
//! shared cluster record.
//!
//! The record can be changed at any time by other actors, and the store offers
//! nothing beyond single-object compare-and-swap. Every change is therefore a
//! [`ClusterMutation`] applied by the [`ClusterWriter`]: write, and on a
//! conflict refetch, reapply and write once more.

mod alerts;
pub use alerts::{AlertCache, AlertState, AlertStatus};

mod broker_state;
pub use broker_state::BrokerStateUpdater;

mod config;
pub use config::{LoadConfiguration, StateConfiguration};

mod errors;
pub use errors::{Result, StateError};

mod mutation;
pub use mutation::{ClusterMutation, WriteTarget};

mod pod;
pub use pod::{BrokerPod, BROKER_ID_LABEL};

mod rack_affinity;
pub use rack_affinity::{NodeLabelResolver, RackAffinityResolver, DEFAULT_FAILURE_DOMAIN_LABELS};

mod topology;
pub use topology::TopologyMutator;

mod writer;
pub use writer::ClusterWriter;
