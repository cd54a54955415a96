//! Shared helpers for `koperator-state` integration tests.
//!
//! Provides a seeded in-memory store and a tracing layer that records every
//! event, so tests can assert on the log line each mutation emits.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use koperator_core::cluster::{
    BrokerConfig, BrokerId, ClusterRecord, ObjectKey, RackAwareness, TypeMeta,
};
use koperator_core::store::{MemoryClusterStore, StaticNodeLabels};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

pub const REGION: &str = "failure-domain.beta.kubernetes.io/region";
pub const ZONE: &str = "failure-domain.beta.kubernetes.io/zone";

pub fn cluster_key() -> ObjectKey {
    ObjectKey::new("kafka", "kafka")
}

pub fn type_meta() -> TypeMeta {
    TypeMeta {
        api_version: "kafka.banzaicloud.io/v1alpha1".into(),
        kind: "KafkaCluster".into(),
    }
}

/// Store holding one cluster with the given brokers and rack awareness on
/// region and zone.
pub fn seeded_store(broker_ids: &[i32]) -> Arc<MemoryClusterStore> {
    let store = MemoryClusterStore::new();
    let mut record = ClusterRecord::new(&cluster_key(), type_meta());
    for id in broker_ids {
        record.spec.brokers.push(
            BrokerConfig::new(BrokerId::new(*id)).with_config("auto.create.topics.enable=false\n"),
        );
    }
    record.spec.rack_awareness = Some(RackAwareness {
        labels: vec![REGION.to_string(), ZONE.to_string()],
    });
    store.create(record).expect("seed cluster");
    Arc::new(store)
}

/// Nodes: `node-a` in eu-west-1a, `node-b` without failure domain labels.
pub fn nodes() -> Arc<StaticNodeLabels> {
    let nodes = StaticNodeLabels::new();
    nodes.set_node(
        "node-a",
        [
            (REGION, "eu-west-1"),
            (ZONE, "eu-west-1a"),
            ("kubernetes.io/hostname", "node-a"),
        ],
    );
    nodes.set_node("node-b", [("kubernetes.io/hostname", "node-b")]);
    Arc::new(nodes)
}

/// Fields of every event recorded while the guard is alive.
#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<BTreeMap<String, String>>>>);

impl CapturedEvents {
    /// Installs the capturing subscriber for the current thread.
    /// `#[tokio::test]` runs on a current-thread runtime, so the whole test is covered.
    pub fn install() -> (Self, DefaultGuard) {
        let events = CapturedEvents::default();
        let subscriber = Registry::default().with(events.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (events, guard)
    }

    /// Events carrying the given message.
    pub fn with_message(&self, message: &str) -> Vec<BTreeMap<String, String>> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.get("message").map(String::as_str) == Some(message))
            .cloned()
            .collect()
    }
}

impl<S: tracing::Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.0.lock().unwrap().push(visitor.0);
    }
}

#[derive(Default)]
struct FieldVisitor(BTreeMap<String, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{:?}", value));
    }
}
