//! # Topology Mutation Tests
//!
//! Membership and per broker configuration changes, each fetched by cluster
//! identity and written back through the conflict-resilient writer.

mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use koperator_core::cluster::{
    BrokerConfig, BrokerId, ClusterRecord, NodeSelectorRequirement, NodeSelectorTerm, ObjectKey,
    RackAwareness, StorageConfig, RACK_CONFIG_KEY,
};
use koperator_core::store::{
    self, ClusterStore, MemoryClusterStore, StaticNodeLabels, StoreError, StoreOp,
};
use koperator_state::{
    BrokerPod, NodeLabelResolver, StateConfiguration, StateError, TopologyMutator,
};

use common::{cluster_key, nodes, seeded_store, CapturedEvents, REGION, ZONE};

type Mutator = TopologyMutator<MemoryClusterStore, NodeLabelResolver<StaticNodeLabels>>;

fn mutator(store: &Arc<MemoryClusterStore>) -> Mutator {
    TopologyMutator::new(store.clone(), NodeLabelResolver::new(nodes()))
}

fn broker_ids(cluster: &ClusterRecord) -> Vec<i32> {
    cluster.spec.brokers.iter().map(|b| b.id.get()).collect()
}

#[tokio::test]
async fn add_broker_appends_to_the_list() {
    let store = seeded_store(&[0, 1]);
    let mutator = mutator(&store);

    mutator
        .add_broker(
            &cluster_key(),
            BrokerConfig::new(BrokerId::new(2)).with_storage(StorageConfig::new("/kafka-logs", "10Gi")),
        )
        .await
        .unwrap();

    let stored = store.get(&cluster_key()).await.unwrap();
    assert_eq!(broker_ids(&stored), vec![0, 1, 2]);
    assert_eq!(stored.spec.brokers[2].storage_configs.len(), 1);
}

#[tokio::test]
async fn add_broker_rejects_duplicate_id() {
    let store = seeded_store(&[0, 1]);
    let mutator = mutator(&store);

    let err = mutator
        .add_broker(&cluster_key(), BrokerConfig::new(BrokerId::new(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, StateError::DuplicateBroker(id) if id == BrokerId::new(1)));
    assert_eq!(broker_ids(&store.get(&cluster_key()).await.unwrap()), vec![0, 1]);
}

#[tokio::test]
async fn add_broker_to_missing_cluster_fails_with_identity() {
    let store = seeded_store(&[0]);
    let mutator = mutator(&store);

    let err = mutator
        .add_broker(&ObjectKey::new("other", "kafka"), BrokerConfig::new(BrokerId::new(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, StateError::GetCluster { ref source, .. } if source.is_not_found()));
    assert!(err.to_string().contains("kafka/other"));
}

/// **What**: Removing a present broker drops exactly that entry; removing it
/// again, or removing an unknown id, changes nothing.
#[tokio::test]
async fn remove_broker_is_idempotent() {
    let store = seeded_store(&[0, 1, 2]);
    let mutator = mutator(&store);

    mutator.remove_broker(&cluster_key(), BrokerId::new(1)).await.unwrap();
    let stored = store.get(&cluster_key()).await.unwrap();
    assert_eq!(broker_ids(&stored), vec![0, 2]);
    let version = stored.metadata.resource_version;

    mutator.remove_broker(&cluster_key(), BrokerId::new(1)).await.unwrap();
    mutator.remove_broker(&cluster_key(), BrokerId::new(17)).await.unwrap();

    let stored = store.get(&cluster_key()).await.unwrap();
    assert_eq!(broker_ids(&stored), vec![0, 2]);
    assert_eq!(stored.metadata.resource_version, version);
}

#[tokio::test]
async fn add_storage_appends_to_target_broker_only() {
    let store = seeded_store(&[0, 1]);
    let mutator = mutator(&store);

    mutator
        .add_storage(&cluster_key(), BrokerId::new(1), StorageConfig::new("/kafka-logs", "10Gi"))
        .await
        .unwrap();
    mutator
        .add_storage(&cluster_key(), BrokerId::new(1), StorageConfig::new("/kafka-logs-2", "20Gi"))
        .await
        .unwrap();
    mutator
        .add_storage(&cluster_key(), BrokerId::new(9), StorageConfig::new("/ignored", "1Gi"))
        .await
        .unwrap();

    let stored = store.get(&cluster_key()).await.unwrap();
    assert!(stored.spec.brokers[0].storage_configs.is_empty());
    let paths: Vec<&str> = stored.spec.brokers[1]
        .storage_configs
        .iter()
        .map(|s| s.mount_path.as_str())
        .collect();
    assert_eq!(paths, vec!["/kafka-logs", "/kafka-logs-2"]);
}

#[tokio::test]
async fn node_affinity_pins_broker_to_failure_domain() {
    let store = seeded_store(&[0, 1]);
    let mutator = mutator(&store);

    mutator
        .assign_node_affinity(&cluster_key(), &BrokerPod::new(BrokerId::new(1), "node-a"))
        .await
        .unwrap();

    let stored = store.get(&cluster_key()).await.unwrap();
    assert_eq!(stored.spec.brokers[0].node_affinity, None);

    let affinity = stored.spec.brokers[1].node_affinity.as_ref().unwrap();
    let selector = affinity.required.as_ref().unwrap();
    assert_eq!(
        selector.terms,
        vec![NodeSelectorTerm {
            match_expressions: vec![
                NodeSelectorRequirement::key_in(REGION, "eu-west-1"),
                NodeSelectorRequirement::key_in(ZONE, "eu-west-1a"),
            ],
        }]
    );
}

#[tokio::test]
async fn node_affinity_without_failure_domain_is_a_no_op() {
    let store = seeded_store(&[0]);
    let mutator = mutator(&store);
    let before = store.get(&cluster_key()).await.unwrap();

    mutator
        .assign_node_affinity(&cluster_key(), &BrokerPod::new(BrokerId::new(0), "node-b"))
        .await
        .unwrap();

    assert_eq!(store.get(&cluster_key()).await.unwrap(), before);
}

#[tokio::test]
async fn node_affinity_reports_unknown_node() {
    let store = seeded_store(&[0]);
    let mutator = mutator(&store);

    let err = mutator
        .assign_node_affinity(&cluster_key(), &BrokerPod::new(BrokerId::new(0), "node-x"))
        .await
        .unwrap_err();
    assert!(matches!(err, StateError::NodeSelector { ref node, .. } if node == "node-x"));
}

/// **What**: Two reconciliation passes assign the rack config of the same broker.
///
/// **Checks**: exactly one `broker.rack=` line, holding region and zone in the
/// order of the configured rack awareness labels.
#[tokio::test]
async fn rack_config_is_added_once() {
    let store = seeded_store(&[0, 1]);
    let mutator = mutator(&store);
    let pod = BrokerPod::new(BrokerId::new(0), "node-a");

    mutator.assign_rack_config(&cluster_key(), &pod).await.unwrap();
    mutator.assign_rack_config(&cluster_key(), &pod).await.unwrap();

    let stored = store.get(&cluster_key()).await.unwrap();
    let broker = &stored.spec.brokers[0];
    assert_eq!(broker.config.matches("broker.rack=").count(), 1);
    assert_eq!(broker.config_value(RACK_CONFIG_KEY), Some("eu-west-1,eu-west-1a"));
    assert!(broker.config.starts_with("auto.create.topics.enable=false\n"));
    assert_eq!(stored.spec.brokers[1].config_value(RACK_CONFIG_KEY), None);
}

#[tokio::test]
async fn rack_config_needs_rack_awareness_and_labels() {
    let store = seeded_store(&[0]);
    let mutator = mutator(&store);

    // node without any of the labels
    mutator
        .assign_rack_config(&cluster_key(), &BrokerPod::new(BrokerId::new(0), "node-b"))
        .await
        .unwrap();
    assert_eq!(
        store.get(&cluster_key()).await.unwrap().spec.brokers[0].config_value(RACK_CONFIG_KEY),
        None
    );

    // cluster without rack awareness
    let mut record = store.get(&cluster_key()).await.unwrap();
    record.spec.rack_awareness = None;
    store.update(&mut record).await.unwrap();

    mutator
        .assign_rack_config(&cluster_key(), &BrokerPod::new(BrokerId::new(0), "node-a"))
        .await
        .unwrap();
    assert_eq!(
        store.get(&cluster_key()).await.unwrap().spec.brokers[0].config_value(RACK_CONFIG_KEY),
        None
    );
}

#[tokio::test]
async fn rack_config_follows_label_order_of_the_cluster() {
    let store = seeded_store(&[0]);
    let mut record = store.get(&cluster_key()).await.unwrap();
    record.spec.rack_awareness = Some(RackAwareness {
        labels: vec![ZONE.to_string(), REGION.to_string()],
    });
    store.update(&mut record).await.unwrap();

    mutator(&store)
        .assign_rack_config(&cluster_key(), &BrokerPod::new(BrokerId::new(0), "node-a"))
        .await
        .unwrap();

    let stored = store.get(&cluster_key()).await.unwrap();
    assert_eq!(
        stored.spec.brokers[0].config_value(RACK_CONFIG_KEY),
        Some("eu-west-1a,eu-west-1")
    );
}

/// **What**: A broker list rewrite that hits a conflict is retried on the
/// latest list instead of overwriting it.
///
/// **Checks**:
/// - the broker added by another actor survives the removal
/// - the injected conflict was consumed by exactly one retry
#[tokio::test]
async fn list_rewrite_conflict_is_retried_on_latest_list() {
    let store = seeded_store(&[0, 1]);
    let mutator = mutator(&store);

    let mut other = store.get(&cluster_key()).await.unwrap();
    other.spec.brokers.push(BrokerConfig::new(BrokerId::new(5)));
    store.update(&mut other).await.unwrap();

    store
        .inject_fault(StoreOp::Update, StoreError::Conflict("object has been modified".into()))
        .await;

    mutator.remove_broker(&cluster_key(), BrokerId::new(0)).await.unwrap();

    assert_eq!(store.pending_faults().await, 0);
    let stored = store.get(&cluster_key()).await.unwrap();
    assert_eq!(broker_ids(&stored), vec![1, 5]);
}

/// Store where another actor appends broker 5 right before the first
/// whole-object write lands.
struct RacingStore {
    inner: Arc<MemoryClusterStore>,
    raced: AtomicBool,
}

#[async_trait]
impl ClusterStore for RacingStore {
    async fn get(&self, key: &ObjectKey) -> store::Result<ClusterRecord> {
        self.inner.get(key).await
    }

    async fn update(&self, record: &mut ClusterRecord) -> store::Result<()> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let mut other = self.inner.get(&record.key()).await?;
            other.spec.brokers.push(BrokerConfig::new(BrokerId::new(5)));
            self.inner.update(&mut other).await?;
        }
        self.inner.update(record).await
    }

    async fn update_status(&self, record: &mut ClusterRecord) -> store::Result<()> {
        self.inner.update_status(record).await
    }
}

/// **What**: Storage is added to every broker while another actor rewrites the
/// broker list between the first fetch and its write.
///
/// **Checks**:
/// - each broker ends up with exactly one volume
/// - the broker added by the other actor is kept
#[tokio::test]
async fn storage_changes_survive_racing_list_rewrite() {
    let inner = seeded_store(&[0, 1, 2]);
    let store = Arc::new(RacingStore {
        inner: inner.clone(),
        raced: AtomicBool::new(false),
    });
    let mutator = TopologyMutator::new(store, NodeLabelResolver::new(nodes()));

    for id in 0..3 {
        mutator
            .add_storage(&cluster_key(), BrokerId::new(id), StorageConfig::new("/kafka-logs", "10Gi"))
            .await
            .unwrap();
    }

    let stored = inner.get(&cluster_key()).await.unwrap();
    assert_eq!(broker_ids(&stored), vec![0, 1, 2, 5]);
    for broker in &stored.spec.brokers[..3] {
        assert_eq!(broker.storage_configs.len(), 1, "broker {}", broker.id);
    }
    assert!(stored.spec.brokers[3].storage_configs.is_empty());
}

/// **What**: Brokers reported by pods are turned into topology changes, with
/// the broker id label taken from configuration.
#[tokio::test]
async fn pods_drive_topology_changes() {
    let (events, _guard) = CapturedEvents::install();
    let config = StateConfiguration::from_yaml(
        "cluster_name: kafka\nnamespace: kafka\nbroker_id_label: kafka.io/broker-id\n",
    )
    .unwrap();
    let store = seeded_store(&[0, 1]);
    let mutator = TopologyMutator::new(store.clone(), NodeLabelResolver::from_config(nodes(), &config));

    let labels = BTreeMap::from([("kafka.io/broker-id".to_string(), "1".to_string())]);
    let pod = BrokerPod::from_labels("node-a", &labels, &config.broker_id_label).unwrap();

    mutator.assign_node_affinity(&config.cluster, &pod).await.unwrap();
    mutator.assign_rack_config(&config.cluster, &pod).await.unwrap();

    let stored = store.get(&config.cluster).await.unwrap();
    assert!(stored.spec.brokers[1].node_affinity.is_some());
    assert!(stored.spec.brokers[1].config_value(RACK_CONFIG_KEY).is_some());

    let logged = events.with_message("cluster state updated");
    let fields: Vec<&str> = logged.iter().map(|e| e["field"].as_str()).collect();
    assert_eq!(fields, vec!["nodeAffinity", "config"]);
    assert!(logged.iter().all(|e| e["broker_id"] == "1"));
}
