use async_trait::async_trait;
use koperator_core::cluster::{NodeSelectorRequirement, NodeSelectorTerm};
use koperator_core::store::NodeLabelSource;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::StateConfiguration;
use crate::errors::{Result, StateError};

/// Node labels describing the failure domain of a node, most significant first.
pub const DEFAULT_FAILURE_DOMAIN_LABELS: [&str; 2] = [
    "failure-domain.beta.kubernetes.io/region",
    "failure-domain.beta.kubernetes.io/zone",
];

/// Works out where a node sits, for pinning brokers to their failure domain.
#[async_trait]
pub trait RackAffinityResolver: Send + Sync {
    /// Node selector terms matching the failure domain of `node_name`.
    /// Empty when the node carries none of the failure domain labels.
    async fn selectors_for_node(&self, node_name: &str) -> Result<Vec<NodeSelectorTerm>>;

    /// Values of the requested label keys on `node_name`; keys the node doesn't
    /// carry are left out.
    async fn labels_for_node(
        &self,
        node_name: &str,
        keys: &[String],
    ) -> Result<BTreeMap<String, String>>;
}

/// Resolver reading the labels of nodes from a [`NodeLabelSource`].
#[derive(Debug)]
pub struct NodeLabelResolver<N> {
    nodes: Arc<N>,
    failure_domain_labels: Vec<String>,
}

impl<N: NodeLabelSource> NodeLabelResolver<N> {
    pub fn new(nodes: Arc<N>) -> Self {
        NodeLabelResolver {
            nodes,
            failure_domain_labels: DEFAULT_FAILURE_DOMAIN_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
        }
    }

    pub fn from_config(nodes: Arc<N>, config: &StateConfiguration) -> Self {
        NodeLabelResolver {
            nodes,
            failure_domain_labels: config.failure_domain_labels.clone(),
        }
    }
}

#[async_trait]
impl<N: NodeLabelSource> RackAffinityResolver for NodeLabelResolver<N> {
    async fn selectors_for_node(&self, node_name: &str) -> Result<Vec<NodeSelectorTerm>> {
        let labels = self
            .nodes
            .node_labels(node_name)
            .await
            .map_err(|source| StateError::NodeSelector {
                node: node_name.to_string(),
                source,
            })?;

        // one term, so the broker has to land in the same region AND zone
        let match_expressions: Vec<NodeSelectorRequirement> = self
            .failure_domain_labels
            .iter()
            .filter_map(|key| {
                labels
                    .get(key)
                    .map(|value| NodeSelectorRequirement::key_in(key, value))
            })
            .collect();

        if match_expressions.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![NodeSelectorTerm { match_expressions }])
    }

    async fn labels_for_node(
        &self,
        node_name: &str,
        keys: &[String],
    ) -> Result<BTreeMap<String, String>> {
        let labels = self
            .nodes
            .node_labels(node_name)
            .await
            .map_err(|source| StateError::RackLabels {
                node: node_name.to_string(),
                source,
            })?;

        Ok(keys
            .iter()
            .filter_map(|key| labels.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }
}
