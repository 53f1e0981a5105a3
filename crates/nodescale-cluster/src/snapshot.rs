//! Immutable point-in-time view of the cluster.
//!
//! A [`ClusterSnapshot`] is built once per decision step from a single
//! [`ClusterState`] fetch and never changes afterwards; there is no
//! mutator on it. Anything that cordons, uncordons or deletes a node
//! makes the snapshot stale, and the caller must capture a new one.

use std::collections::HashMap;
use std::num::NonZeroU64;

use chrono::{DateTime, Utc};

use crate::error::{ClusterError, ClusterResult};
use crate::source::ClusterSource;
use crate::types::*;

/// A validated worker node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Allocatable CPU in millicores.
    pub capacity: u64,
    pub cordoned: bool,
    /// Raw cordon stamp, only kept while the node is cordoned.
    cordon_stamp: Option<String>,
}

impl Node {
    /// When the node was cordoned.
    ///
    /// Fails with [`ClusterError::MalformedNodeState`] if the node is not
    /// cordoned, or if its stamp is missing or unparseable.
    pub fn cordoned_at(&self) -> ClusterResult<DateTime<Utc>> {
        let malformed = |reason: String| ClusterError::MalformedNodeState {
            node: self.id.clone(),
            reason,
        };
        if !self.cordoned {
            return Err(malformed("node is not cordoned".to_string()));
        }
        let raw = self
            .cordon_stamp
            .as_deref()
            .ok_or_else(|| malformed(format!("missing {CORDONED_AT_ANNOTATION} annotation")))?;
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| malformed(format!("unparseable cordon timestamp {raw:?}: {e}")))
    }
}

/// A pod bound to a node, classified against the protection rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Pod {
    pub id: PodId,
    pub node_id: NodeId,
    /// CPU request in millicores.
    pub request: u64,
    pub protected: bool,
}

#[derive(Debug, Clone)]
pub struct ClusterSnapshot {
    /// Sorted by id.
    nodes: Vec<Node>,
    pods: HashMap<NodeId, Vec<Pod>>,
}

impl ClusterSnapshot {
    /// Fetch fresh state from `source` and build a snapshot from it.
    pub async fn capture<S: ClusterSource>(
        source: &S,
        rule: &ProtectionRule,
    ) -> ClusterResult<Self> {
        let state = source.fetch().await?;
        Self::from_state(state, rule)
    }

    /// Build a snapshot from raw records.
    ///
    /// Fails if any node is missing its capacity. Pods that are not bound
    /// to a known node do not count against any node.
    pub fn from_state(state: ClusterState, rule: &ProtectionRule) -> ClusterResult<Self> {
        let mut nodes = state
            .nodes
            .into_iter()
            .map(|record| -> ClusterResult<Node> {
                let capacity = record
                    .capacity_millicpu
                    .ok_or_else(|| ClusterError::MissingCapacity(record.id.clone()))?;
                let cordon_stamp = if record.unschedulable {
                    record.annotations.get(CORDONED_AT_ANNOTATION).cloned()
                } else {
                    None
                };
                Ok(Node {
                    id: record.id,
                    capacity,
                    cordoned: record.unschedulable,
                    cordon_stamp,
                })
            })
            .collect::<ClusterResult<Vec<_>>>()?;
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut pods: HashMap<NodeId, Vec<Pod>> = HashMap::new();
        for record in state.pods {
            let Some(node_id) = record.node_id.clone() else {
                continue;
            };
            if !nodes.iter().any(|n| n.id == node_id) {
                continue;
            }
            let pod = Pod {
                id: record.table_key(),
                protected: rule.protects(&record),
                node_id: node_id.clone(),
                request: record.cpu_request_millicpu,
            };
            pods.entry(node_id).or_default().push(pod);
        }

        Ok(Self { nodes, pods })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn cordoned_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.cordoned).collect()
    }

    pub fn uncordoned_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| !n.cordoned).collect()
    }

    pub fn pods_on_node(&self, node_id: &str) -> &[Pod] {
        self.pods.get(node_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn protected_pods_on_node(&self, node_id: &str) -> usize {
        self.pods_on_node(node_id)
            .iter()
            .filter(|p| p.protected)
            .count()
    }

    /// Sum of pod requests on a node, protected or not. Raw units, not blocks.
    pub fn resource_in_use(&self, node_id: &str) -> u64 {
        self.pods_on_node(node_id).iter().map(|p| p.request).sum()
    }

    /// Capacity minus requests. Negative when the node is overcommitted.
    pub fn free_capacity(&self, node: &Node) -> i64 {
        node.capacity as i64 - self.resource_in_use(&node.id) as i64
    }

    /// Free capacity summed over uncordoned nodes, in raw units.
    pub fn available_capacity(&self) -> i64 {
        self.nodes
            .iter()
            .filter(|n| !n.cordoned)
            .map(|n| self.free_capacity(n))
            .sum()
    }

    /// Free capacity on uncordoned nodes, floored to whole blocks.
    pub fn available_blocks(&self, block_size: NonZeroU64) -> i64 {
        self.available_capacity()
            .div_euclid(block_size.get() as i64)
    }

    /// Per-node capacity used for planning. All nodes in the pool are
    /// assumed to be the same shape, so the first one stands in for all.
    pub fn capacity_proxy(&self) -> Option<u64> {
        self.nodes.first().map(|n| n.capacity)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
