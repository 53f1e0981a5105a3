//! Raw cluster records as reported by the cluster state source.
//!
//! These are the unvalidated shapes the orchestrator hands back. They
//! are JSON-serialized into the store tables and into seed fixtures.
//! Validation (capacity present, protection classification) happens
//! when a [`ClusterSnapshot`](crate::ClusterSnapshot) is built from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a node in the cluster.
pub type NodeId = String;

/// Unique identifier for a pod (`{namespace}/{name}`).
pub type PodId = String;

/// Annotation key holding the RFC 3339 time a node was cordoned.
pub const CORDONED_AT_ANNOTATION: &str = "nodescale.io/cordoned-at";

// ── Node ──────────────────────────────────────────────────────────

/// A worker machine as reported by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,
    /// Total allocatable CPU in millicores. `None` when the orchestrator
    /// has not reported it yet.
    pub capacity_millicpu: Option<u64>,
    /// Whether new work is barred from scheduling here.
    #[serde(default)]
    pub unschedulable: bool,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl NodeRecord {
    /// A schedulable node with the given capacity.
    pub fn new(id: impl Into<NodeId>, capacity_millicpu: u64) -> Self {
        Self {
            id: id.into(),
            capacity_millicpu: Some(capacity_millicpu),
            unschedulable: false,
            annotations: HashMap::new(),
            labels: HashMap::new(),
        }
    }
}

// ── Pod ───────────────────────────────────────────────────────────

/// A unit of work, optionally bound to a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodRecord {
    pub namespace: String,
    pub name: String,
    /// Node the pod is bound to; `None` while pending.
    pub node_id: Option<NodeId>,
    /// CPU request in millicores.
    #[serde(default)]
    pub cpu_request_millicpu: u64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl PodRecord {
    /// Composite key used for storage.
    pub fn table_key(&self) -> PodId {
        format!("{}/{}", self.namespace, self.name)
    }
}

// ── Protection ────────────────────────────────────────────────────

/// Label selector marking pods that host an active session and must
/// never be disrupted by node deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtectionRule {
    pub label: String,
    pub value: String,
}

impl ProtectionRule {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// True if the pod carries the protecting label with the expected value.
    pub fn protects(&self, pod: &PodRecord) -> bool {
        pod.labels.get(&self.label).is_some_and(|v| *v == self.value)
    }
}

impl Default for ProtectionRule {
    fn default() -> Self {
        Self::new("sessions", "game")
    }
}

// ── Full state ────────────────────────────────────────────────────

/// Every node and pod, read in one fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterState {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub pods: Vec<PodRecord>,
}
