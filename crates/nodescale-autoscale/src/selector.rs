//! Node selection — which nodes to uncordon or cordon.
//!
//! Pure functions over a [`ClusterSnapshot`]; nothing here performs I/O.
//! The controller executes the returned plans in order.
//!
//! - **Uncordon**: cordoned nodes, most heavily loaded first. A loaded
//!   node frees the most capacity per uncordon once it is schedulable.
//! - **Cordon**: all nodes, fewest pods first, so the fewest workloads
//!   are disturbed.
//!
//! Ties fall back to node id so repeated runs pick the same nodes.

use std::cmp::Ordering;

use nodescale_cluster::{ClusterSnapshot, Node, NodeId};
use serde::Serialize;
use tracing::debug;

use crate::planner::CapacityPlanner;

/// Orders nodes by decreasing resource in use.
pub fn by_utilization_desc(snapshot: &ClusterSnapshot, a: &Node, b: &Node) -> Ordering {
    snapshot
        .resource_in_use(&b.id)
        .cmp(&snapshot.resource_in_use(&a.id))
        .then_with(|| a.id.cmp(&b.id))
}

/// Orders nodes by increasing pod count.
pub fn by_pod_count_asc(snapshot: &ClusterSnapshot, a: &Node, b: &Node) -> Ordering {
    snapshot
        .pods_on_node(&a.id)
        .len()
        .cmp(&snapshot.pods_on_node(&b.id).len())
        .then_with(|| a.id.cmp(&b.id))
}

/// A cordoned node chosen to become schedulable again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncordonCandidate {
    pub node_id: NodeId,
    /// Capacity minus requests, in raw units.
    pub freed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncordonPlan {
    /// Nodes to uncordon, in order.
    pub candidates: Vec<UncordonCandidate>,
    /// Whether uncordoning every candidate covers the deficit.
    pub satisfied: bool,
}

/// Choose cordoned nodes to uncordon until `deficit_blocks` is covered.
///
/// The deficit is converted to raw units once and then drawn down by each
/// candidate's free capacity; selection stops as soon as it reaches zero.
/// Running out of cordoned nodes first yields `satisfied = false`.
pub fn pick_to_uncordon(
    snapshot: &ClusterSnapshot,
    deficit_blocks: i64,
    planner: &CapacityPlanner,
) -> UncordonPlan {
    if deficit_blocks <= 0 {
        return UncordonPlan {
            candidates: Vec::new(),
            satisfied: true,
        };
    }

    let mut cordoned = snapshot.cordoned_nodes();
    cordoned.sort_by(|a, b| by_utilization_desc(snapshot, a, b));

    let mut remaining = planner.units(deficit_blocks);
    let mut candidates = Vec::new();
    for node in cordoned {
        let freed = snapshot.free_capacity(node);
        remaining = remaining.saturating_sub(freed);
        debug!(node = %node.id, freed, remaining, "selected node to uncordon");
        candidates.push(UncordonCandidate {
            node_id: node.id.clone(),
            freed,
        });
        if remaining <= 0 {
            return UncordonPlan {
                candidates,
                satisfied: true,
            };
        }
    }

    UncordonPlan {
        candidates,
        satisfied: false,
    }
}

/// Choose nodes to cordon for `surplus_blocks` of spare capacity.
///
/// Never returns more than `floor(surplus × block_size / node_capacity)`
/// nodes. Already-cordoned nodes are eligible, same as any other.
pub fn pick_to_cordon(
    snapshot: &ClusterSnapshot,
    surplus_blocks: i64,
    planner: &CapacityPlanner,
) -> Vec<NodeId> {
    let Some(capacity) = snapshot.capacity_proxy() else {
        return Vec::new();
    };
    let count = match planner.nodes_to_cordon(surplus_blocks, capacity) {
        Some(n) if n > 0 => n as usize,
        _ => return Vec::new(),
    };

    let mut nodes: Vec<&Node> = snapshot.nodes().iter().collect();
    nodes.sort_by(|a, b| by_pod_count_asc(snapshot, a, b));
    nodes.into_iter().take(count).map(|n| n.id.clone()).collect()
}
