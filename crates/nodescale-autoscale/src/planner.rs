//! Capacity planning — turns a block delta into a node-count delta.
//!
//! Growing rounds up (never under-provision); shrinking rounds down
//! (never cordon more capacity than the surplus allows). Node capacity
//! comes from a single node standing in for the whole pool.

use std::num::NonZeroU64;

use nodescale_cluster::ClusterSnapshot;
use serde::Serialize;

/// A resize request for the node pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrowthPlan {
    /// Schedulable nodes in the snapshot the plan was made from.
    pub current: u64,
    /// Nodes to add. Non-positive means there is nothing to do.
    pub add: i64,
}

impl GrowthPlan {
    pub fn target_size(&self) -> u64 {
        self.current.saturating_add_signed(self.add)
    }

    pub fn is_noop(&self) -> bool {
        self.add <= 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CapacityPlanner {
    block_size: NonZeroU64,
}

impl CapacityPlanner {
    pub fn new(block_size: NonZeroU64) -> Self {
        Self { block_size }
    }

    /// Convert a block count into raw resource units.
    pub fn units(&self, blocks: i64) -> i64 {
        blocks.saturating_mul(self.block_size.get() as i64)
    }

    /// `ceil(deficit_blocks × block_size / node_capacity)`.
    ///
    /// Returns `None` when `node_capacity` is zero.
    pub fn nodes_to_add(&self, deficit_blocks: i64, node_capacity: u64) -> Option<i64> {
        let capacity = i64::try_from(node_capacity).ok().filter(|c| *c > 0)?;
        let units = self.units(deficit_blocks);
        // Integer division truncates toward zero, which is already the
        // ceiling for non-positive quotients.
        Some(if units > 0 {
            (units - 1) / capacity + 1
        } else {
            units / capacity
        })
    }

    /// `floor(surplus_blocks × block_size / node_capacity)`.
    ///
    /// Returns `None` when `node_capacity` is zero.
    pub fn nodes_to_cordon(&self, surplus_blocks: i64, node_capacity: u64) -> Option<i64> {
        let capacity = i64::try_from(node_capacity).ok().filter(|c| *c > 0)?;
        Some(self.units(surplus_blocks).div_euclid(capacity))
    }

    /// Plan a pool resize covering `deficit_blocks`.
    ///
    /// Returns `None` if the snapshot has no node to take a capacity from.
    pub fn grow(&self, snapshot: &ClusterSnapshot, deficit_blocks: i64) -> Option<GrowthPlan> {
        let capacity = snapshot.capacity_proxy()?;
        let add = self.nodes_to_add(deficit_blocks, capacity)?;
        Some(GrowthPlan {
            current: snapshot.uncordoned_nodes().len() as u64,
            add,
        })
    }
}
