//! Simulated node pool backed by the local cluster store.
//!
//! Stands in for a cloud instance group: growing the pool writes new
//! schedulable node records, deleting removes them. Lets the daemon run
//! the full scaling loop without a cloud provider.

use nodescale_autoscale::NodePool;
use nodescale_cluster::{ClusterStore, Node, NodeRecord};
use tracing::{debug, info};

use crate::config::PoolSection;

pub struct StoreNodePool {
    store: ClusterStore,
    node_capacity: u64,
    name_prefix: String,
}

impl StoreNodePool {
    pub fn new(store: ClusterStore, pool: &PoolSection) -> Self {
        Self {
            store,
            node_capacity: pool.node_capacity,
            name_prefix: pool.name_prefix.clone(),
        }
    }

    /// First `{prefix}-{n}` name not already taken.
    fn next_name(&self, from: u64) -> anyhow::Result<(String, u64)> {
        let mut n = from;
        loop {
            let name = format!("{}-{n}", self.name_prefix);
            if self.store.get_node(&name)?.is_none() {
                return Ok((name, n + 1));
            }
            n += 1;
        }
    }
}

impl NodePool for StoreNodePool {
    async fn increase_to_size(&self, size: u64) -> anyhow::Result<()> {
        let current = self.store.list_nodes()?.len() as u64;
        if size <= current {
            debug!(size, current, "ignoring pool resize that does not grow");
            return Ok(());
        }

        let mut cursor = current;
        for _ in current..size {
            let (name, next) = self.next_name(cursor)?;
            cursor = next;
            self.store
                .put_node(&NodeRecord::new(name.as_str(), self.node_capacity))?;
            info!(node = %name, capacity = self.node_capacity, "provisioned node");
        }
        Ok(())
    }

    async fn delete_nodes(&self, nodes: &[Node]) -> anyhow::Result<()> {
        for node in nodes {
            if self.store.remove_node(&node.id)? {
                info!(node = %node.id, "released node");
            }
        }
        Ok(())
    }
}
