//! The node-pool backend — the machine-provisioning side of scaling.

use std::future::Future;

use nodescale_cluster::Node;

pub trait NodePool: Send + Sync {
    /// Grow the pool to `size` nodes.
    ///
    /// Requests that are not larger than the current size must be
    /// ignored rather than rejected; this call never shrinks the pool.
    fn increase_to_size(&self, size: u64) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Best-effort removal of the given nodes from the managed pool.
    fn delete_nodes(&self, nodes: &[Node]) -> impl Future<Output = anyhow::Result<()>> + Send;
}
