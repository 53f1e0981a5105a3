//! The cluster state source — the orchestrator-facing collaborator.
//!
//! The controller never talks to the orchestrator directly; it reads a
//! [`ClusterState`] and issues cordon/uncordon/deregister mutations
//! through this trait. How the cordon timestamp is persisted is up to
//! the implementation (the bundled store uses a node annotation).

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::ClusterResult;
use crate::types::ClusterState;

pub trait ClusterSource: Send + Sync {
    /// Read every node and every pod in a single fetch.
    fn fetch(&self) -> impl Future<Output = ClusterResult<ClusterState>> + Send;

    /// Mark a node unschedulable and stamp it with `at`.
    ///
    /// A node that is already cordoned keeps its original timestamp.
    fn cordon(
        &self,
        node_id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = ClusterResult<()>> + Send;

    /// Make a node schedulable again and clear its cordon timestamp.
    fn uncordon(&self, node_id: &str) -> impl Future<Output = ClusterResult<()>> + Send;

    /// Remove a node object from the cluster. Returns true if it existed.
    fn delete_node(&self, node_id: &str) -> impl Future<Output = ClusterResult<bool>> + Send;
}
