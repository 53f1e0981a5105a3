//! Grace-period reaper — permanently removes cordoned nodes.
//!
//! A cordoned node is deleted once its grace period has elapsed and it
//! no longer hosts any protected pod. Unprotected pods do not hold a
//! node back. Candidates are handed to the node pool as one batch, then
//! deregistered from the cluster.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use nodescale_cluster::{ClusterResult, ClusterSnapshot, ClusterSource, Node, ProtectionRule};
use tracing::{debug, info};

use crate::error::{Operation, ScaleError, ScaleResult};
use crate::pool::NodePool;

#[derive(Debug, Clone)]
pub struct GracePeriodReaper {
    grace_period: TimeDelta,
    protection: ProtectionRule,
}

impl GracePeriodReaper {
    pub fn new(grace_period: Duration, protection: ProtectionRule) -> Self {
        Self {
            grace_period: TimeDelta::from_std(grace_period).unwrap_or(TimeDelta::MAX),
            protection,
        }
    }

    /// Cordoned nodes in `snapshot` that may be deleted at `now`.
    ///
    /// Fails on the first cordoned node whose cordon timestamp cannot be
    /// read; nothing is skipped silently.
    pub fn select(&self, snapshot: &ClusterSnapshot, now: DateTime<Utc>) -> ClusterResult<Vec<Node>> {
        let mut doomed = Vec::new();
        for node in snapshot.cordoned_nodes() {
            let cordoned_at = node.cordoned_at()?;
            let expires_at = cordoned_at
                .checked_add_signed(self.grace_period)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            let protected = snapshot.protected_pods_on_node(&node.id);

            if protected > 0 {
                debug!(node = %node.id, protected, "cordoned node still hosts protected pods");
                continue;
            }
            if expires_at > now {
                debug!(node = %node.id, %expires_at, "grace period not yet elapsed");
                continue;
            }
            doomed.push(node.clone());
        }
        Ok(doomed)
    }

    /// Capture a fresh snapshot, then delete every eligible node.
    ///
    /// Returns the ids of the nodes removed. No backend call is made when
    /// nothing qualifies.
    pub async fn reap<S, P>(&self, source: &S, pool: &P, now: DateTime<Utc>) -> ScaleResult<Vec<String>>
    where
        S: ClusterSource,
        P: NodePool,
    {
        let snapshot = ClusterSnapshot::capture(source, &self.protection)
            .await
            .map_err(ScaleError::SourceUnavailable)?;
        let doomed = self.select(&snapshot, now)?;
        if doomed.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = doomed.iter().map(|n| n.id.clone()).collect();
        info!(nodes = ?ids, "deleting cordoned nodes past their grace period");

        pool.delete_nodes(&doomed)
            .await
            .map_err(|e| ScaleError::backend(Operation::DeleteNodes, ids.join(","), e))?;

        for id in &ids {
            source
                .delete_node(id)
                .await
                .map_err(|e| ScaleError::backend(Operation::Deregister, id.as_str(), e))?;
        }

        Ok(ids)
    }
}
