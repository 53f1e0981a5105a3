//! Scaling controller — one reconciliation tick over the node pool.
//!
//! Captures a snapshot, compares spare blocks on schedulable nodes with
//! the target buffer, then either uncordons (and if needed grows the
//! pool) or cordons. Every tick finishes by reaping cordoned nodes whose
//! grace period has elapsed.
//!
//! Any failed mutation aborts the rest of the tick. Whatever already
//! happened stays in place; the next tick starts from a fresh snapshot.

use std::sync::Arc;
use std::time::Duration;

use nodescale_cluster::{ClusterSnapshot, ClusterSource, NodeId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ScalingConfig;
use crate::error::{Operation, ScaleError, ScaleResult};
use crate::planner::CapacityPlanner;
use crate::pool::NodePool;
use crate::reaper::GracePeriodReaper;
use crate::selector;

/// What the buffer comparison led to in a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScaleOutcome {
    /// Capacity was added by uncordoning nodes and/or growing the pool.
    Grown {
        uncordoned: Vec<NodeId>,
        /// Nodes requested from the pool on top of the current size.
        added: u64,
    },
    /// Nodes were cordoned to shed spare capacity.
    Shrunk { cordoned: Vec<NodeId> },
    Unchanged,
}

/// Summary of a completed tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Spare blocks at the start of the tick.
    pub available_blocks: i64,
    pub target_buffer: i64,
    pub outcome: ScaleOutcome,
    /// Nodes removed by the reaper.
    pub deleted: Vec<NodeId>,
}

/// Keeps the node pool sized to the configured buffer.
pub struct ScalingController<S, P> {
    source: S,
    pool: P,
    config: ScalingConfig,
    planner: CapacityPlanner,
    reaper: GracePeriodReaper,
    clock: Arc<dyn Clock>,
}

impl<S: ClusterSource, P: NodePool> ScalingController<S, P> {
    /// Create a controller using the system clock.
    pub fn new(source: S, pool: P, config: ScalingConfig) -> Self {
        Self {
            planner: CapacityPlanner::new(config.block_size),
            reaper: GracePeriodReaper::new(config.grace_period, config.protection.clone()),
            source,
            pool,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    async fn snapshot(&self) -> ScaleResult<ClusterSnapshot> {
        ClusterSnapshot::capture(&self.source, &self.config.protection)
            .await
            .map_err(ScaleError::SourceUnavailable)
    }

    /// Run one reconciliation pass.
    ///
    /// Takes `&mut self` so two ticks can never overlap on one controller.
    pub async fn tick(&mut self) -> ScaleResult<TickReport> {
        let snapshot = self.snapshot().await?;
        let available = snapshot.available_blocks(self.config.block_size);
        let target = self.config.target_buffer;
        info!(
            block_size = self.config.block_size.get(),
            available,
            target,
            nodes = snapshot.len(),
            "evaluating node pool buffer"
        );

        let outcome = if available < target {
            self.grow(&snapshot, target.saturating_sub(available)).await?
        } else if available > target {
            self.shrink(&snapshot, available - target).await?
        } else {
            ScaleOutcome::Unchanged
        };

        let deleted = self
            .reaper
            .reap(&self.source, &self.pool, self.clock.now())
            .await?;
        if !deleted.is_empty() {
            info!(count = deleted.len(), "reaped cordoned nodes");
        }

        Ok(TickReport {
            available_blocks: available,
            target_buffer: target,
            outcome,
            deleted,
        })
    }

    /// Cover a deficit: uncordon first, grow the pool only if that was not enough.
    async fn grow(&self, snapshot: &ClusterSnapshot, deficit: i64) -> ScaleResult<ScaleOutcome> {
        let plan = selector::pick_to_uncordon(snapshot, deficit, &self.planner);
        if plan.candidates.is_empty() {
            info!("no cordoned nodes to uncordon");
        }

        let mut uncordoned = Vec::with_capacity(plan.candidates.len());
        for candidate in &plan.candidates {
            self.source
                .uncordon(&candidate.node_id)
                .await
                .map_err(|e| ScaleError::backend(Operation::Uncordon, candidate.node_id.as_str(), e))?;
            info!(node = %candidate.node_id, freed = candidate.freed, "uncordoned node");
            uncordoned.push(candidate.node_id.clone());
        }

        if plan.satisfied {
            return Ok(ScaleOutcome::Grown {
                uncordoned,
                added: 0,
            });
        }

        // Cordon state may have changed; the old numbers are stale.
        let snapshot = self.snapshot().await?;
        let available = snapshot.available_blocks(self.config.block_size);
        let deficit = self.config.target_buffer.saturating_sub(available);

        let added = match self.planner.grow(&snapshot, deficit) {
            None => {
                warn!(deficit, "no node to size the pool from, cannot increase nodes");
                0
            }
            Some(growth) if growth.is_noop() => {
                warn!(add = growth.add, "cannot increase nodes by a zero or negative count");
                0
            }
            Some(growth) => {
                let size = growth.target_size();
                info!(
                    current = growth.current,
                    add = growth.add,
                    size,
                    deficit,
                    "increasing node pool"
                );
                self.pool
                    .increase_to_size(size)
                    .await
                    .map_err(|e| ScaleError::backend(Operation::IncreasePool, size.to_string(), e))?;
                growth.add as u64
            }
        };

        if uncordoned.is_empty() && added == 0 {
            return Ok(ScaleOutcome::Unchanged);
        }
        Ok(ScaleOutcome::Grown { uncordoned, added })
    }

    /// Shed a surplus by cordoning whole nodes.
    async fn shrink(&self, snapshot: &ClusterSnapshot, surplus: i64) -> ScaleResult<ScaleOutcome> {
        let picked = selector::pick_to_cordon(snapshot, surplus, &self.planner);
        if picked.is_empty() {
            info!(surplus, "no nodes to be cordoned");
            return Ok(ScaleOutcome::Unchanged);
        }

        info!(count = picked.len(), surplus, "cordoning nodes");
        let now = self.clock.now();
        let mut cordoned = Vec::with_capacity(picked.len());
        for node_id in picked {
            if snapshot.node(&node_id).is_some_and(|n| n.cordoned) {
                debug!(node = %node_id, "already cordoned, keeping its timestamp");
                continue;
            }
            self.source
                .cordon(&node_id, now)
                .await
                .map_err(|e| ScaleError::backend(Operation::Cordon, node_id.as_str(), e))?;
            info!(node = %node_id, "cordoned node");
            cordoned.push(node_id);
        }

        if cordoned.is_empty() {
            return Ok(ScaleOutcome::Unchanged);
        }
        Ok(ScaleOutcome::Shrunk { cordoned })
    }

    /// Run ticks back to back every `interval` until shutdown is signalled.
    ///
    /// A failed tick is logged; the next one starts from fresh state.
    pub async fn run(&mut self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "node scaler started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match self.tick().await {
                        Ok(report) => debug!(?report, "scaling tick completed"),
                        Err(e) => tracing::error!(error = %e, "scaling tick failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("node scaler shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};
    use nodescale_cluster::{
        CORDONED_AT_ANNOTATION, ClusterError, ClusterResult, ClusterState, ClusterStore, Node,
        NodeRecord, PodRecord, ProtectionRule,
    };

    use crate::clock::ManualClock;

    // ── Fakes ──────────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum PoolCall {
        Increase(u64),
        Delete(Vec<String>),
    }

    #[derive(Default)]
    struct RecordingPool {
        calls: Mutex<Vec<PoolCall>>,
        fail: bool,
    }

    impl RecordingPool {
        fn calls(&self) -> Vec<PoolCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl NodePool for RecordingPool {
        async fn increase_to_size(&self, size: u64) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(PoolCall::Increase(size));
            if self.fail {
                anyhow::bail!("pool backend down");
            }
            Ok(())
        }

        async fn delete_nodes(&self, nodes: &[Node]) -> anyhow::Result<()> {
            let ids = nodes.iter().map(|n| n.id.clone()).collect();
            self.calls.lock().unwrap().push(PoolCall::Delete(ids));
            if self.fail {
                anyhow::bail!("pool backend down");
            }
            Ok(())
        }
    }

    /// Wraps a store, records every mutation and fails on request.
    struct FlakySource {
        store: ClusterStore,
        fail_fetch: bool,
        fail_on: Option<String>,
        mutations: Mutex<Vec<String>>,
    }

    impl FlakySource {
        fn new(store: ClusterStore) -> Self {
            Self {
                store,
                fail_fetch: false,
                fail_on: None,
                mutations: Mutex::new(Vec::new()),
            }
        }

        fn mutations(&self) -> Vec<String> {
            self.mutations.lock().unwrap().clone()
        }

        fn record(&self, call: String, node_id: &str) -> ClusterResult<()> {
            self.mutations.lock().unwrap().push(call);
            if self.fail_on.as_deref() == Some(node_id) {
                return Err(ClusterError::Write("conflict".to_string()));
            }
            Ok(())
        }
    }

    impl ClusterSource for FlakySource {
        async fn fetch(&self) -> ClusterResult<ClusterState> {
            if self.fail_fetch {
                return Err(ClusterError::Read("api server unreachable".to_string()));
            }
            self.store.read_state()
        }

        async fn cordon(&self, node_id: &str, at: DateTime<Utc>) -> ClusterResult<()> {
            self.record(format!("cordon {node_id}"), node_id)?;
            self.store.set_cordoned(node_id, at)
        }

        async fn uncordon(&self, node_id: &str) -> ClusterResult<()> {
            self.record(format!("uncordon {node_id}"), node_id)?;
            self.store.clear_cordoned(node_id)
        }

        async fn delete_node(&self, node_id: &str) -> ClusterResult<bool> {
            self.record(format!("delete {node_id}"), node_id)?;
            self.store.remove_node(node_id)
        }
    }

    // ── Fixtures ───────────────────────────────────────────────────

    const T0: i64 = 1_700_000_000;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn config(target: i64) -> ScalingConfig {
        ScalingConfig::new(100, target, Duration::from_secs(600), ProtectionRule::default())
            .unwrap()
    }

    fn open(id: &str) -> NodeRecord {
        NodeRecord::new(id, 1000)
    }

    fn cordoned(id: &str, since: i64) -> NodeRecord {
        let mut n = NodeRecord::new(id, 1000);
        n.unschedulable = true;
        n.annotations
            .insert(CORDONED_AT_ANNOTATION.to_string(), at(since).to_rfc3339());
        n
    }

    fn load(node: &str, cpu: u64, protected: bool) -> PodRecord {
        let mut labels = HashMap::new();
        if protected {
            labels.insert("sessions".to_string(), "game".to_string());
        }
        PodRecord {
            namespace: "games".to_string(),
            name: format!("{node}-{cpu}-{protected}"),
            node_id: Some(node.to_string()),
            cpu_request_millicpu: cpu,
            labels,
        }
    }

    fn controller(
        nodes: Vec<NodeRecord>,
        pods: Vec<PodRecord>,
        target: i64,
    ) -> ScalingController<FlakySource, RecordingPool> {
        let store = ClusterStore::open_in_memory().unwrap();
        store.load_state(&ClusterState { nodes, pods }).unwrap();
        ScalingController::new(FlakySource::new(store), RecordingPool::default(), config(target))
            .with_clock(Arc::new(ManualClock::new(at(T0))))
    }

    fn node(ctl: &ScalingController<FlakySource, RecordingPool>, id: &str) -> Option<NodeRecord> {
        ctl.source().store.get_node(id).unwrap()
    }

    // ── Buffer comparison ──────────────────────────────────────────

    #[tokio::test]
    async fn ample_buffer_never_grows() {
        // 3 idle nodes = 30 blocks against a buffer of 5.
        let mut ctl = controller(vec![open("a"), open("b"), open("c")], vec![], 5);
        let report = ctl.tick().await.unwrap();

        assert_eq!(report.available_blocks, 30);
        assert!(!matches!(report.outcome, ScaleOutcome::Grown { .. }));
        assert!(ctl.pool().calls().is_empty());
        assert!(!ctl.source().mutations().iter().any(|m| m.starts_with("uncordon")));
    }

    #[tokio::test]
    async fn uncordon_covers_deficit_without_pool_growth() {
        // a: 300m free = 3 blocks. c: cordoned, frees 400m = 4 blocks.
        let mut ctl = controller(
            vec![open("a"), cordoned("c", T0 - 60)],
            vec![load("a", 700, true), load("c", 600, true)],
            5,
        );
        let report = ctl.tick().await.unwrap();

        assert_eq!(report.available_blocks, 3);
        assert_eq!(
            report.outcome,
            ScaleOutcome::Grown {
                uncordoned: vec!["c".to_string()],
                added: 0
            }
        );
        assert!(ctl.pool().calls().is_empty());
        assert!(!node(&ctl, "c").unwrap().unschedulable);
    }

    #[tokio::test]
    async fn deficit_without_cordoned_nodes_grows_pool_once() {
        // 3 blocks free, buffer 5 → 200m short → ceil(200/1000) = 1 node.
        let mut ctl = controller(vec![open("a")], vec![load("a", 700, false)], 5);
        let report = ctl.tick().await.unwrap();

        assert_eq!(
            report.outcome,
            ScaleOutcome::Grown {
                uncordoned: vec![],
                added: 1
            }
        );
        assert_eq!(ctl.pool().calls(), vec![PoolCall::Increase(2)]);
    }

    #[tokio::test]
    async fn partial_uncordon_resnapshots_before_growing() {
        // a full, b cordoned with 200m free. Deficit 5 blocks; b covers 2,
        // the fresh snapshot sees 2 available and grows by ceil(300/1000).
        let mut ctl = controller(
            vec![open("a"), cordoned("b", T0 - 60)],
            vec![load("a", 1000, true), load("b", 800, true)],
            5,
        );
        let report = ctl.tick().await.unwrap();

        assert_eq!(
            report.outcome,
            ScaleOutcome::Grown {
                uncordoned: vec!["b".to_string()],
                added: 1
            }
        );
        assert_eq!(ctl.pool().calls(), vec![PoolCall::Increase(3)]);
    }

    #[tokio::test]
    async fn surplus_below_one_node_cordons_nothing() {
        // 8 blocks free, buffer 5 → 300m surplus < 1000m node.
        let mut ctl = controller(vec![open("a")], vec![load("a", 200, false)], 5);
        let report = ctl.tick().await.unwrap();

        assert_eq!(report.available_blocks, 8);
        assert_eq!(report.outcome, ScaleOutcome::Unchanged);
        assert!(ctl.source().mutations().is_empty());
        assert!(!node(&ctl, "a").unwrap().unschedulable);
    }

    #[tokio::test]
    async fn surplus_cordons_emptiest_nodes_with_timestamp() {
        let mut ctl = controller(
            vec![open("busy"), open("idle"), open("quiet")],
            vec![load("busy", 100, true), load("busy", 200, true), load("quiet", 100, true)],
            10,
        );
        // 2600m free = 26 blocks; surplus 16 → floor(1600/1000) = 1.
        let report = ctl.tick().await.unwrap();

        assert_eq!(
            report.outcome,
            ScaleOutcome::Shrunk {
                cordoned: vec!["idle".to_string()]
            }
        );
        let idle = node(&ctl, "idle").unwrap();
        assert!(idle.unschedulable);
        assert_eq!(
            idle.annotations.get(CORDONED_AT_ANNOTATION),
            Some(&"2023-11-14T22:13:20Z".to_string())
        );
    }

    #[tokio::test]
    async fn already_cordoned_selection_keeps_stamp() {
        let mut ctl = controller(
            vec![open("a"), open("b"), cordoned("parked", T0 - 60)],
            vec![load("a", 100, true), load("b", 100, true)],
            5,
        );
        // 1800m free = 18 blocks; surplus 13 → 1 node, and "parked" has fewest pods.
        let report = ctl.tick().await.unwrap();

        assert_eq!(report.outcome, ScaleOutcome::Unchanged);
        assert!(ctl.source().mutations().is_empty());
        let parked = node(&ctl, "parked").unwrap();
        assert_eq!(
            parked.annotations.get(CORDONED_AT_ANNOTATION),
            Some(&at(T0 - 60).to_rfc3339())
        );
    }

    #[tokio::test]
    async fn recordon_replaces_stale_stamp_left_on_schedulable_node() {
        // "a" was uncordoned outside the controller and still carries an
        // hour-old stamp. Cordoning it again must restart its grace period.
        let mut stale = open("a");
        stale
            .annotations
            .insert(CORDONED_AT_ANNOTATION.to_string(), at(T0 - 3_600).to_rfc3339());
        let mut ctl = controller(vec![stale, open("b")], vec![], 10);

        // 20 blocks, surplus 10 → one node; tie on pod count goes to "a".
        let report = ctl.tick().await.unwrap();
        assert_eq!(
            report.outcome,
            ScaleOutcome::Shrunk {
                cordoned: vec!["a".to_string()]
            }
        );
        assert!(report.deleted.is_empty());
        assert!(ctl.pool().calls().is_empty());

        let a = node(&ctl, "a").unwrap();
        assert!(a.unschedulable);
        assert_eq!(
            a.annotations.get(CORDONED_AT_ANNOTATION),
            Some(&"2023-11-14T22:13:20Z".to_string())
        );
    }

    #[tokio::test]
    async fn huge_buffer_against_overcommitted_node_saturates() {
        // 1500m requested on a 1000m node: -5 blocks available.
        let mut ctl = controller(vec![open("a")], vec![load("a", 1500, true)], i64::MAX);
        let report = ctl.tick().await.unwrap();

        assert_eq!(report.available_blocks, -5);
        assert!(matches!(report.outcome, ScaleOutcome::Grown { added, .. } if added > 0));
        assert_eq!(ctl.pool().calls().len(), 1);
    }

    // ── Reaping ────────────────────────────────────────────────────

    #[tokio::test]
    async fn reaps_only_unprotected_expired_nodes() {
        // a: 500m free = 5 blocks = buffer, so only the reaper acts.
        let mut ctl = controller(
            vec![
                open("a"),
                cordoned("guarded", T0 - 3_600),
                cordoned("idle", T0 - 3_600),
                cordoned("fresh", T0 - 60),
            ],
            vec![
                load("a", 500, true),
                load("guarded", 100, true),
                load("idle", 100, false),
            ],
            5,
        );
        let report = ctl.tick().await.unwrap();

        assert_eq!(report.outcome, ScaleOutcome::Unchanged);
        assert_eq!(report.deleted, vec!["idle".to_string()]);
        assert_eq!(
            ctl.pool().calls(),
            vec![PoolCall::Delete(vec!["idle".to_string()])]
        );
        assert!(node(&ctl, "idle").is_none());
        assert!(node(&ctl, "guarded").is_some());
        assert!(node(&ctl, "fresh").is_some());
    }

    #[tokio::test]
    async fn reap_runs_after_growth() {
        let mut ctl = controller(
            vec![open("a"), cordoned("old", T0 - 3_600)],
            vec![load("a", 900, true), load("old", 1000, true)],
            5,
        );
        // "old" is uncordoned first, so it is no longer a reap candidate.
        let report = ctl.tick().await.unwrap();
        assert!(report.deleted.is_empty());
        assert!(node(&ctl, "old").is_some());
    }

    #[tokio::test]
    async fn malformed_cordon_stamp_fails_tick() {
        let mut broken = open("broken");
        broken.unschedulable = true;
        let mut ctl = controller(vec![open("a"), broken], vec![load("a", 500, true)], 5);

        let err = ctl.tick().await.unwrap_err();
        assert!(matches!(err, ScaleError::MalformedNodeState { ref node, .. } if node == "broken"));
        assert!(ctl.pool().calls().is_empty());
    }

    // ── Failure handling ───────────────────────────────────────────

    #[tokio::test]
    async fn unavailable_source_aborts_before_mutating() {
        let mut ctl = controller(vec![open("a")], vec![], 50);
        ctl.source.fail_fetch = true;

        let err = ctl.tick().await.unwrap_err();
        assert!(matches!(err, ScaleError::SourceUnavailable(_)));
        assert!(ctl.source().mutations().is_empty());
        assert!(ctl.pool().calls().is_empty());
    }

    #[tokio::test]
    async fn missing_capacity_is_source_unavailable() {
        let mut bad = open("a");
        bad.capacity_millicpu = None;
        let mut ctl = controller(vec![bad], vec![], 5);

        let err = ctl.tick().await.unwrap_err();
        assert!(matches!(
            err,
            ScaleError::SourceUnavailable(ClusterError::MissingCapacity(_))
        ));
    }

    #[tokio::test]
    async fn failed_uncordon_keeps_earlier_progress() {
        // Needs both x (700m used) and y (600m used) to cover 6 blocks.
        let mut ctl = controller(
            vec![open("a"), cordoned("x", T0 - 60), cordoned("y", T0 - 60)],
            vec![load("a", 1000, true), load("x", 700, true), load("y", 600, true)],
            6,
        );
        ctl.source.fail_on = Some("y".to_string());

        let err = ctl.tick().await.unwrap_err();
        assert!(matches!(
            err,
            ScaleError::BackendRequestFailed { operation: Operation::Uncordon, ref target, .. }
                if target == "y"
        ));
        assert!(!node(&ctl, "x").unwrap().unschedulable);
        assert!(node(&ctl, "y").unwrap().unschedulable);
        assert!(ctl.pool().calls().is_empty());
    }

    #[tokio::test]
    async fn failed_cordon_keeps_earlier_progress() {
        // 30 blocks against a buffer of 5 → surplus 25 → cordon "a" then "b".
        let mut ctl = controller(vec![open("a"), open("b"), open("c")], vec![], 5);
        ctl.source.fail_on = Some("b".to_string());

        let err = ctl.tick().await.unwrap_err();
        assert!(matches!(
            err,
            ScaleError::BackendRequestFailed { operation: Operation::Cordon, ref target, .. }
                if target == "b"
        ));
        assert!(node(&ctl, "a").unwrap().unschedulable);
        assert!(!node(&ctl, "b").unwrap().unschedulable);
        assert!(!node(&ctl, "c").unwrap().unschedulable);
        assert_eq!(ctl.source().mutations(), ["cordon a", "cordon b"]);
        assert!(ctl.pool().calls().is_empty());
    }

    #[tokio::test]
    async fn failed_pool_increase_skips_reap() {
        let mut ctl = controller(
            vec![open("a"), cordoned("gone", T0 - 3_600)],
            vec![load("a", 1000, true), load("gone", 1000, true)],
            5,
        );
        ctl.pool.fail = true;

        let err = ctl.tick().await.unwrap_err();
        assert!(matches!(
            err,
            ScaleError::BackendRequestFailed { operation: Operation::IncreasePool, .. }
        ));
        assert_eq!(ctl.pool().calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_pool_delete_keeps_node_registered() {
        let mut ctl = controller(
            vec![open("a"), cordoned("idle", T0 - 3_600)],
            vec![load("a", 500, true)],
            5,
        );
        ctl.pool.fail = true;

        let err = ctl.tick().await.unwrap_err();
        assert!(matches!(
            err,
            ScaleError::BackendRequestFailed { operation: Operation::DeleteNodes, .. }
        ));
        assert!(node(&ctl, "idle").is_some());
    }

    // ── Idempotence ────────────────────────────────────────────────

    #[tokio::test]
    async fn second_tick_without_changes_is_quiet() {
        // 20 blocks against a buffer of 10: first tick cordons one node.
        let mut ctl = controller(vec![open("a"), open("b")], vec![], 10);

        let first = ctl.tick().await.unwrap();
        assert_eq!(
            first.outcome,
            ScaleOutcome::Shrunk {
                cordoned: vec!["a".to_string()]
            }
        );
        let mutations = ctl.source().mutations().len();

        let second = ctl.tick().await.unwrap();
        assert_eq!(second.available_blocks, 10);
        assert_eq!(second.outcome, ScaleOutcome::Unchanged);
        assert!(second.deleted.is_empty());
        assert_eq!(ctl.source().mutations().len(), mutations);
        assert!(ctl.pool().calls().is_empty());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let mut ctl = controller(vec![open("a")], vec![], 10);
        let (tx, rx) = tokio::sync::watch::channel(false);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), ctl.run(Duration::from_secs(3_600), rx))
            .await
            .unwrap();
    }
}
