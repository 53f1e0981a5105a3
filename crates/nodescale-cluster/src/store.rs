//! ClusterStore — redb-backed cluster state for local operation and tests.
//!
//! Stands in for the orchestrator: nodes and pods are JSON-serialized
//! into redb's `&[u8]` value columns, and cordon state is written the
//! way the controller expects to find it (the `unschedulable` flag plus
//! the [`CORDONED_AT_ANNOTATION`] timestamp). Supports both on-disk and
//! in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, Table};
use tracing::debug;

use crate::error::{ClusterError, ClusterResult};
use crate::source::ClusterSource;
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `ClusterError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| ClusterError::$variant(e.to_string())
    };
}

/// Thread-safe cluster store backed by redb.
#[derive(Clone)]
pub struct ClusterStore {
    db: Arc<Database>,
}

impl ClusterStore {
    /// Open (or create) a persistent cluster store at the given path.
    pub fn open(path: &Path) -> ClusterResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "cluster store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory cluster store (for testing).
    pub fn open_in_memory() -> ClusterResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory cluster store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> ClusterResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(NODES).map_err(map_err!(Table))?;
        txn.open_table(PODS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Whole state ────────────────────────────────────────────────

    /// Read all nodes and pods inside one read transaction.
    pub fn read_state(&self) -> ClusterResult<ClusterState> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let nodes_table = txn.open_table(NODES).map_err(map_err!(Table))?;
        let pods_table = txn.open_table(PODS).map_err(map_err!(Table))?;

        let mut state = ClusterState::default();
        for entry in nodes_table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let node: NodeRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            state.nodes.push(node);
        }
        for entry in pods_table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let pod: PodRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            state.pods.push(pod);
        }
        Ok(state)
    }

    /// Replace everything in the store with `state`.
    pub fn load_state(&self, state: &ClusterState) -> ClusterResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut nodes = txn.open_table(NODES).map_err(map_err!(Table))?;
            clear_table(&mut nodes)?;
            for node in &state.nodes {
                let value = serde_json::to_vec(node).map_err(map_err!(Serialize))?;
                nodes
                    .insert(node.id.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }

            let mut pods = txn.open_table(PODS).map_err(map_err!(Table))?;
            clear_table(&mut pods)?;
            for pod in &state.pods {
                let key = pod.table_key();
                let value = serde_json::to_vec(pod).map_err(map_err!(Serialize))?;
                pods.insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            nodes = state.nodes.len(),
            pods = state.pods.len(),
            "cluster state loaded"
        );
        Ok(())
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Insert or update a node record.
    pub fn put_node(&self, node: &NodeRecord) -> ClusterResult<()> {
        let value = serde_json::to_vec(node).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            table
                .insert(node.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(node = %node.id, "node stored");
        Ok(())
    }

    /// Get a node by ID.
    pub fn get_node(&self, node_id: &str) -> ClusterResult<Option<NodeRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(NODES).map_err(map_err!(Table))?;
        match table.get(node_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let node: NodeRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// List all nodes.
    pub fn list_nodes(&self) -> ClusterResult<Vec<NodeRecord>> {
        Ok(self.read_state()?.nodes)
    }

    /// Delete a node and every pod bound to it. Returns true if the node existed.
    pub fn remove_node(&self, node_id: &str) -> ClusterResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut nodes = txn.open_table(NODES).map_err(map_err!(Table))?;
            existed = nodes.remove(node_id).map_err(map_err!(Write))?.is_some();

            let mut pods = txn.open_table(PODS).map_err(map_err!(Table))?;
            let mut bound = Vec::new();
            for entry in pods.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let pod: PodRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if pod.node_id.as_deref() == Some(node_id) {
                    bound.push(key.value().to_string());
                }
            }
            for key in &bound {
                pods.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        if existed {
            debug!(node = %node_id, "node removed");
        }
        Ok(existed)
    }

    /// Apply `f` to a stored node inside one write transaction.
    fn update_node<F>(&self, node_id: &str, f: F) -> ClusterResult<()>
    where
        F: FnOnce(&mut NodeRecord),
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            let mut node: NodeRecord = match table.get(node_id).map_err(map_err!(Read))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(ClusterError::NodeNotFound(node_id.to_string())),
            };
            f(&mut node);
            let value = serde_json::to_vec(&node).map_err(map_err!(Serialize))?;
            table
                .insert(node_id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Mark a node unschedulable and stamp it with `at`.
    ///
    /// A node that is already cordoned keeps its stamp. A stamp left on a
    /// schedulable node is stale and gets overwritten.
    pub fn set_cordoned(&self, node_id: &str, at: DateTime<Utc>) -> ClusterResult<()> {
        self.update_node(node_id, |node| {
            let keep_stamp =
                node.unschedulable && node.annotations.contains_key(CORDONED_AT_ANNOTATION);
            node.unschedulable = true;
            if !keep_stamp {
                node.annotations.insert(
                    CORDONED_AT_ANNOTATION.to_string(),
                    at.to_rfc3339_opts(SecondsFormat::Secs, true),
                );
            }
        })?;
        debug!(node = %node_id, "node cordoned");
        Ok(())
    }

    /// Make a node schedulable and drop its cordon stamp.
    pub fn clear_cordoned(&self, node_id: &str) -> ClusterResult<()> {
        self.update_node(node_id, |node| {
            node.unschedulable = false;
            node.annotations.remove(CORDONED_AT_ANNOTATION);
        })?;
        debug!(node = %node_id, "node uncordoned");
        Ok(())
    }

    // ── Pods ───────────────────────────────────────────────────────

    /// Insert or update a pod record.
    pub fn put_pod(&self, pod: &PodRecord) -> ClusterResult<()> {
        let key = pod.table_key();
        let value = serde_json::to_vec(pod).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PODS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "pod stored");
        Ok(())
    }

    /// Delete a pod by `{namespace}/{name}`. Returns true if it existed.
    pub fn delete_pod(&self, key: &str) -> ClusterResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(PODS).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }
}

/// Remove every row from a string-keyed table.
fn clear_table(table: &mut Table<'_, &'static str, &'static [u8]>) -> ClusterResult<()> {
    let mut keys = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (key, _) = entry.map_err(map_err!(Read))?;
        keys.push(key.value().to_string());
    }
    for key in &keys {
        table.remove(key.as_str()).map_err(map_err!(Write))?;
    }
    Ok(())
}

impl ClusterSource for ClusterStore {
    async fn fetch(&self) -> ClusterResult<ClusterState> {
        self.read_state()
    }

    async fn cordon(&self, node_id: &str, at: DateTime<Utc>) -> ClusterResult<()> {
        self.set_cordoned(node_id, at)
    }

    async fn uncordon(&self, node_id: &str) -> ClusterResult<()> {
        self.clear_cordoned(node_id)
    }

    async fn delete_node(&self, node_id: &str) -> ClusterResult<bool> {
        self.remove_node(node_id)
    }
}
