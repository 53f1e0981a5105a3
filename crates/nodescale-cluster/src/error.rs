//! Error types for the nodescale cluster model.

use thiserror::Error;

/// Result type alias for cluster state operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors that can occur while reading or mutating cluster state.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("failed to open cluster store: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A node reported no allocatable capacity; snapshots refuse to
    /// guess one.
    #[error("node {0} has no capacity data")]
    MissingCapacity(String),

    #[error("malformed state on node {node}: {reason}")]
    MalformedNodeState { node: String, reason: String },
}
