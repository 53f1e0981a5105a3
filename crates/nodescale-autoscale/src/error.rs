//! Autoscaler error types.

use std::fmt;

use nodescale_cluster::ClusterError;
use thiserror::Error;

/// A mutating call the controller issues against a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Cordon,
    Uncordon,
    IncreasePool,
    DeleteNodes,
    Deregister,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Cordon => write!(f, "cordon"),
            Operation::Uncordon => write!(f, "uncordon"),
            Operation::IncreasePool => write!(f, "increase pool"),
            Operation::DeleteNodes => write!(f, "delete nodes"),
            Operation::Deregister => write!(f, "deregister node"),
        }
    }
}

/// Errors that abort a reconciliation tick.
///
/// Nothing is retried in-tick; the next tick re-snapshots and decides again.
#[derive(Debug, Error)]
pub enum ScaleError {
    /// Cluster state could not be fetched or validated; no mutation was attempted
    /// since the last successful snapshot.
    #[error("cluster state unavailable: {0}")]
    SourceUnavailable(#[source] ClusterError),

    /// A cordon, uncordon, resize or delete call failed. Mutations completed
    /// earlier in the tick are left in place.
    #[error("{operation} failed for {target}: {source}")]
    BackendRequestFailed {
        operation: Operation,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    /// A cordoned node has no usable cordon timestamp.
    #[error("malformed state on node {node}: {reason}")]
    MalformedNodeState { node: String, reason: String },

    #[error("invalid scaling config: {0}")]
    InvalidConfig(String),
}

impl ScaleError {
    pub(crate) fn backend(
        operation: Operation,
        target: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        ScaleError::BackendRequestFailed {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }
}

impl From<ClusterError> for ScaleError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::MalformedNodeState { node, reason } => {
                ScaleError::MalformedNodeState { node, reason }
            }
            other => ScaleError::SourceUnavailable(other),
        }
    }
}

pub type ScaleResult<T> = Result<T, ScaleError>;
