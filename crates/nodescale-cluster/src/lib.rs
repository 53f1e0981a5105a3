//! nodescale-cluster — cluster model for the nodescale controller.
//!
//! Provides the raw node/pod records reported by the orchestrator, the
//! [`ClusterSource`] collaborator the controller reads and mutates
//! through, and the immutable [`ClusterSnapshot`] every scaling decision
//! is computed from.
//!
//! # Architecture
//!
//! ```text
//! ClusterSource::fetch()  ──►  ClusterState (raw records)
//!                                   │  + ProtectionRule
//!                                   ▼
//!                             ClusterSnapshot (validated, read-only)
//! ```
//!
//! [`ClusterStore`] is a redb-backed `ClusterSource` used by the daemon's
//! local mode and by tests. Records are JSON-serialized into `&[u8]`
//! value columns, keyed by node id and `{namespace}/{name}`.

pub mod error;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{ClusterError, ClusterResult};
pub use snapshot::{ClusterSnapshot, Node, Pod};
pub use source::ClusterSource;
pub use store::ClusterStore;
pub use types::*;
