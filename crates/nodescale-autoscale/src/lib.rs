//! nodescale-autoscale — buffer-driven node pool scaling.
//!
//! Keeps a configured number of spare capacity blocks available on
//! schedulable nodes. Each tick compares spare blocks against the target
//! buffer and reacts:
//!
//! # Scaling Algorithm
//!
//! ```text
//! available = floor(Σ free(uncordoned nodes) / block_size)
//! target    = target_buffer
//!
//! if available < target:
//!     uncordon most-loaded cordoned nodes until the deficit is covered
//!     if still short:
//!         re-snapshot
//!         IncreaseToSize(uncordoned + ceil(deficit × block_size / node_capacity))
//!
//! if available > target:
//!     cordon floor(surplus × block_size / node_capacity) nodes, fewest pods first
//!
//! always:
//!     delete cordoned nodes past the grace period with no protected pods
//! ```
//!
//! Errors abort the tick without rollback; the next tick re-derives its
//! decision from fresh cluster state.

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod planner;
pub mod pool;
pub mod reaper;
pub mod selector;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ScalingConfig;
pub use controller::{ScaleOutcome, ScalingController, TickReport};
pub use error::{Operation, ScaleError, ScaleResult};
pub use planner::{CapacityPlanner, GrowthPlan};
pub use pool::NodePool;
pub use reaper::GracePeriodReaper;
pub use selector::{UncordonCandidate, UncordonPlan, pick_to_cordon, pick_to_uncordon};
