//! Scaling parameters, fixed for the controller's lifetime.

use std::num::NonZeroU64;
use std::time::Duration;

use nodescale_cluster::ProtectionRule;

use crate::error::{ScaleError, ScaleResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ScalingConfig {
    /// Raw resource units (millicpu) making up one block of demand.
    pub block_size: NonZeroU64,
    /// Spare blocks to keep available on schedulable nodes.
    pub target_buffer: i64,
    /// How long a cordoned node must wait before it may be deleted.
    pub grace_period: Duration,
    /// Which pods block deletion of their node.
    pub protection: ProtectionRule,
}

impl ScalingConfig {
    /// Build a config from raw values, rejecting a zero block size or a
    /// negative buffer.
    pub fn new(
        block_size: u64,
        target_buffer: i64,
        grace_period: Duration,
        protection: ProtectionRule,
    ) -> ScaleResult<Self> {
        let block_size = NonZeroU64::new(block_size)
            .ok_or_else(|| ScaleError::InvalidConfig("block_size must be positive".to_string()))?;
        if target_buffer < 0 {
            return Err(ScaleError::InvalidConfig(format!(
                "target_buffer must not be negative, got {target_buffer}"
            )));
        }
        Ok(Self {
            block_size,
            target_buffer,
            grace_period,
            protection,
        })
    }
}
