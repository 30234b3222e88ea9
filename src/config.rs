//! Configuration for the state pool
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{Result, StoreError};

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    // -------------------------------------------------------------------------
    // Queue Configuration
    // -------------------------------------------------------------------------
    /// Idle states kept per (module, variant) queue.
    /// A release that finds the queue full closes the state instead.
    pub queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Eviction Configuration
    // -------------------------------------------------------------------------
    /// Idle states untouched for longer than this are closed by `evict_idle`
    pub idle_expiry: Duration,

    /// How often the background reaper runs `evict_idle`
    pub reaper_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4,
            idle_expiry: Duration::from_secs(60),
            reaper_interval: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    /// Create a new config builder
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }
}

/// Builder for PoolConfig
#[derive(Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    /// Set the per-queue idle capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set how long an idle state may sit unused
    pub fn idle_expiry(mut self, expiry: Duration) -> Self {
        self.config.idle_expiry = expiry;
        self
    }

    /// Set the reaper tick
    pub fn reaper_interval(mut self, interval: Duration) -> Self {
        self.config.reaper_interval = interval;
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<PoolConfig> {
        if self.config.queue_capacity == 0 {
            return Err(StoreError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.config.reaper_interval.is_zero() {
            return Err(StoreError::Config(
                "reaper_interval must be non-zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}
