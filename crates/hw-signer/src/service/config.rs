//! Hub configuration with validation.

use std::time::Duration;

use thiserror::Error;

/// Timing and capacity parameters of the signing hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Cadence of the identity probe while the hub is active.
    pub probe_interval: Duration,
    /// Minimum spacing between consecutive device dispatches.
    pub dispatch_spacing: Duration,
    /// Deadline for exchanges with no on-device interaction.
    pub short_timeout: Duration,
    /// Deadline for exchanges waiting on human confirmation.
    pub long_timeout: Duration,
    /// Period of the background scheduling timer.
    pub tick_interval: Duration,
    /// How long the timer keeps running after the last dispatch once every
    /// channel has closed.
    pub idle_linger: Duration,
    /// Depth of the hub command queue.
    pub command_buffer: usize,
    /// Capacity of the broadcast event channel.
    pub event_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_millis(3_000),
            dispatch_spacing: Duration::from_millis(75),
            short_timeout: Duration::from_secs(5),
            long_timeout: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
            idle_linger: Duration::from_secs(5),
            command_buffer: 64,
            event_capacity: 32,
        }
    }
}

impl HubConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_interval.is_zero() {
            return Err(ConfigError::InvalidTiming(
                "probe_interval cannot be 0".into(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidTiming(
                "tick_interval cannot be 0".into(),
            ));
        }
        if self.short_timeout.is_zero() || self.long_timeout.is_zero() {
            return Err(ConfigError::InvalidTiming("timeouts cannot be 0".into()));
        }
        if self.long_timeout < self.short_timeout {
            return Err(ConfigError::InvalidTiming(
                "long_timeout must be >= short_timeout".into(),
            ));
        }
        if self.command_buffer == 0 || self.event_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(
                "channel capacities cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A timing parameter is out of range.
    #[error("invalid timing: {0}")]
    InvalidTiming(String),
    /// A buffer capacity is out of range.
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),
}
