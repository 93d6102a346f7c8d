//! Per-connection pipelining configuration.
//!
//! [`PipelineConfig`] carries the hold limit enforced by the ordering core
//! and the write low-water mark applied when a connection opens. Build one
//! with [`PipelineConfig::builder`] or use [`Default::default`].

use thiserror::Error;

/// Default number of fragments a connection may hold before it is dropped.
pub const MAX_HELD_DEFAULT: usize = 10_000;

/// Errors returned when building a [`PipelineConfig`].
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The hold limit was zero.
    #[error("invalid max_held {0}; must be >= 1")]
    InvalidMaxHeld(usize),
    /// The fragment channel capacity was zero.
    #[error("invalid channel capacity {0}; must be >= 1")]
    InvalidChannelCapacity(usize),
}

/// Settings fixed when a pipelined connection is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    max_held: usize,
    write_low_water_mark: Option<usize>,
    channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_held: MAX_HELD_DEFAULT,
            write_low_water_mark: Some(0),
            channel_capacity: 64,
        }
    }
}

impl PipelineConfig {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder { PipelineConfigBuilder::default() }

    /// Maximum number of fragments held while waiting for an earlier
    /// response to complete.
    #[must_use]
    pub fn max_held(&self) -> usize { self.max_held }

    /// Low-water mark applied to the transport when the connection opens.
    #[must_use]
    pub fn write_low_water_mark(&self) -> Option<usize> { self.write_low_water_mark }

    /// Capacity of the fragment channel feeding a
    /// [`PipelineActor`](crate::actor::PipelineActor).
    #[must_use]
    pub fn channel_capacity(&self) -> usize { self.channel_capacity }
}

/// Builder for [`PipelineConfig`].
///
/// # Examples
///
/// ```
/// use pipelining::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .max_held(128)
///     .write_low_water_mark(None)
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.max_held(), 128);
/// assert_eq!(config.write_low_water_mark(), None);
/// ```
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the hold limit.
    #[must_use]
    pub fn max_held(mut self, max_held: usize) -> Self {
        self.config.max_held = max_held;
        self
    }

    /// Set the low-water mark applied on connection open.
    ///
    /// Passing `None` leaves the transport's setting untouched.
    #[must_use]
    pub fn write_low_water_mark(mut self, mark: Option<usize>) -> Self {
        self.config.write_low_water_mark = mark;
        self
    }

    /// Set the capacity of the actor's fragment channel.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMaxHeld`] if the hold limit is zero and
    /// [`ConfigError::InvalidChannelCapacity`] if the channel capacity is
    /// zero.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let PipelineConfig {
            max_held,
            channel_capacity,
            ..
        } = self.config;
        if max_held == 0 {
            return Err(ConfigError::InvalidMaxHeld(max_held));
        }
        if channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity(channel_capacity));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_hold_ten_thousand() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_held(), MAX_HELD_DEFAULT);
        assert_eq!(config.write_low_water_mark(), Some(0));
        assert_eq!(PipelineConfig::builder().build(), Ok(config));
    }

    #[rstest]
    #[case::zero_held(0, 1, ConfigError::InvalidMaxHeld(0))]
    #[case::zero_channel(1, 0, ConfigError::InvalidChannelCapacity(0))]
    fn build_rejects_zero(#[case] held: usize, #[case] capacity: usize, #[case] err: ConfigError) {
        let result = PipelineConfig::builder()
            .max_held(held)
            .channel_capacity(capacity)
            .build();
        assert_eq!(result, Err(err));
    }
}
