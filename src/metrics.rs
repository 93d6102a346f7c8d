//! Metric helpers for `pipelining`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. With the `metrics`
//! feature disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open pipelined connections.
pub const CONNECTIONS_ACTIVE: &str = "pipelining_connections_active";
/// Name of the counter tracking fragments handed to a transport.
pub const FRAGMENTS_RELEASED: &str = "pipelining_fragments_released_total";
/// Name of the counter tracking fragments parked in a reorder buffer.
pub const FRAGMENTS_HELD: &str = "pipelining_fragments_held_total";
/// Name of the counter tracking connections dropped for holding too much.
pub const OVERFLOW_DISCONNECTS: &str = "pipelining_overflow_disconnects_total";
/// Name of the counter tracking fragments rejected as contract violations.
pub const CONTRACT_VIOLATIONS: &str = "pipelining_contract_violations_total";

/// Holds the active connections gauge up for as long as one pipeline lives.
#[derive(Debug)]
pub(crate) struct ConnectionGauge(());

impl ConnectionGauge {
    pub(crate) fn open() -> Self {
        inc_connections();
        Self(())
    }
}

impl Drop for ConnectionGauge {
    fn drop(&mut self) { dec_connections(); }
}

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record `count` fragments released to a transport.
pub fn inc_released(count: usize) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_RELEASED).increment(u64::try_from(count).unwrap_or(u64::MAX));
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record a fragment that had to wait behind an earlier sequence.
pub fn inc_held() {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_HELD).increment(1);
}

/// Record a connection torn down by the hold limit.
pub fn inc_overflow_disconnects() {
    #[cfg(feature = "metrics")]
    counter!(OVERFLOW_DISCONNECTS).increment(1);
}

/// Record a fragment dropped because its producer broke the contract.
pub fn inc_contract_violations() {
    #[cfg(feature = "metrics")]
    counter!(CONTRACT_VIOLATIONS).increment(1);
}
