//! Request sequencing for a single connection.
//!
//! Every request unit recognised on a connection is stamped with the next
//! [`Sequence`]. Numbers start at zero, increase by exactly one per request,
//! and are never reused while the connection lives.

#[cfg(not(loom))]
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(loom)]
use loom::sync::atomic::{AtomicU64, Ordering};

/// Position of a request in the connection's arrival order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(u64);

impl From<u64> for Sequence {
    fn from(value: u64) -> Self { Self(value) }
}

impl Sequence {
    /// The first sequence handed out on every connection.
    pub const ZERO: Sequence = Sequence(0);

    /// Create a new [`Sequence`] with the provided value.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(self) -> u64 { self.0 }

    /// The sequence immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self { Self(self.0 + 1) }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "#{}", self.0) }
}

/// Monotonic sequence source owned by one connection.
///
/// The counter is atomic so the request-recognition side can assign numbers
/// without contending with the drain side. Calls must still come from a
/// single reader so that assignment order matches arrival order.
///
/// # Examples
///
/// ```
/// use pipelining::sequence::{Sequence, Sequencer};
///
/// let sequencer = Sequencer::new();
/// assert_eq!(sequencer.next(), Sequence::new(0));
/// assert_eq!(sequencer.next(), Sequence::new(1));
/// assert_eq!(sequencer.next_assignable(), Sequence::new(2));
/// ```
#[derive(Debug)]
pub struct Sequencer {
    next_assignable: AtomicU64,
}

impl Default for Sequencer {
    fn default() -> Self { Self::new() }
}

impl Sequencer {
    /// Create a sequencer whose first assignment is [`Sequence::ZERO`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_assignable: AtomicU64::new(0),
        }
    }

    /// Consume and return the next sequence number.
    ///
    /// Overflow after `u64::MAX` requests is not handled.
    #[must_use = "a consumed sequence must be attached to its request"]
    pub fn next(&self) -> Sequence {
        Sequence(self.next_assignable.fetch_add(1, Ordering::AcqRel))
    }

    /// The sequence the next call to [`Sequencer::next`] will return.
    #[must_use]
    pub fn next_assignable(&self) -> Sequence {
        Sequence(self.next_assignable.load(Ordering::Acquire))
    }

    /// Returns `true` if `sequence` has already been handed out.
    #[must_use]
    pub fn is_assigned(&self, sequence: Sequence) -> bool { sequence < self.next_assignable() }
}
