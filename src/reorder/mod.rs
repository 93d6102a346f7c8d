//! Bounded min-heap of fragments awaiting release.
//!
//! Fragments are ordered by sequence and then by arrival, so the fragments
//! of one sequence leave in the order they were submitted even while they
//! sit behind an incomplete earlier response.

use std::{cmp::Ordering, collections::BinaryHeap};

use crate::{fragment::ResponseFragment, sequence::Sequence};

struct Held<P> {
    arrival: u64,
    fragment: ResponseFragment<P>,
}

impl<P> Held<P> {
    fn key(&self) -> (Sequence, u64) { (self.fragment.sequence(), self.arrival) }
}

impl<P> PartialEq for Held<P> {
    fn eq(&self, other: &Self) -> bool { self.key() == other.key() }
}

impl<P> Eq for Held<P> {}

impl<P> PartialOrd for Held<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl<P> Ord for Held<P> {
    // Reversed: `BinaryHeap` is a max-heap.
    fn cmp(&self, other: &Self) -> Ordering { other.key().cmp(&self.key()) }
}

/// Fixed-capacity holding area for out-of-order fragments.
///
/// # Examples
///
/// ```
/// use pipelining::{ResponseFragment, reorder::ReorderBuffer, sequence::Sequence};
///
/// let mut buffer = ReorderBuffer::with_capacity(2);
/// assert!(buffer.try_push(ResponseFragment::new(Sequence::new(1), "b")).is_ok());
/// assert!(buffer.try_push(ResponseFragment::new(Sequence::new(0), "a")).is_ok());
/// assert!(buffer.try_push(ResponseFragment::new(Sequence::new(2), "c")).is_err());
///
/// assert_eq!(buffer.peek_sequence(), Some(Sequence::new(0)));
/// let first = buffer.pop_if(Sequence::new(0)).expect("head is #0");
/// assert_eq!(first.into_payload(), "a");
/// ```
pub struct ReorderBuffer<P> {
    heap: BinaryHeap<Held<P>>,
    capacity: usize,
    arrivals: u64,
}

impl<P> ReorderBuffer<P> {
    /// Create an empty buffer that never holds more than `capacity`
    /// fragments.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            // Grows on demand; `capacity` is a ceiling, not a reservation.
            heap: BinaryHeap::new(),
            capacity,
            arrivals: 0,
        }
    }

    /// Maximum number of fragments the buffer will hold.
    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Number of fragments currently held.
    #[must_use]
    pub fn len(&self) -> usize { self.heap.len() }

    /// Returns `true` if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.heap.is_empty() }

    /// Returns `true` once the buffer holds `capacity` fragments.
    #[must_use]
    pub fn is_full(&self) -> bool { self.heap.len() >= self.capacity }

    /// Insert `fragment`, handing it back if the buffer is full.
    ///
    /// # Errors
    ///
    /// Returns the rejected fragment when [`ReorderBuffer::is_full`] holds.
    pub fn try_push(&mut self, fragment: ResponseFragment<P>) -> Result<(), ResponseFragment<P>> {
        if self.is_full() {
            return Err(fragment);
        }
        let arrival = self.arrivals;
        self.arrivals += 1;
        self.heap.push(Held { arrival, fragment });
        Ok(())
    }

    /// Smallest sequence currently held.
    #[must_use]
    pub fn peek_sequence(&self) -> Option<Sequence> {
        self.heap.peek().map(|held| held.fragment.sequence())
    }

    /// Remove the head fragment if it belongs to `sequence`.
    pub fn pop_if(&mut self, sequence: Sequence) -> Option<ResponseFragment<P>> {
        if self.peek_sequence()? != sequence {
            return None;
        }
        self.heap.pop().map(|held| held.fragment)
    }

    /// Drop every held fragment, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        dropped
    }
}

impl<P> std::fmt::Debug for ReorderBuffer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReorderBuffer")
            .field("len", &self.heap.len())
            .field("capacity", &self.capacity)
            .field("head", &self.peek_sequence())
            .finish()
    }
}
