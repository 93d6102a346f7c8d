//! Drain engine and hold-limit governor for one connection.
//!
//! [`OrderingState`] is the sans-IO heart of the crate. Each submitted
//! fragment is parked in a [`ReorderBuffer`] and the buffer is then drained
//! for as long as its head belongs to the earliest incomplete sequence.
//! Releasing a last fragment moves the required sequence on by one. A
//! fragment arriving while the buffer is full closes the connection instead
//! of growing memory.
//!
//! The state performs no locking of its own. Callers serialise access, either
//! behind the mutex in [`PipelineHandler`](crate::handler::PipelineHandler)
//! or by owning it inside [`PipelineActor`](crate::actor::PipelineActor).

use std::sync::Arc;

use log::warn;
use tracing::debug;

use crate::{
    error::{PipelineError, Result},
    fragment::ResponseFragment,
    metrics,
    reorder::ReorderBuffer,
    sequence::{Sequence, Sequencer},
    transport::Transport,
};

/// Summary of a single drain pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Drained {
    /// Fragments written to the transport during the pass.
    pub released: usize,
    /// Responses whose last fragment was written during the pass.
    pub completed: usize,
    /// Fragments still held once the pass finished.
    pub held: usize,
}

impl Drained {
    /// Returns `true` if the submitted fragment had to wait.
    #[must_use]
    pub fn is_held(&self) -> bool { self.released == 0 }
}

/// Ordering state owned by a single connection.
#[derive(Debug)]
pub struct OrderingState<P> {
    sequencer: Arc<Sequencer>,
    next_required: Sequence,
    buffer: ReorderBuffer<P>,
    closed: bool,
}

impl<P> OrderingState<P> {
    /// Create state that validates fragments against `sequencer` and holds
    /// at most `max_held` fragments.
    #[must_use]
    pub fn new(sequencer: Arc<Sequencer>, max_held: usize) -> Self {
        Self {
            sequencer,
            next_required: Sequence::ZERO,
            buffer: ReorderBuffer::with_capacity(max_held),
            closed: false,
        }
    }

    /// Sequencer shared with the request-recognition side.
    #[must_use]
    pub fn sequencer(&self) -> &Arc<Sequencer> { &self.sequencer }

    /// Earliest sequence whose last fragment has not been released.
    #[must_use]
    pub fn next_required(&self) -> Sequence { self.next_required }

    /// Number of fragments currently held.
    #[must_use]
    pub fn held(&self) -> usize { self.buffer.len() }

    /// Configured hold limit.
    #[must_use]
    pub fn max_held(&self) -> usize { self.buffer.capacity() }

    /// Returns `true` once the state has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed }

    /// Accept `fragment` and write every fragment that is now in order.
    ///
    /// The pass ends with a flush request when the transport reports itself
    /// writable.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Closed`] once the state has been closed.
    /// - [`PipelineError::UnassignedSequence`] or
    ///   [`PipelineError::SequenceAlreadyReleased`] for fragments that break
    ///   the producer contract. They are dropped and nothing else changes.
    /// - [`PipelineError::CapacityExceeded`] when the buffer is full. The
    ///   fragment is dropped, held fragments are discarded and the transport
    ///   is disconnected.
    pub fn submit<T>(&mut self, fragment: ResponseFragment<P>, transport: &mut T) -> Result<Drained>
    where
        T: Transport<P> + ?Sized,
    {
        if self.closed {
            return Err(PipelineError::Closed);
        }
        self.check_contract(fragment.sequence())?;

        if let Err(rejected) = self.buffer.try_push(fragment) {
            let max_held = self.buffer.capacity();
            warn!(
                "held fragment limit reached, disconnecting: max_held={max_held}, \
                 sequence={}, next_required={}",
                rejected.sequence(),
                self.next_required
            );
            metrics::inc_overflow_disconnects();
            self.close();
            transport.disconnect();
            return Err(PipelineError::CapacityExceeded { max_held });
        }

        let drained = self.drain(transport);
        if drained.is_held() {
            metrics::inc_held();
            debug!(held = drained.held, next_required = %self.next_required, "fragment held");
        } else {
            metrics::inc_released(drained.released);
        }

        if transport.is_writable() {
            transport.flush();
        }
        Ok(drained)
    }

    /// Close the state, discarding held fragments.
    ///
    /// Returns the number of fragments dropped. Closing twice is harmless.
    pub fn close(&mut self) -> usize {
        self.closed = true;
        self.buffer.clear()
    }

    fn check_contract(&self, sequence: Sequence) -> Result<()> {
        let error = if !self.sequencer.is_assigned(sequence) {
            PipelineError::UnassignedSequence {
                sequence,
                next_assignable: self.sequencer.next_assignable(),
            }
        } else if sequence < self.next_required {
            PipelineError::SequenceAlreadyReleased {
                sequence,
                next_required: self.next_required,
            }
        } else {
            return Ok(());
        };
        warn!("dropping fragment: error={error}");
        metrics::inc_contract_violations();
        Err(error)
    }

    fn drain<T>(&mut self, transport: &mut T) -> Drained
    where
        T: Transport<P> + ?Sized,
    {
        let mut drained = Drained::default();
        while let Some(fragment) = self.buffer.pop_if(self.next_required) {
            let last = fragment.is_last();
            transport.write(fragment.into_payload());
            drained.released += 1;
            if last {
                debug!(sequence = %self.next_required, "response complete");
                self.next_required = self.next_required.next();
                drained.completed += 1;
            }
        }
        drained.held = self.buffer.len();
        drained
    }
}
