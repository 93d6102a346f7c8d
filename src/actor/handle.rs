//! Cloneable handle used by producers to feed fragments to the actor.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::SendError;
use crate::{
    fragment::{RequestUnit, ResponseFragment},
    sequence::{Sequence, Sequencer},
};

/// Producer side of a [`PipelineActor`](super::PipelineActor).
///
/// Clones share the connection's [`Sequencer`]. Only the task reading
/// requests off the connection should call [`FragmentHandle::on_request`];
/// processing tasks only send fragments.
pub struct FragmentHandle<P> {
    tx: mpsc::Sender<ResponseFragment<P>>,
    sequencer: Arc<Sequencer>,
}

impl<P> Clone for FragmentHandle<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            sequencer: Arc::clone(&self.sequencer),
        }
    }
}

impl<P> FragmentHandle<P> {
    pub(super) fn new(tx: mpsc::Sender<ResponseFragment<P>>, sequencer: Arc<Sequencer>) -> Self {
        Self { tx, sequencer }
    }

    /// Stamp `request` with the next sequence.
    #[must_use]
    pub fn on_request<R>(&self, request: R) -> RequestUnit<R> {
        RequestUnit::new(self.sequencer.next(), request)
    }

    /// Sequence the next request will receive.
    #[must_use]
    pub fn next_assignable(&self) -> Sequence { self.sequencer.next_assignable() }

    /// Send a fragment to the actor.
    ///
    /// Waits while the fragment channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] once the actor has stopped.
    pub async fn send(&self, fragment: ResponseFragment<P>) -> Result<(), SendError> {
        let sequence = fragment.sequence();
        let last = fragment.is_last();
        self.tx.send(fragment).await.map_err(|_| SendError::Closed)?;
        debug!(%sequence, last, "fragment sent");
        Ok(())
    }

    /// Returns `true` once the actor has stopped accepting fragments.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}
