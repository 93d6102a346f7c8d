//! Task-owned ordering for asynchronous transports.
//!
//! [`PipelineActor`] owns a connection's ordering state outright and is the
//! only thing that mutates it, so no lock is needed. Producers send
//! fragments through cloned [`FragmentHandle`]s; the actor admits them one
//! at a time, feeds released payloads into a [`Sink`] and flushes once per
//! batch. Sink back-pressure plays the part of transport writability.
//!
//! The `select!` loop is `biased` so a cancelled shutdown token is observed
//! before any further fragment.

mod error;
mod handle;

use std::{collections::VecDeque, sync::Arc};

pub use error::{ActorError, SendError};
use futures::{Sink, SinkExt};
pub use handle::FragmentHandle;
use log::info;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::PipelineConfig,
    error::PipelineError,
    fragment::ResponseFragment,
    metrics::ConnectionGauge,
    ordering::OrderingState,
    sequence::{Sequence, Sequencer},
    transport::Transport,
};

/// Why a [`PipelineActor`] stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// Every [`FragmentHandle`] was dropped.
    Completed,
    /// The shutdown token was cancelled.
    Shutdown,
    /// The hold limit was exceeded and the sink was closed.
    CapacityExceeded,
}

/// Payloads released during a drain pass, waiting to be fed to the sink.
struct Staged<P> {
    payloads: VecDeque<P>,
    disconnect: bool,
}

impl<P> Transport<P> for Staged<P> {
    fn write(&mut self, payload: P) { self.payloads.push_back(payload); }

    // The actor flushes the sink itself after each batch.
    fn flush(&mut self) {}

    fn disconnect(&mut self) { self.disconnect = true; }

    fn is_writable(&self) -> bool { false }
}

#[derive(Debug)]
enum Event<P> {
    Shutdown,
    Fragment(Option<ResponseFragment<P>>),
}

/// Actor driving ordered delivery of response fragments into a sink.
///
/// # Examples
///
/// ```
/// use futures::channel::mpsc;
/// use pipelining::{actor::{CloseReason, PipelineActor}, config::PipelineConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (sink, mut written) = mpsc::unbounded::<&'static str>();
/// let (mut actor, handle) =
///     PipelineActor::new(sink, PipelineConfig::default(), CancellationToken::new());
///
/// let first = handle.on_request("GET /slow");
/// let second = handle.on_request("GET /fast");
/// handle.send(second.respond("fast")).await.expect("actor running");
/// handle.send(first.respond("slow")).await.expect("actor running");
/// drop(handle);
///
/// let reason = actor.run().await.expect("sink never fails");
/// assert_eq!(reason, CloseReason::Completed);
/// assert_eq!(written.try_next().ok().flatten(), Some("slow"));
/// assert_eq!(written.try_next().ok().flatten(), Some("fast"));
/// # }
/// ```
pub struct PipelineActor<S, P> {
    fragments: mpsc::Receiver<ResponseFragment<P>>,
    state: OrderingState<P>,
    staged: Staged<P>,
    sink: S,
    shutdown: CancellationToken,
    batch_limit: usize,
    _gauge: ConnectionGauge,
}

impl<S, P> PipelineActor<S, P>
where
    S: Sink<P> + Unpin,
{
    /// Create an actor writing into `sink` together with the handle used to
    /// feed it.
    ///
    /// The actor watches a child of `shutdown`. Exceeding the hold limit
    /// cancels only that child, so a token shared between connections is
    /// left alone.
    #[must_use]
    pub fn new(
        sink: S,
        config: PipelineConfig,
        shutdown: CancellationToken,
    ) -> (Self, FragmentHandle<P>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity());
        let sequencer = Arc::new(Sequencer::new());
        let gauge = ConnectionGauge::open();
        info!("pipeline actor opened: max_held={}", config.max_held());
        let actor = Self {
            fragments: rx,
            state: OrderingState::new(Arc::clone(&sequencer), config.max_held()),
            staged: Staged {
                payloads: VecDeque::new(),
                disconnect: false,
            },
            sink,
            shutdown: shutdown.child_token(),
            batch_limit: config.channel_capacity(),
            _gauge: gauge,
        };
        (actor, FragmentHandle::new(tx, sequencer))
    }

    /// Get a clone of the actor's own shutdown token.
    ///
    /// Cancelling it stops this actor only.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken { self.shutdown.clone() }

    /// Earliest sequence whose response is still incomplete.
    #[must_use]
    pub fn next_required(&self) -> Sequence { self.state.next_required() }

    /// Number of fragments currently held.
    #[must_use]
    pub fn held(&self) -> usize { self.state.held() }

    /// Consume the actor and return the sink.
    #[must_use]
    pub fn into_sink(self) -> S { self.sink }

    /// Drive the actor until every handle is dropped, shutdown is requested
    /// or the hold limit is exceeded.
    ///
    /// Held fragments are discarded when the actor stops.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Transport`] if the sink rejects a payload or
    /// fails to flush.
    pub async fn run(&mut self) -> Result<CloseReason, ActorError<S::Error>> {
        // A token cancelled before start means nothing is drained.
        if self.shutdown.is_cancelled() {
            self.finish(CloseReason::Shutdown);
            return Ok(CloseReason::Shutdown);
        }

        let reason = loop {
            let event = self.next_event().await;
            let fragment = match event {
                Event::Shutdown => break CloseReason::Shutdown,
                Event::Fragment(None) => break CloseReason::Completed,
                Event::Fragment(Some(fragment)) => fragment,
            };
            if let Some(reason) = self.process_batch(fragment).await? {
                break reason;
            }
        };
        self.finish(reason);
        Ok(reason)
    }

    async fn next_event(&mut self) -> Event<P> {
        tokio::select! {
            biased;

            () = self.shutdown.cancelled() => Event::Shutdown,
            res = self.fragments.recv() => Event::Fragment(res),
        }
    }

    /// Admit `first` and any fragments already queued behind it, then write
    /// the released payloads with a single flush.
    async fn process_batch(
        &mut self,
        first: ResponseFragment<P>,
    ) -> Result<Option<CloseReason>, ActorError<S::Error>> {
        let mut next = Some(first);
        let mut admitted = 0;
        while let Some(fragment) = next.take() {
            match self.state.submit(fragment, &mut self.staged) {
                Ok(_) | Err(PipelineError::UnassignedSequence { .. })
                | Err(PipelineError::SequenceAlreadyReleased { .. }) => {}
                Err(PipelineError::CapacityExceeded { .. } | PipelineError::Closed) => break,
            }
            admitted += 1;
            if admitted < self.batch_limit {
                next = self.fragments.try_recv().ok();
            }
        }

        self.write_staged().await?;

        if self.staged.disconnect {
            self.shutdown.cancel();
            self.sink.close().await.map_err(ActorError::Transport)?;
            return Ok(Some(CloseReason::CapacityExceeded));
        }
        Ok(None)
    }

    async fn write_staged(&mut self) -> Result<(), ActorError<S::Error>> {
        if self.staged.payloads.is_empty() {
            return Ok(());
        }
        while let Some(payload) = self.staged.payloads.pop_front() {
            self.sink.feed(payload).await.map_err(ActorError::Transport)?;
        }
        self.sink.flush().await.map_err(ActorError::Transport)
    }

    fn finish(&mut self, reason: CloseReason) {
        self.fragments.close();
        let dropped = self.state.close();
        info!(
            "pipeline actor closed: reason={reason:?}, next_required={}, dropped={dropped}",
            self.state.next_required()
        );
    }
}
