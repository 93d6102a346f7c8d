//! Mutex-guarded pipelining handler for callback-driven transports.
//!
//! [`PipelineHandler`] is the per-connection object a transport integration
//! holds. Request recognition calls [`PipelineHandler::on_request`] to stamp
//! each request; processing logic, possibly on many threads, calls
//! [`PipelineHandler::submit`] with the fragments it produces. Every submit
//! and writability notification runs under one mutex, so the drain pass is
//! atomic with respect to the others. Sequence assignment does not take the
//! lock.
//!
//! # Examples
//!
//! ```
//! use pipelining::{PipelineHandler, Transport};
//!
//! #[derive(Default)]
//! struct Wire(Vec<&'static str>);
//!
//! impl Transport<&'static str> for Wire {
//!     fn write(&mut self, payload: &'static str) { self.0.push(payload); }
//!     fn flush(&mut self) {}
//!     fn disconnect(&mut self) {}
//!     fn is_writable(&self) -> bool { true }
//! }
//!
//! let handler = PipelineHandler::new(Wire::default());
//! let first = handler.on_request("GET /a");
//! let second = handler.on_request("GET /b");
//!
//! handler.submit(second.respond("b")).expect("held");
//! handler.submit(first.respond("a")).expect("released");
//! assert_eq!(handler.into_transport().0, vec!["a", "b"]);
//! ```

use std::sync::{Arc, PoisonError};
#[cfg(not(loom))]
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};
#[cfg(loom)]
use loom::sync::{Mutex, MutexGuard};

use crate::{
    config::PipelineConfig,
    error::Result,
    fragment::{RequestUnit, ResponseFragment},
    metrics::ConnectionGauge,
    ordering::{Drained, OrderingState},
    sequence::{Sequence, Sequencer},
    transport::Transport,
};

struct Inner<T, P> {
    state: OrderingState<P>,
    transport: T,
}

/// Per-connection response ordering for a synchronous [`Transport`].
pub struct PipelineHandler<T, P> {
    sequencer: Arc<Sequencer>,
    inner: Mutex<Inner<T, P>>,
    config: PipelineConfig,
    _gauge: ConnectionGauge,
}

impl<T, P> PipelineHandler<T, P>
where
    T: Transport<P>,
{
    /// Create a handler with the default configuration.
    #[must_use]
    pub fn new(transport: T) -> Self { Self::with_config(transport, PipelineConfig::default()) }

    /// Create a handler using `config`.
    #[must_use]
    pub fn with_config(transport: T, config: PipelineConfig) -> Self {
        let sequencer = Arc::new(Sequencer::new());
        let state = OrderingState::new(Arc::clone(&sequencer), config.max_held());
        let gauge = ConnectionGauge::open();
        info!("pipeline opened: max_held={}", config.max_held());
        Self {
            sequencer,
            inner: Mutex::new(Inner { state, transport }),
            config,
            _gauge: gauge,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T, P>> {
        // A transport panic mid-drain loses the fragment being written; the
        // counters and buffer stay usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the configured write low-water mark to the transport.
    ///
    /// Call once when the connection opens. Returns `true` if the transport
    /// accepted the setting.
    pub fn on_connection_opened(&self) -> bool {
        let Some(mark) = self.config.write_low_water_mark() else {
            return false;
        };
        let applied = self.lock().transport.set_write_low_water_mark(mark);
        debug!("write low-water mark: mark={mark}, applied={applied}");
        applied
    }

    /// Consume the next sequence for a newly recognised request.
    #[must_use = "a consumed sequence must be attached to its request"]
    pub fn assign_sequence(&self) -> Sequence { self.sequencer.next() }

    /// Stamp `request` with the next sequence.
    #[must_use]
    pub fn on_request<R>(&self, request: R) -> RequestUnit<R> {
        RequestUnit::new(self.assign_sequence(), request)
    }

    /// Submit a response fragment, writing everything now in order.
    ///
    /// # Errors
    ///
    /// See [`OrderingState::submit`]. A
    /// [`PipelineError::CapacityExceeded`](crate::PipelineError::CapacityExceeded)
    /// means the transport has been disconnected.
    pub fn submit(&self, fragment: ResponseFragment<P>) -> Result<Drained> {
        let mut guard = self.lock();
        let Inner { state, transport } = &mut *guard;
        state.submit(fragment, transport)
    }

    /// React to a change in the transport's writability.
    pub fn on_writability_changed(&self, writable: bool) {
        if !writable {
            return;
        }
        let mut guard = self.lock();
        if !guard.state.is_closed() {
            guard.transport.flush();
        }
    }

    /// Mark the connection as closed elsewhere, dropping held fragments.
    ///
    /// Returns the number of fragments discarded.
    pub fn close(&self) -> usize {
        let dropped = self.lock().state.close();
        if dropped > 0 {
            info!("pipeline closed with held fragments: dropped={dropped}");
        }
        dropped
    }

    /// Returns `true` once the connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.lock().state.is_closed() }

    /// Number of fragments currently held.
    #[must_use]
    pub fn held(&self) -> usize { self.lock().state.held() }

    /// Earliest sequence whose response is still incomplete.
    #[must_use]
    pub fn next_required(&self) -> Sequence { self.lock().state.next_required() }

    /// Sequence the next request will receive.
    #[must_use]
    pub fn next_assignable(&self) -> Sequence { self.sequencer.next_assignable() }

    /// Configured hold limit.
    #[must_use]
    pub fn max_held(&self) -> usize { self.config.max_held() }

    /// Consume the handler and return the transport.
    #[must_use]
    pub fn into_transport(self) -> T {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        inner.transport
    }
}
