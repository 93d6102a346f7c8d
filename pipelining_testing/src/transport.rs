//! A [`Transport`] that records every call made on it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pipelining::Transport;

/// A call observed by [`RecordingTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent<P> {
    /// A payload was written.
    Write(P),
    /// A flush was requested.
    Flush,
    /// The connection was torn down.
    Disconnect,
    /// A low-water mark was applied.
    LowWaterMark(usize),
}

struct Recorded<P> {
    events: Vec<TransportEvent<P>>,
    writable: bool,
    supports_low_water_mark: bool,
}

/// Cloneable in-memory transport; clones share one event log.
pub struct RecordingTransport<P> {
    inner: Arc<Mutex<Recorded<P>>>,
}

impl<P> Clone for RecordingTransport<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Default for RecordingTransport<P> {
    fn default() -> Self { Self::new() }
}

impl<P> RecordingTransport<P> {
    /// Create a writable transport that accepts low-water mark changes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recorded {
                events: Vec::new(),
                writable: true,
                supports_low_water_mark: true,
            })),
        }
    }

    /// Create a transport with no low-water mark setting.
    #[must_use]
    pub fn without_low_water_mark() -> Self {
        let transport = Self::new();
        transport.lock().supports_low_water_mark = false;
        transport
    }

    fn lock(&self) -> MutexGuard<'_, Recorded<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change what [`Transport::is_writable`] reports.
    pub fn set_writable(&self, writable: bool) { self.lock().writable = writable; }

    /// Number of flushes requested so far.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, TransportEvent::Flush))
            .count()
    }

    /// Returns `true` if the transport has been disconnected.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.lock()
            .events
            .iter()
            .any(|e| matches!(e, TransportEvent::Disconnect))
    }
}

impl<P: Clone> RecordingTransport<P> {
    /// Every recorded call, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<TransportEvent<P>> { self.lock().events.clone() }

    /// Payloads written so far, in write order.
    #[must_use]
    pub fn written(&self) -> Vec<P> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Write(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<P> Transport<P> for RecordingTransport<P> {
    fn write(&mut self, payload: P) { self.lock().events.push(TransportEvent::Write(payload)); }

    fn flush(&mut self) { self.lock().events.push(TransportEvent::Flush); }

    fn disconnect(&mut self) { self.lock().events.push(TransportEvent::Disconnect); }

    fn is_writable(&self) -> bool { self.lock().writable }

    fn set_write_low_water_mark(&mut self, mark: usize) -> bool {
        let mut recorded = self.lock();
        if !recorded.supports_low_water_mark {
            return false;
        }
        recorded.events.push(TransportEvent::LowWaterMark(mark));
        true
    }
}
