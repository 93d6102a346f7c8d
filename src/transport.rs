//! Boundary between the ordering core and the connection it writes to.
//!
//! The core never owns the connection. It calls [`Transport::write`] once per
//! released fragment, in release order, asks for a flush when the connection
//! reports itself writable and disconnects when the hold limit is exceeded.
//! Write failures are reported through the transport's own channels.

/// Outbound half of a connection as seen by the ordering core.
pub trait Transport<P> {
    /// Queue `payload` for delivery to the peer.
    fn write(&mut self, payload: P);

    /// Push any queued bytes towards the peer.
    ///
    /// This is a batching hint; correctness never depends on it.
    fn flush(&mut self);

    /// Tear the connection down.
    fn disconnect(&mut self);

    /// Whether the connection is currently accepting writes.
    fn is_writable(&self) -> bool;

    /// Set the low-water mark below which the connection reports itself
    /// writable again.
    ///
    /// Returns `false` when the transport has no such setting. Lowering the
    /// mark widens the writable window so consolidated output needs fewer
    /// flushes.
    fn set_write_low_water_mark(&mut self, mark: usize) -> bool {
        let _ = mark;
        false
    }
}

impl<P, T> Transport<P> for &mut T
where
    T: Transport<P> + ?Sized,
{
    fn write(&mut self, payload: P) { (**self).write(payload); }

    fn flush(&mut self) { (**self).flush(); }

    fn disconnect(&mut self) { (**self).disconnect(); }

    fn is_writable(&self) -> bool { (**self).is_writable() }

    fn set_write_low_water_mark(&mut self, mark: usize) -> bool {
        (**self).set_write_low_water_mark(mark)
    }
}
