//! Request units and response fragments exchanged with the ordering core.
//!
//! A [`RequestUnit`] pairs an inbound request with the [`Sequence`] it was
//! assigned on arrival. Processing logic answers it with one or more
//! [`ResponseFragment`]s carrying the same sequence; the final fragment of a
//! response is flagged as the last one.

use crate::sequence::Sequence;

/// An inbound request stamped with its position on the connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestUnit<R> {
    sequence: Sequence,
    request: R,
}

impl<R> RequestUnit<R> {
    /// Wrap `request` with the sequence it was assigned.
    #[must_use]
    pub fn new(sequence: Sequence, request: R) -> Self { Self { sequence, request } }

    /// Sequence to quote on every fragment answering this request.
    #[must_use]
    pub fn sequence(&self) -> Sequence { self.sequence }

    /// Borrow the wrapped request.
    #[must_use]
    pub fn request(&self) -> &R { &self.request }

    /// Split into the sequence and the wrapped request.
    #[must_use]
    pub fn into_parts(self) -> (Sequence, R) { (self.sequence, self.request) }

    /// Build the terminal fragment answering this request.
    #[must_use]
    pub fn respond<P>(&self, payload: P) -> ResponseFragment<P> {
        ResponseFragment::new(self.sequence, payload)
    }

    /// Build a non-terminal fragment answering this request.
    #[must_use]
    pub fn respond_partial<P>(&self, payload: P) -> ResponseFragment<P> {
        ResponseFragment::partial(self.sequence, payload)
    }
}

/// One piece of output destined for the transport.
///
/// Zero or more partial fragments may precede exactly one last fragment for
/// each sequence. The payload is opaque to the ordering core.
///
/// # Examples
///
/// ```
/// use pipelining::{ResponseFragment, sequence::Sequence};
///
/// let head = ResponseFragment::partial(Sequence::new(0), "HTTP/1.1 200 OK\r\n");
/// let tail = ResponseFragment::new(Sequence::new(0), "0\r\n\r\n");
/// assert!(!head.is_last());
/// assert!(tail.is_last());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseFragment<P> {
    sequence: Sequence,
    last: bool,
    payload: P,
}

impl<P> ResponseFragment<P> {
    /// Create the last fragment for `sequence`.
    #[must_use]
    pub fn new(sequence: Sequence, payload: P) -> Self { Self::with_last(sequence, true, payload) }

    /// Create a fragment that will be followed by more output for `sequence`.
    #[must_use]
    pub fn partial(sequence: Sequence, payload: P) -> Self {
        Self::with_last(sequence, false, payload)
    }

    /// Create a fragment with an explicit terminal flag.
    #[must_use]
    pub fn with_last(sequence: Sequence, last: bool, payload: P) -> Self {
        Self {
            sequence,
            last,
            payload,
        }
    }

    /// Sequence of the request this fragment answers.
    #[must_use]
    pub fn sequence(&self) -> Sequence { self.sequence }

    /// Whether this fragment closes the response for its sequence.
    #[must_use]
    pub fn is_last(&self) -> bool { self.last }

    /// Borrow the payload.
    #[must_use]
    pub fn payload(&self) -> &P { &self.payload }

    /// Consume the fragment, yielding its payload.
    #[must_use]
    pub fn into_payload(self) -> P { self.payload }
}
