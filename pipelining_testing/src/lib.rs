//! Test helpers for the `pipelining` crate.
//!
//! [`RecordingTransport`] captures every call the ordering core makes so
//! tests can assert on writes, flushes and disconnects, and
//! [`logger`] serialises access to a captured `log` stream.
//!
//! ```rust
//! use pipelining::PipelineHandler;
//! use pipelining_testing::{RecordingTransport, TransportEvent};
//!
//! let transport = RecordingTransport::new();
//! let handler = PipelineHandler::new(transport.clone());
//! let unit = handler.on_request(());
//! handler.submit(unit.respond("done")).unwrap();
//! assert_eq!(transport.written(), vec!["done"]);
//! assert_eq!(transport.events().last(), Some(&TransportEvent::Flush));
//! ```

pub mod logging;
pub mod transport;

pub use logging::{LoggerHandle, logger};
pub use transport::{RecordingTransport, TransportEvent};
