#![doc(html_root_url = "https://docs.rs/pipelining/latest")]
//! Ordered response delivery for pipelined connections.
//!
//! HTTP/1.1 pipelining lets a client send several requests before the first
//! response arrives, yet responses must reach it in request order. This
//! crate stamps every request with a [`Sequence`], accepts response
//! fragments for any sequence as soon as they are produced, and releases
//! them to the transport only when that preserves order. Fragments waiting
//! behind an incomplete earlier response are held in a bounded buffer; a
//! connection that exceeds the bound is disconnected.
//!
//! Two integrations share one ordering core:
//!
//! - [`PipelineHandler`] guards the state with a mutex for callback-driven
//!   transports implementing [`Transport`].
//! - [`PipelineActor`] owns the state inside a task and writes into a
//!   [`futures::Sink`].

pub mod actor;
pub mod config;
pub mod error;
pub mod fragment;
pub mod handler;
pub mod metrics;
pub mod ordering;
pub mod reorder;
pub mod sequence;
pub mod server;
pub mod transport;

pub use actor::{FragmentHandle, PipelineActor};
pub use config::{MAX_HELD_DEFAULT, PipelineConfig};
pub use error::{PipelineError, Result};
pub use fragment::{RequestUnit, ResponseFragment};
pub use handler::PipelineHandler;
pub use ordering::{Drained, OrderingState};
pub use sequence::{Sequence, Sequencer};
pub use transport::Transport;
