//! Command line interface for the `pipelining` demo server.
//!
//! Also consumed by `build.rs` to render the manual page.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `pipelining` binary.
#[derive(Debug, Parser)]
#[command(
    name = "pipelining",
    version,
    about = "Line-based pipelined echo server with ordered responses"
)]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:9080")]
    pub bind: SocketAddr,

    /// Fragments a connection may hold before it is dropped.
    #[arg(long, default_value_t = 10_000)]
    pub max_held: usize,

    /// Processing delay per word of a request, in milliseconds.
    #[arg(long, default_value_t = 10)]
    pub delay_ms: u64,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
