//! Demo server answering newline-delimited requests in pipelined order.
//!
//! Every word of a request line comes back as its own response line. Longer
//! requests take longer to process, so a long request followed by a short
//! one exercises reordering.

mod cli;

use std::time::Duration;

use clap::Parser;
use futures::{StreamExt, stream};
use log::{error, info, warn};
use pipelining::{config::PipelineConfig, server::serve_lines};
use tokio::net::TcpListener;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    #[cfg(feature = "metrics")]
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
    }
    #[cfg(not(feature = "metrics"))]
    if cli.metrics_addr.is_some() {
        warn!("metrics support not compiled in; ignoring --metrics-addr");
    }

    let config = PipelineConfig::builder().max_held(cli.max_held).build()?;
    let per_word = Duration::from_millis(cli.delay_ms);
    let listener = TcpListener::bind(cli.bind).await?;
    info!("listening: addr={}", listener.local_addr()?);

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("accept failed: error={e}");
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        };
        let token = shutdown.child_token();
        tracker.spawn(async move {
            match serve_lines(stream, config, token, move |line| words(&line, per_word)).await {
                Ok(reason) => info!("connection finished: peer={peer}, reason={reason:?}"),
                Err(e) => error!("connection failed: peer={peer}, error={e}"),
            }
        });
    }

    shutdown.cancel();
    tracker.close();
    tracker.wait().await;
    Ok(())
}

/// Split `line` into words, emitted together after a delay proportional to
/// their count.
fn words(line: &str, per_word: Duration) -> impl futures::Stream<Item = String> + Send + use<> {
    let words: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
    let delay = per_word.saturating_mul(u32::try_from(words.len()).unwrap_or(u32::MAX));
    stream::once(async move {
        tokio::time::sleep(delay).await;
        stream::iter(words)
    })
    .flatten()
}
