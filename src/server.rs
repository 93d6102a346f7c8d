//! Line-delimited pipelined serving over any byte stream.
//!
//! Each input line is one request unit. Requests are processed concurrently
//! on their own tasks and may finish in any order; the responder's output
//! chunks are written back one per line, in request order, through a
//! [`PipelineActor`]. Chunks are forwarded as soon as the responder yields
//! them and the response is closed by a terminal marker that writes nothing.
//! A response that yields no chunks is answered with an empty line so that
//! every request still produces output.

use futures::{Sink, SinkExt, Stream, StreamExt, stream};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::{
    codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError},
    sync::CancellationToken,
    task::TaskTracker,
};

use crate::{
    actor::{ActorError, CloseReason, FragmentHandle, PipelineActor},
    config::PipelineConfig,
    fragment::RequestUnit,
};

/// Payload carried through the actor: a line to write, or `None` for the
/// terminal marker of a response whose lines have all been sent.
type Line = Option<String>;

/// Serve `io` until the peer stops sending, `shutdown` is cancelled or the
/// hold limit is exceeded.
///
/// Only a child of `shutdown` is cancelled when the connection ends.
///
/// # Errors
///
/// Returns [`ActorError::Transport`] if writing a response line fails.
pub async fn serve_lines<IO, F, St>(
    io: IO,
    config: PipelineConfig,
    shutdown: CancellationToken,
    responder: F,
) -> Result<CloseReason, ActorError<LinesCodecError>>
where
    IO: AsyncRead + AsyncWrite + Send + 'static,
    F: Fn(String) -> St + Send + Sync + 'static,
    St: Stream<Item = String> + Send + 'static,
{
    let shutdown = shutdown.child_token();
    let (reader, writer) = tokio::io::split(io);
    let (mut actor, handle) = PipelineActor::new(line_sink(writer), config, shutdown.clone());

    let tracker = TaskTracker::new();
    tracker.spawn(read_requests(
        FramedRead::new(reader, LinesCodec::new()),
        handle,
        shutdown.clone(),
        responder,
        tracker.clone(),
    ));

    let result = actor.run().await;
    // Stop the reader and any responders if the actor ended first.
    shutdown.cancel();
    tracker.close();
    tracker.wait().await;
    result
}

/// Line sink that skips terminal markers.
fn line_sink<W>(writer: W) -> impl Sink<Line, Error = LinesCodecError> + Unpin
where
    W: AsyncWrite + Unpin,
{
    FramedWrite::new(writer, LinesCodec::new())
        .with_flat_map(|line: Line| stream::iter(line.map(Ok::<_, LinesCodecError>)))
}

async fn read_requests<R, F, St>(
    mut lines: FramedRead<R, LinesCodec>,
    handle: FragmentHandle<Line>,
    shutdown: CancellationToken,
    responder: F,
    tracker: TaskTracker,
) where
    R: AsyncRead + Unpin,
    F: Fn(String) -> St,
    St: Stream<Item = String> + Send + 'static,
{
    loop {
        let next = tokio::select! {
            biased;

            () = shutdown.cancelled() => break,
            next = lines.next() => next,
        };
        let line = match next {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!("request decode failed: error={e}");
                break;
            }
            None => break,
        };
        let unit = handle.on_request(line);
        debug!("request received: sequence={}", unit.sequence());
        let (sequence, request) = unit.into_parts();
        let chunks = responder(request);
        tracker.spawn(respond(
            RequestUnit::new(sequence, ()),
            chunks,
            handle.clone(),
            shutdown.clone(),
        ));
    }
}

async fn respond<St>(
    unit: RequestUnit<()>,
    chunks: St,
    handle: FragmentHandle<Line>,
    shutdown: CancellationToken,
) where
    St: Stream<Item = String>,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut sent_any = false;
    loop {
        let next = tokio::select! {
            biased;

            () = shutdown.cancelled() => return,
            next = chunks.next() => next,
        };
        let Some(chunk) = next else { break };
        if handle.send(unit.respond_partial(Some(chunk))).await.is_err() {
            return;
        }
        sent_any = true;
    }
    let terminal = if sent_any { None } else { Some(String::new()) };
    let _ = handle.send(unit.respond(terminal)).await;
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::time::Duration;

    use futures::stream;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    use super::*;

    #[tokio::test]
    async fn responses_follow_request_order() {
        let (client, server) = duplex(1024);
        let serve = tokio::spawn(serve_lines(
            server,
            PipelineConfig::default(),
            CancellationToken::new(),
            |line: String| {
                let delay = if line == "slow" { 30 } else { 0 };
                stream::once(async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    stream::iter(vec![format!("{line}-1"), format!("{line}-2")])
                })
                .flatten()
            },
        ));

        let (mut rx, mut tx) = tokio::io::split(client);
        tx.write_all(b"slow\nfast\n").await.expect("write requests");
        tx.shutdown().await.expect("close request side");

        let mut out = String::new();
        rx.read_to_string(&mut out).await.expect("read responses");
        assert_eq!(out, "slow-1\nslow-2\nfast-1\nfast-2\n");

        let reason = serve.await.expect("server task panicked");
        assert_eq!(reason.ok(), Some(CloseReason::Completed));
    }

    #[tokio::test]
    async fn empty_response_still_closes_sequence() {
        let (client, server) = duplex(256);
        let serve = tokio::spawn(serve_lines(
            server,
            PipelineConfig::default(),
            CancellationToken::new(),
            |line: String| {
                let chunks = if line == "quiet" { vec![] } else { vec![line] };
                stream::iter(chunks)
            },
        ));

        let (mut rx, mut tx) = tokio::io::split(client);
        tx.write_all(b"quiet\nloud\n").await.expect("write requests");
        tx.shutdown().await.expect("close request side");

        let mut out = String::new();
        rx.read_to_string(&mut out).await.expect("read responses");
        assert_eq!(out, "\nloud\n");
        assert!(serve.await.expect("server task panicked").is_ok());
    }

    #[tokio::test]
    async fn first_chunk_is_written_before_the_response_ends() {
        let (client, server) = duplex(256);
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let release = std::sync::Mutex::new(Some(release_rx));
        let serve = tokio::spawn(serve_lines(
            server,
            PipelineConfig::default(),
            CancellationToken::new(),
            move |line: String| {
                let gate = release
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .take();
                let tail = stream::once(async move {
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                    format!("{line}-end")
                });
                stream::iter(vec![String::from("head")]).chain(tail)
            },
        ));

        let (rx, mut tx) = tokio::io::split(client);
        tx.write_all(b"slow\n").await.expect("write request");
        let mut lines = FramedRead::new(rx, LinesCodec::new());
        let head = tokio::time::timeout(Duration::from_millis(500), lines.next())
            .await
            .expect("head chunk not forwarded while the response is open");
        assert_eq!(head.and_then(Result::ok).as_deref(), Some("head"));

        release_tx.send(()).expect("responder waiting");
        tx.shutdown().await.expect("close request side");
        let rest: Vec<String> = lines.filter_map(|l| async move { l.ok() }).collect().await;
        assert_eq!(rest, vec!["slow-end"]);
        assert!(serve.await.expect("server task panicked").is_ok());
    }

    #[tokio::test]
    async fn shutdown_does_not_wait_for_stalled_responder() {
        let (client, server) = duplex(256);
        let shutdown = CancellationToken::new();
        let serve = tokio::spawn(serve_lines(
            server,
            PipelineConfig::default(),
            shutdown.clone(),
            |_line: String| stream::pending::<String>(),
        ));

        let (_rx, mut tx) = tokio::io::split(client);
        tx.write_all(b"hang\n").await.expect("write request");
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let reason = tokio::time::timeout(Duration::from_millis(500), serve)
            .await
            .expect("serve_lines kept waiting on a stalled responder")
            .expect("server task panicked");
        assert_eq!(reason.ok(), Some(CloseReason::Shutdown));
    }
}
