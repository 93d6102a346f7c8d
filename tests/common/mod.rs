//! Shared fixtures for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use pipelining::{PipelineConfig, PipelineHandler, ResponseFragment, Sequence};
use pipelining_testing::RecordingTransport;
use rstest::fixture;

/// Handler and the transport it writes to.
pub type Harness = (PipelineHandler<RecordingTransport<String>, String>, RecordingTransport<String>);

/// Build a handler over a fresh [`RecordingTransport`].
pub fn harness_with(config: PipelineConfig) -> Harness {
    let transport = RecordingTransport::new();
    let handler = PipelineHandler::with_config(transport.clone(), config);
    (handler, transport)
}

/// Handler with the default configuration.
#[fixture]
pub fn harness() -> Harness { harness_with(PipelineConfig::default()) }

/// Terminal fragment for sequence `n`.
pub fn last(n: u64, payload: &str) -> ResponseFragment<String> {
    ResponseFragment::new(Sequence::new(n), payload.to_owned())
}

/// Non-terminal fragment for sequence `n`.
pub fn partial(n: u64, payload: &str) -> ResponseFragment<String> {
    ResponseFragment::partial(Sequence::new(n), payload.to_owned())
}
