#![cfg(loom)]
//! Concurrency tests for `PipelineHandler` using loom.
//!
//! Producers on separate threads race to submit fragments for different
//! requests. Whatever the interleaving, the transport must see responses in
//! request order and the hold limit must be enforced exactly once.

use std::sync::Arc;

use loom::{model, thread};
use pipelining::{PipelineConfig, PipelineError, PipelineHandler, ResponseFragment, Sequence};
use pipelining_testing::RecordingTransport;

#[test]
fn racing_producers_release_in_request_order() {
    model(|| {
        let transport = RecordingTransport::new();
        let handler = Arc::new(PipelineHandler::new(transport.clone()));
        let first = handler.on_request(());
        let second = handler.on_request(());

        let h1 = Arc::clone(&handler);
        let h2 = Arc::clone(&handler);
        let t1 = thread::spawn(move || {
            h1.submit(first.respond("first")).expect("admitted");
        });
        let t2 = thread::spawn(move || {
            h2.submit(second.respond("second")).expect("admitted");
        });
        t1.join().expect("first producer panicked");
        t2.join().expect("second producer panicked");

        assert_eq!(transport.written(), vec!["first", "second"]);
        assert_eq!(handler.held(), 0);
        assert_eq!(handler.next_required(), Sequence::new(2));
    });
}

#[test]
fn racing_overflow_disconnects_once() {
    model(|| {
        let config = PipelineConfig::builder()
            .max_held(1)
            .build()
            .expect("valid config");
        let transport = RecordingTransport::new();
        let handler = Arc::new(PipelineHandler::with_config(transport.clone(), config));
        for _ in 0..3 {
            let _ = handler.assign_sequence();
        }

        let h1 = Arc::clone(&handler);
        let h2 = Arc::clone(&handler);
        let t1 = thread::spawn(move || h1.submit(ResponseFragment::new(Sequence::new(1), 1u8)));
        let t2 = thread::spawn(move || h2.submit(ResponseFragment::new(Sequence::new(2), 2u8)));
        let results = [
            t1.join().expect("first producer panicked"),
            t2.join().expect("second producer panicked"),
        ];

        let overflowed = results
            .iter()
            .filter(|r| matches!(r, Err(PipelineError::CapacityExceeded { max_held: 1 })))
            .count();
        assert_eq!(overflowed, 1);
        assert!(transport.is_disconnected());
        assert!(handler.is_closed());
        assert!(transport.written().is_empty());
    });
}
