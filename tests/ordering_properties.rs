#![cfg(not(loom))]
//! Property-based tests for the ordering core.
//!
//! Responses made of several chunks are submitted in random interleavings;
//! the transport must always see them grouped by request, in request order,
//! with each response's chunks in production order.

use std::sync::Arc;

use pipelining::{
    OrderingState, PipelineError, ResponseFragment, Sequence, Sequencer, Transport,
};
use proptest::prelude::*;

#[derive(Default)]
struct Wire {
    written: Vec<(u64, usize)>,
    disconnected: bool,
}

impl Transport<(u64, usize)> for Wire {
    fn write(&mut self, payload: (u64, usize)) { self.written.push(payload); }

    fn flush(&mut self) {}

    fn disconnect(&mut self) { self.disconnected = true; }

    fn is_writable(&self) -> bool { true }
}

fn state_for(requests: u64, max_held: usize) -> OrderingState<(u64, usize)> {
    let sequencer = Arc::new(Sequencer::new());
    for _ in 0..requests {
        let _ = sequencer.next();
    }
    OrderingState::new(sequencer, max_held)
}

prop_compose! {
    /// Chunk counts per request plus a shuffled interleaving of their
    /// submissions, one entry per chunk naming its request.
    fn interleaving()
        (chunks in proptest::collection::vec(1usize..4, 1..8))
        (order in Just(
            chunks
                .iter()
                .enumerate()
                .flat_map(|(seq, &n)| std::iter::repeat_n(seq as u64, n))
                .collect::<Vec<_>>()
        ).prop_shuffle(), chunks in Just(chunks))
        -> (Vec<usize>, Vec<u64>) {
            (chunks, order)
        }
}

proptest! {
    #[test]
    fn output_grouped_by_request_in_order((chunks, order) in interleaving()) {
        let mut state = state_for(chunks.len() as u64, 64);
        let mut wire = Wire::default();
        let mut produced = vec![0usize; chunks.len()];

        for seq in order {
            let index = usize::try_from(seq).expect("small sequence");
            let chunk = produced[index];
            produced[index] += 1;
            let last = produced[index] == chunks[index];
            let fragment = ResponseFragment::with_last(Sequence::new(seq), last, (seq, chunk));
            state.submit(fragment, &mut wire).expect("admitted");
            prop_assert!(state.held() <= state.max_held());
        }

        let expected: Vec<_> = chunks
            .iter()
            .enumerate()
            .flat_map(|(seq, &n)| (0..n).map(move |chunk| (seq as u64, chunk)))
            .collect();
        prop_assert_eq!(wire.written, expected);
        prop_assert_eq!(state.held(), 0);
        prop_assert_eq!(state.next_required(), Sequence::new(chunks.len() as u64));
    }

    #[test]
    fn hold_limit_disconnects_on_first_excess(max_held in 1usize..32) {
        let mut state = state_for(max_held as u64 + 2, max_held);
        let mut wire = Wire::default();

        for seq in 1..=max_held as u64 {
            let fragment = ResponseFragment::new(Sequence::new(seq), (seq, 0));
            prop_assert!(state.submit(fragment, &mut wire).expect("held").is_held());
        }
        prop_assert!(!wire.disconnected);

        let excess = ResponseFragment::new(Sequence::new(max_held as u64 + 1), (0, 0));
        prop_assert_eq!(
            state.submit(excess, &mut wire),
            Err(PipelineError::CapacityExceeded { max_held })
        );
        prop_assert!(wire.disconnected);
        prop_assert!(wire.written.is_empty());
    }
}
