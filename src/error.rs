//! Error types surfaced by the ordering core.
//!
//! Only [`PipelineError::CapacityExceeded`] reaches the peer, and it does so
//! as a closed connection. The remaining variants describe caller contract
//! violations: the offending fragment is dropped and ordering state is left
//! untouched.

use thiserror::Error;

use crate::sequence::Sequence;

/// Reasons a submitted fragment was not accepted.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    /// The hold limit was reached; the connection has been disconnected.
    #[error("held fragment limit of {max_held} exceeded; connection closed")]
    CapacityExceeded {
        /// Configured hold limit.
        max_held: usize,
    },
    /// The fragment quotes a sequence that was never assigned.
    #[error("fragment for unassigned sequence {sequence}; next assignable is {next_assignable}")]
    UnassignedSequence {
        /// Sequence quoted by the fragment.
        sequence: Sequence,
        /// Next sequence the connection would assign.
        next_assignable: Sequence,
    },
    /// The response for this sequence has already been fully released.
    #[error("fragment for completed sequence {sequence}; next required is {next_required}")]
    SequenceAlreadyReleased {
        /// Sequence quoted by the fragment.
        sequence: Sequence,
        /// Earliest sequence still awaiting its last fragment.
        next_required: Sequence,
    },
    /// The connection has already been closed.
    #[error("pipeline closed")]
    Closed,
}

impl PipelineError {
    /// Returns `true` if the error stems from a misbehaving producer rather
    /// than from the connection state.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::UnassignedSequence { .. } | Self::SequenceAlreadyReleased { .. }
        )
    }
}

/// Result alias used by the ordering core.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_sequences() {
        let err = PipelineError::SequenceAlreadyReleased {
            sequence: Sequence::new(1),
            next_required: Sequence::new(4),
        };
        assert_eq!(
            err.to_string(),
            "fragment for completed sequence #1; next required is #4"
        );
        assert!(err.is_contract_violation());
        assert!(!PipelineError::Closed.is_contract_violation());
    }
}
