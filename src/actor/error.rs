//! Error types for the pipeline actor and its handles.

use thiserror::Error;

/// Errors returned when sending a fragment to a [`PipelineActor`](super::PipelineActor).
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The actor has stopped and no longer accepts fragments.
    #[error("pipeline actor closed")]
    Closed,
}

/// Failure that ended a [`PipelineActor`](super::PipelineActor) run.
#[derive(Debug)]
pub enum ActorError<E> {
    /// Feeding, flushing or closing the outbound sink failed.
    Transport(E),
}

impl<E: std::fmt::Display> std::fmt::Display for ActorError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "transport error: {error}"),
        }
    }
}

impl<E> std::error::Error for ActorError<E>
where
    E: std::fmt::Debug + std::fmt::Display + std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(error) => Some(error),
        }
    }
}
