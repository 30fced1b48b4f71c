use std::fmt;
use thiserror::Error;

/// Result type for stage chain operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or running a chain
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A caller passed an argument the operation cannot accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The queue's slot buffer could not be allocated
    #[error("Queue allocation failed for capacity {capacity}")]
    AllocationFailed { capacity: usize },

    /// The stage was never initialized or has already been torn down
    #[error("Stage '{0}' is not initialized")]
    NotInitialized(String),

    /// A zero-capacity queue rejects every item
    #[error("Queue has zero capacity")]
    ZeroCapacity,

    /// The queue's finished latch is set and it accepts no more items
    #[error("Queue finished")]
    Finished,

    /// The worker thread could not be started
    #[error("Failed to spawn worker for stage '{stage}': {source}")]
    ThreadSpawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker thread panicked before it could be joined cleanly
    #[error("Worker for stage '{0}' panicked")]
    WorkerPanicked(String),

    /// No stages in chain
    #[error("Cannot build a chain with no stages")]
    NoStages,

    /// No transform is registered under the requested name
    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),

    /// The terminal sink could not accept a line
    #[error("Sink error: {0}")]
    Sink(String),

    /// Reading chain input failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection from [`BoundedQueue::put`](crate::queue::BoundedQueue::put).
///
/// The rejected item is handed back so the producer keeps ownership of it.
#[derive(PartialEq, Eq)]
pub enum PutError<T> {
    /// The queue was created with capacity 0
    ZeroCapacity(T),
    /// The queue's finished latch was set before or while waiting for space
    Finished(T),
}

impl<T> PutError<T> {
    /// Recover the item that was not enqueued
    pub fn into_inner(self) -> T {
        match self {
            PutError::ZeroCapacity(item) | PutError::Finished(item) => item,
        }
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::ZeroCapacity(_) => f.write_str("ZeroCapacity(..)"),
            PutError::Finished(_) => f.write_str("Finished(..)"),
        }
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::ZeroCapacity(_) => f.write_str("Queue has zero capacity"),
            PutError::Finished(_) => f.write_str("Queue finished"),
        }
    }
}

impl<T> std::error::Error for PutError<T> {}

impl<T> From<PutError<T>> for PipelineError {
    fn from(err: PutError<T>) -> Self {
        match err {
            PutError::ZeroCapacity(_) => PipelineError::ZeroCapacity,
            PutError::Finished(_) => PipelineError::Finished,
        }
    }
}
