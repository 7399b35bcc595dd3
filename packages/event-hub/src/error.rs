//! Error types for the event hub.

use thiserror::Error;

/// Errors that can occur while running the hub.
///
/// Delivery itself never fails from the publisher's point of view; these
/// only cover setting up and tearing down the worker pool.
#[derive(Debug, Error)]
pub enum HubError {
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// A worker thread panicked outside of a handler.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}

/// Result type alias for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
