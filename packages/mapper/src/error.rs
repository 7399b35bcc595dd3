//! Error types for the mapper.

use thiserror::Error;

use crate::format::Format;
use crate::path::Path;

/// Errors returned by [`Db`](crate::Db) operations.
///
/// Every error reaches the immediate caller once; nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// The database has been closed.
    #[error("db is not opened")]
    NotOpen,

    /// An operation was given a path with no buckets in it.
    #[error("no bucket provided")]
    EmptyPath,

    /// A bucket along the path does not exist.
    #[error("bucket not found: {path}")]
    BucketNotFound { path: Path },

    /// The codec failed to serialize a record.
    #[error("encode error ({format}): {message}")]
    Encode { format: Format, message: String },

    /// The codec failed to deserialize a stored payload.
    #[error("decode error ({format}): {message}")]
    Decode { format: Format, message: String },

    /// The bucket store rejected the operation.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: shelf_bucket_store::Error,
    },

    /// The event hub could not be started or stopped cleanly.
    #[error("event hub: {0}")]
    Events(#[from] shelf_event_hub::HubError),
}

impl Error {
    /// Wrap a bucket store error with what the mapper was doing.
    pub fn store(context: &'static str, source: shelf_bucket_store::Error) -> Self {
        Error::Store { context, source }
    }

    /// True for errors caused by absent buckets.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::BucketNotFound { .. })
    }

    /// True for caller errors: a closed database or an empty path.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::NotOpen | Error::EmptyPath)
    }
}

impl From<shelf_bucket_store::Error> for Error {
    fn from(e: shelf_bucket_store::Error) -> Self {
        Error::store("store", e)
    }
}

/// Result type alias for mapper operations.
pub type Result<T> = std::result::Result<T, Error>;
