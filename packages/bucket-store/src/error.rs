//! Error types for the bucket store.
//!
//! Errors at this level describe the bucket tree and the storage engine only.
//! Record-level concerns (encoding, missing paths, closed handles) belong to
//! the mapper layer.

use thiserror::Error;

/// Errors raised by [`Store`](crate::Store), [`Tx`](crate::Tx) and
/// [`Bucket`](crate::Bucket) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The named bucket does not exist.
    #[error("bucket not found")]
    BucketNotFound,

    /// A bucket name was used where a value lives, or the other way around.
    #[error("incompatible value")]
    IncompatibleValue,

    /// Buckets must have a non-empty name.
    #[error("bucket name required")]
    BucketNameRequired,

    /// Values must have a non-empty key.
    #[error("key required")]
    KeyRequired,

    /// The bucket still contains child buckets and cannot be removed.
    #[error("bucket has child buckets")]
    BucketHasChildren,

    /// The bucket still contains values and the removal policy forbids it.
    #[error("bucket is not empty")]
    BucketNotEmpty,

    /// A write was attempted inside a read transaction.
    #[error("transaction is read-only")]
    ReadOnly,

    /// The database file stayed locked for longer than the open timeout.
    #[error("timed out waiting for the database lock")]
    Timeout,

    /// Failure inside the storage engine.
    #[error("engine error: {0}")]
    Engine(#[from] redb::Error),
}

impl From<redb::DatabaseError> for Error {
    fn from(e: redb::DatabaseError) -> Self {
        Error::Engine(e.into())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(e: redb::TransactionError) -> Self {
        Error::Engine(e.into())
    }
}

impl From<redb::TableError> for Error {
    fn from(e: redb::TableError) -> Self {
        Error::Engine(e.into())
    }
}

impl From<redb::StorageError> for Error {
    fn from(e: redb::StorageError) -> Self {
        Error::Engine(e.into())
    }
}

impl From<redb::CommitError> for Error {
    fn from(e: redb::CommitError) -> Self {
        Error::Engine(e.into())
    }
}

/// Result type alias for bucket store operations.
pub type Result<T> = std::result::Result<T, Error>;
