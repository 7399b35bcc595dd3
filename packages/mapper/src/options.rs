//! Database configuration.

use std::time::Duration;

use shelf_bucket_store::{BucketRemoval, StoreOptions};

use crate::cursor::DEFAULT_LIMIT;

/// Configuration options for a [`Db`](crate::Db).
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Options for the underlying bucket store.
    pub store: StoreOptions,

    /// Log every operation on the `shelf::ops` tracing target.
    pub log_operations: bool,

    /// Page size used by listings called without [`Params`](crate::Params).
    pub default_limit: usize,

    /// Worker threads delivering mutation events.
    pub event_workers: usize,

    /// What [`Db::delete_buckets`](crate::Db::delete_buckets) may remove.
    pub bucket_removal: BucketRemoval,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            store: StoreOptions::default(),
            log_operations: false,
            default_limit: DEFAULT_LIMIT,
            event_workers: 4,
            bucket_removal: BucketRemoval::Leaf,
        }
    }
}

impl Options {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database lock timeout. `None` waits forever.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store = self.store.timeout(timeout);
        self
    }

    /// Set the engine cache size in bytes.
    #[must_use]
    pub fn cache_size(mut self, size: usize) -> Self {
        self.store = self.store.cache_size(size);
        self
    }

    /// Turn operation logging on or off.
    #[must_use]
    pub fn log_operations(mut self, enabled: bool) -> Self {
        self.log_operations = enabled;
        self
    }

    /// Set the default page size.
    #[must_use]
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the number of event worker threads.
    #[must_use]
    pub fn event_workers(mut self, workers: usize) -> Self {
        self.event_workers = workers;
        self
    }

    /// Set the bucket removal policy.
    #[must_use]
    pub fn bucket_removal(mut self, removal: BucketRemoval) -> Self {
        self.bucket_removal = removal;
        self
    }
}
