//! The store handle and its transaction entry points.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use redb::{Database, DatabaseError};

use crate::error::{Error, Result};
use crate::tables::{BUCKETS, ENTRIES, META};
use crate::tx::Tx;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Configuration options for opening a [`Store`].
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// How long to wait for another handle to release the database file.
    /// `None` waits forever.
    pub timeout: Option<Duration>,

    /// Engine page cache size in bytes. If not set, uses redb's default.
    pub cache_size: Option<usize>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(1)),
            cache_size: None,
        }
    }
}

impl StoreOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lock wait timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the cache size.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }
}

/// A transactional store of nested buckets.
///
/// Reads run in [`view`](Store::view) and see a consistent snapshot; writes
/// run in [`update`](Store::update) and are serialized by the engine, so
/// at most one write transaction is active at a time.
///
/// # Example
///
/// ```rust
/// use shelf_bucket_store::Store;
///
/// let store = Store::in_memory().unwrap();
///
/// store
///     .update(|tx| {
///         let people = tx.create_bucket_if_not_exists(b"people")?;
///         people.put(b"1", b"Alice")
///     })
///     .unwrap();
///
/// let value = store
///     .view(|tx| match tx.bucket(b"people")? {
///         Some(people) => people.get(b"1"),
///         None => Ok(None),
///     })
///     .unwrap();
/// assert_eq!(value.as_deref(), Some(&b"Alice"[..]));
/// ```
pub struct Store {
    db: Database,
}

impl Store {
    /// Open or create a database file.
    ///
    /// If another handle holds the file, retries until `options.timeout`
    /// elapses and then fails with [`Error::Timeout`].
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

        let db = loop {
            let mut builder = Database::builder();
            if let Some(cache_size) = options.cache_size {
                builder.set_cache_size(cache_size);
            }

            match builder.create(path) {
                Ok(db) => break db,
                Err(DatabaseError::DatabaseAlreadyOpen) => {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return Err(Error::Timeout);
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::debug!(path = %path.display(), "opened store");
        Self::init(db)
    }

    /// Create a store backed by memory only. Its contents vanish on drop.
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    // Create the tables up front so read transactions never have to cope
    // with their absence.
    fn init(db: Database) -> Result<Self> {
        let txn = db.begin_write()?;
        {
            txn.open_table(BUCKETS)?;
            txn.open_table(ENTRIES)?;
            txn.open_table(META)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    /// Run `f` inside a read transaction.
    pub fn view<R, E>(&self, f: impl FnOnce(&Tx<'_>) -> std::result::Result<R, E>) -> std::result::Result<R, E>
    where
        E: From<Error>,
    {
        let txn = self.db.begin_read().map_err(Error::from)?;
        let tx = Tx::read(&txn)?;
        f(&tx)
    }

    /// Run `f` inside a write transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and is aborted when it
    /// returns `Err`, discarding everything `f` wrote, sequence advances
    /// included.
    pub fn update<R, E>(&self, f: impl FnOnce(&Tx<'_>) -> std::result::Result<R, E>) -> std::result::Result<R, E>
    where
        E: From<Error>,
    {
        let txn = self.db.begin_write().map_err(Error::from)?;
        let outcome = match Tx::write(&txn) {
            Ok(tx) => f(&tx),
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(value) => {
                txn.commit().map_err(Error::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort) = txn.abort() {
                    tracing::warn!(error = %abort, "failed to abort write transaction");
                }
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
