//! The database handle: every mapper operation starts here.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use shelf_bucket_store::{BucketRemoval, Store};
use shelf_event_hub::{Hub, Publish};

use crate::codec::{Codec, JsonCodec};
use crate::collect::{self, Element};
use crate::cursor::{Entries, Params};
use crate::error::{Error, Result};
use crate::ident::{self, Assigned};
use crate::instrument::{joined, OpLog};
use crate::notify::{Mutation, Notifier};
use crate::options::Options;
use crate::path::Path;
use crate::record::Record;
use crate::resolve::{require, resolve, resolve_or_create};

/// A record database backed by one bucket store file.
///
/// Every operation runs in exactly one store transaction: reads in a
/// snapshot, writes in a write transaction that either commits whole or
/// leaves nothing behind. Concurrent callers share one `Db` by reference;
/// the store serializes writers and lets readers run alongside them.
///
/// Successful saves and deletes publish a `<Type>Created`, `<Type>Updated`
/// or `<Type>Deleted` event carrying a copy of the record. Publication
/// happens after commit and never blocks or fails the operation.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use shelf_mapper::{Db, Options, Params, Record};
///
/// #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// struct Person {
///     id: String,
///     name: String,
/// }
///
/// impl Record for Person {
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn set_id(&mut self, id: String) {
///         self.id = id;
///     }
/// }
///
/// let db = Db::in_memory(Options::default()).unwrap();
///
/// let mut ada = Person { name: "Ada".into(), ..Default::default() };
/// db.save("people", &mut ada).unwrap();
/// assert_eq!(ada.id, "1");
///
/// let found: Option<Person> = db.find("people", "1").unwrap();
/// assert_eq!(found, Some(ada));
///
/// let mut page: Vec<Person> = Vec::new();
/// db.list_with("people", &mut page, Params::new().limit(10)).unwrap();
/// assert_eq!(page.len(), 1);
/// ```
pub struct Db<C: Codec = JsonCodec> {
    // Operations clone the handle out and release the lock before their
    // transaction starts; close swaps it out.
    store: RwLock<Option<Arc<Store>>>,
    file: Option<PathBuf>,
    codec: C,
    options: Options,
    hub: Hub,
    notifier: Notifier,
}

impl Db<JsonCodec> {
    /// Open or create the database file at `file`.
    ///
    /// Waits up to `options.store.timeout` for another handle to release
    /// the file.
    pub fn open(file: impl AsRef<std::path::Path>, options: Options) -> Result<Self> {
        let file = file.as_ref();
        let store = Store::open(file, &options.store).map_err(|e| Error::store("open", e))?;
        tracing::debug!(file = %file.display(), "opened database");
        Self::assemble(store, Some(file.to_path_buf()), options)
    }

    /// A database that lives in memory only.
    pub fn in_memory(options: Options) -> Result<Self> {
        let store = Store::in_memory().map_err(|e| Error::store("open", e))?;
        Self::assemble(store, None, options)
    }

    fn assemble(store: Store, file: Option<PathBuf>, options: Options) -> Result<Self> {
        let hub = Hub::start(options.event_workers)?;
        let notifier = Notifier::new(Arc::new(hub.clone()));
        Ok(Self {
            store: RwLock::new(Some(Arc::new(store))),
            file,
            codec: JsonCodec,
            options,
            hub,
            notifier,
        })
    }
}

impl<C: Codec> Db<C> {
    /// Switch to another codec. Existing payloads are not converted.
    pub fn with_codec<D: Codec>(self, codec: D) -> Db<D> {
        Db {
            store: self.store,
            file: self.file,
            codec,
            options: self.options,
            hub: self.hub,
            notifier: self.notifier,
        }
    }

    /// Send mutation events to `publisher` instead of the built-in hub.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn Publish>) -> Self {
        self.notifier = Notifier::new(publisher);
        self
    }

    /// The built-in event hub, for subscribing to mutation events.
    pub fn events(&self) -> &Hub {
        &self.hub
    }

    /// The database file, or `None` for an in-memory database.
    pub fn file(&self) -> Option<&std::path::Path> {
        self.file.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn is_open(&self) -> bool {
        self.store.read().is_some()
    }

    /// Release the database file and stop the event hub.
    ///
    /// Events already published are delivered first. Afterwards every
    /// operation fails with [`Error::NotOpen`] and [`count`](Db::count)
    /// returns 0. Closing does not wait for operations already running;
    /// the file is released when the last of them finishes. Closing twice
    /// is harmless.
    pub fn close(&self) -> Result<()> {
        if self.store.write().take().is_some() {
            tracing::debug!(file = ?self.file, "closed database");
        }
        self.hub.shutdown()?;
        Ok(())
    }

    // === Reads ===

    /// Decode the record stored at `id` into `dest`.
    ///
    /// An absent key or an empty payload leaves `dest` as it was.
    pub fn find_into<T: Record>(&self, path: impl Into<Path>, id: &str, dest: &mut T) -> Result<()> {
        let path = path.into();
        let log = self.log("FIND", &path, id);
        let result = self.with_store(&path, |store| {
            store.view(|tx| {
                let bucket = require(tx, &path)?;
                let stored = bucket.get(id.as_bytes()).map_err(|e| Error::store("read key", e))?;
                if let Some(bytes) = stored {
                    self.codec.decode_into(&bytes, dest)?;
                }
                Ok(())
            })
        });
        log.finish(result)
    }

    /// The record stored at `id`, or `None` if there is none.
    pub fn find<T: Record>(&self, path: impl Into<Path>, id: &str) -> Result<Option<T>> {
        let path = path.into();
        let log = self.log("FIND", &path, id);
        let result = self.with_store(&path, |store| {
            store.view(|tx| {
                let bucket = require(tx, &path)?;
                match bucket.get(id.as_bytes()).map_err(|e| Error::store("read key", e))? {
                    Some(bytes) => collect::decode_element::<T, C>(&self.codec, &bytes).map(Some),
                    None => Ok(None),
                }
            })
        });
        log.finish(result)
    }

    /// The raw bytes stored at `key`, or `None` if there are none.
    pub fn get(&self, path: impl Into<Path>, key: &str) -> Result<Option<Bytes>> {
        let path = path.into();
        let log = self.log("GET", &path, key);
        let result = self.with_store(&path, |store| {
            store.view(|tx| {
                let bucket = require(tx, &path)?;
                let stored = bucket.get(key.as_bytes()).map_err(|e| Error::store("read key", e))?;
                Ok(stored.map(Bytes::from))
            })
        });
        log.finish(result)
    }

    // === Writes ===

    /// Store `record`, creating the buckets along `path` as needed.
    ///
    /// A record with an empty id gets the bucket's next sequence number as
    /// its id and publishes `<Type>Created`; otherwise the record at its id
    /// is replaced and `<Type>Updated` is published. The id and any hook
    /// changes are written back to `record` only once the save has
    /// committed, so a failed save leaves `record` untouched.
    pub fn save<T: Record>(&self, path: impl Into<Path>, record: &mut T) -> Result<()> {
        let path = path.into();
        let log = self
            .log("SAVE", &path, record.id())
            .data(|| serde_json::to_string(&*record).unwrap_or_default());

        let result = self.with_store(&path, |store| {
            let mut staged = record.clone();
            let assigned = store.update(|tx| {
                let bucket = resolve_or_create(tx, &path)?;
                let assigned = ident::assign(&bucket, &mut staged)?;
                let payload = self.codec.encode(&staged)?;
                bucket
                    .put(staged.id().as_bytes(), &payload)
                    .map_err(|e| Error::store("write record", e))?;
                Ok::<_, Error>(assigned)
            })?;
            *record = staged;
            Ok(assigned)
        });

        let assigned = log.finish(result)?;
        let mutation = match assigned {
            Assigned::New => Mutation::Created,
            Assigned::Existing => Mutation::Updated,
        };
        self.notifier.notify(mutation, record);
        Ok(())
    }

    /// Store raw bytes at `key`, creating the buckets along `path` as
    /// needed. No event is published.
    pub fn save_value(&self, path: impl Into<Path>, key: &str, value: &[u8]) -> Result<()> {
        let path = path.into();
        let log = self
            .log("SAVE-VALUE", &path, key)
            .data(|| String::from_utf8_lossy(value).into_owned());

        let result = self.with_store(&path, |store| {
            store.update(|tx| {
                resolve_or_create(tx, &path)?
                    .put(key.as_bytes(), value)
                    .map_err(|e| Error::store("write value", e))
            })
        });
        log.finish(result)
    }

    /// Remove `record` by its id and publish `<Type>Deleted`.
    pub fn delete<T: Record>(&self, path: impl Into<Path>, record: &T) -> Result<()> {
        self.delete_keys(path, &[record.id()])?;
        self.notifier.notify(Mutation::Deleted, record);
        Ok(())
    }

    /// Remove the values at `keys`. Keys with no value are ignored.
    pub fn delete_keys<K: AsRef<str>>(&self, path: impl Into<Path>, keys: &[K]) -> Result<()> {
        let path = path.into();
        let log = self
            .log("DELETE", &path, "")
            .data(|| joined(keys.iter().map(AsRef::<str>::as_ref)));

        let result = self.with_store(&path, |store| {
            store.update(|tx| {
                let bucket = require(tx, &path)?;
                for key in keys {
                    bucket
                        .delete(key.as_ref().as_bytes())
                        .map_err(|e| Error::store("delete key", e))?;
                }
                Ok(())
            })
        });
        log.finish(result)
    }

    /// Remove the child buckets `names` of the bucket at `path`, using the
    /// configured [`BucketRemoval`] policy.
    pub fn delete_buckets<K: AsRef<str>>(&self, path: impl Into<Path>, names: &[K]) -> Result<()> {
        self.delete_buckets_with(path, names, self.options.bucket_removal)
    }

    /// Remove child buckets under an explicit policy.
    ///
    /// A bucket that still has child buckets is never removed. All names
    /// are removed in one transaction: if any removal fails, none happen.
    pub fn delete_buckets_with<K: AsRef<str>>(
        &self,
        path: impl Into<Path>,
        names: &[K],
        removal: BucketRemoval,
    ) -> Result<()> {
        let path = path.into();
        let log = self
            .log("DELETE-BUCKET", &path, "")
            .data(|| joined(names.iter().map(AsRef::<str>::as_ref)));

        let result = self.with_store(&path, |store| {
            store.update(|tx| {
                let bucket = require(tx, &path)?;
                for name in names {
                    bucket
                        .delete_bucket(name.as_ref().as_bytes(), removal)
                        .map_err(|e| Error::store("delete bucket", e))?;
                }
                Ok(())
            })
        });
        log.finish(result)
    }

    // === Listings ===

    /// Append the records at `path` to `dest`, in key order, using the
    /// default page.
    pub fn list<E: Element>(&self, path: impl Into<Path>, dest: &mut Vec<E>) -> Result<()> {
        self.list_with(path, dest, self.default_params())
    }

    /// Append one page of records to `dest`.
    ///
    /// Entries with an empty value are passed over, and do not count
    /// towards the offset. On a decode failure, records appended before it
    /// stay in `dest`.
    pub fn list_with<E: Element>(
        &self,
        path: impl Into<Path>,
        dest: &mut Vec<E>,
        params: Params,
    ) -> Result<()> {
        let path = path.into();
        let log = self.log("LIST", &path, "").data(|| describe(&params));

        let result = self.with_store(&path, |store| {
            store.view(|tx| {
                let bucket = require(tx, &path)?;
                collect::fill(&self.codec, Entries::new(&bucket, params, true), dest)
            })
        });
        log.finish(result)
    }

    /// Append the records stored at `keys` to `dest`, in the order given.
    /// Keys with no value are skipped.
    pub fn list_keys<E, K>(&self, path: impl Into<Path>, keys: &[K], dest: &mut Vec<E>) -> Result<()>
    where
        E: Element,
        K: AsRef<[u8]>,
    {
        let path = path.into();
        let log = self
            .log("LISTKEYS", &path, "")
            .data(|| joined(keys.iter().map(|k| String::from_utf8_lossy(k.as_ref()))));

        let result = self.with_store(&path, |store| {
            store.view(|tx| {
                let bucket = require(tx, &path)?;
                collect::fill_keys(&self.codec, &bucket, keys, dest)
            })
        });
        log.finish(result)
    }

    /// Raw values by key, using the default page.
    pub fn list_items(&self, path: impl Into<Path>) -> Result<BTreeMap<Bytes, Bytes>> {
        self.list_items_with(path, self.default_params())
    }

    /// One page of raw values by key. Empty values are included.
    ///
    /// Keys are returned as stored, so the map orders them bytewise the
    /// same way the bucket does.
    pub fn list_items_with(
        &self,
        path: impl Into<Path>,
        params: Params,
    ) -> Result<BTreeMap<Bytes, Bytes>> {
        let path = path.into();
        let log = self.log("LIST-ITEMS", &path, "").data(|| describe(&params));

        let result = self.with_store(&path, |store| {
            store.view(|tx| {
                let bucket = require(tx, &path)?;
                Entries::new(&bucket, params, false)
                    .map(|entry| entry.map(|(key, value)| (Bytes::from(key), Bytes::from(value))))
                    .collect()
            })
        });
        log.finish(result)
    }

    /// Raw values in key order, using the default page.
    pub fn values(&self, path: impl Into<Path>) -> Result<Vec<Bytes>> {
        self.values_with(path, self.default_params())
    }

    /// One page of raw values in key order. Empty values are included.
    pub fn values_with(&self, path: impl Into<Path>, params: Params) -> Result<Vec<Bytes>> {
        let path = path.into();
        let log = self.log("VALUES", &path, "").data(|| describe(&params));

        let result = self.with_store(&path, |store| {
            store.view(|tx| {
                let bucket = require(tx, &path)?;
                Entries::new(&bucket, params, false)
                    .map(|entry| entry.map(|(_, value)| Bytes::from(value)))
                    .collect()
            })
        });
        log.finish(result)
    }

    /// Number of values stored directly in the bucket at `path`.
    ///
    /// Never fails: a closed database, an empty path or a missing bucket
    /// all count as 0.
    pub fn count(&self, path: impl Into<Path>) -> usize {
        let path = path.into();
        let counted = self.with_store(&path, |store| {
            store.view(|tx| match resolve(tx, &path)? {
                Some(bucket) => Ok(bucket
                    .stats()
                    .map_err(|e| Error::store("bucket stats", e))?
                    .key_count),
                None => Ok(0),
            })
        });

        match counted {
            Ok(count) => count,
            Err(e) => {
                if !e.is_precondition() {
                    tracing::warn!(path = %path, error = %e, "count failed, reporting 0");
                }
                0
            }
        }
    }

    // === Helpers ===

    fn with_store<R>(&self, path: &Path, f: impl FnOnce(&Store) -> Result<R>) -> Result<R> {
        let store = self.store.read().as_ref().map(Arc::clone).ok_or(Error::NotOpen)?;
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }
        f(&store)
    }

    fn log(&self, method: &'static str, path: &Path, key: &str) -> OpLog {
        OpLog::start(self.options.log_operations, method, path, key)
    }

    fn default_params(&self) -> Params {
        Params::new().limit(self.options.default_limit)
    }
}

fn describe(params: &Params) -> String {
    format!(
        "offset={} limit={} reverse={}",
        params.offset, params.limit, params.reverse
    )
}

impl<C: Codec> std::fmt::Debug for Db<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("file", &self.file)
            .field("open", &self.is_open())
            .field("format", &self.codec.format())
            .finish_non_exhaustive()
    }
}
