//! Path resolution: walking a chain of nested buckets.

use shelf_bucket_store::{Bucket, Tx};

use crate::error::{Error, Result};
use crate::path::Path;

/// Find the bucket at `path` without creating anything.
///
/// Returns `Ok(None)` as soon as any bucket along the path is missing.
pub(crate) fn resolve<'a, 'txn>(tx: &'a Tx<'txn>, path: &Path) -> Result<Option<Bucket<'a, 'txn>>> {
    let mut names = path.iter();
    let first = names.next().ok_or(Error::EmptyPath)?;

    let lookup = |e| Error::store("open bucket", e);
    let Some(mut bucket) = tx.bucket(first.as_bytes()).map_err(lookup)? else {
        return Ok(None);
    };
    for name in names {
        match bucket.bucket(name.as_bytes()).map_err(lookup)? {
            Some(child) => bucket = child,
            None => return Ok(None),
        }
    }
    Ok(Some(bucket))
}

/// Like [`resolve`], but a missing bucket is an error.
pub(crate) fn require<'a, 'txn>(tx: &'a Tx<'txn>, path: &Path) -> Result<Bucket<'a, 'txn>> {
    resolve(tx, path)?.ok_or_else(|| Error::BucketNotFound { path: path.clone() })
}

/// Find the bucket at `path`, creating every missing bucket on the way.
///
/// Stops at the first bucket that cannot be created. Buckets created before
/// that point belong to the same write transaction and roll back with it.
pub(crate) fn resolve_or_create<'a, 'txn>(tx: &'a Tx<'txn>, path: &Path) -> Result<Bucket<'a, 'txn>> {
    let mut names = path.iter();
    let first = names.next().ok_or(Error::EmptyPath)?;

    let create = |e| Error::store("create bucket", e);
    let mut bucket = tx.create_bucket_if_not_exists(first.as_bytes()).map_err(create)?;
    for name in names {
        bucket = bucket.create_bucket_if_not_exists(name.as_bytes()).map_err(create)?;
    }
    Ok(bucket)
}
