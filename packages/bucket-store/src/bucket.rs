//! Bucket handles.

use crate::cursor::Cursor;
use crate::error::Result;
use crate::tables::decode_key;
use crate::tx::Tx;

/// Policy for removing a bucket that still holds values.
///
/// A bucket with child buckets is never removed, whatever the policy: the
/// caller has to remove the children first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BucketRemoval {
    /// Remove a leaf bucket together with any values it holds.
    #[default]
    Leaf,
    /// Only remove buckets that hold no values at all.
    Empty,
}

/// Counters describing a bucket's direct contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    /// Number of values stored directly in the bucket.
    pub key_count: usize,
    /// Number of child buckets directly below the bucket.
    pub bucket_count: usize,
}

/// A named container of ordered key/value entries and child buckets.
///
/// Handles are cheap and borrow the transaction that produced them. Writes
/// through a handle obtained from a read transaction fail with
/// [`Error::ReadOnly`](crate::Error::ReadOnly).
pub struct Bucket<'a, 'txn> {
    tx: &'a Tx<'txn>,
    id: u64,
    slot: Vec<u8>,
}

impl<'a, 'txn> Bucket<'a, 'txn> {
    pub(crate) fn new(tx: &'a Tx<'txn>, id: u64, slot: Vec<u8>) -> Self {
        Self { tx, id, slot }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn slot(&self) -> &[u8] {
        &self.slot
    }

    /// The bucket's own name within its parent.
    pub fn name(&self) -> &[u8] {
        decode_key(&self.slot)
    }

    /// Read the value stored at `key`.
    ///
    /// Returns `Ok(None)` when the key is absent or names a child bucket.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.tx.entry(self.id, key)
    }

    /// Store `value` at `key`, replacing any previous value.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.tx.put_entry(self.id, key, value)
    }

    /// Remove the value at `key`. Removing an absent key is a no-op.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.tx.delete_entry(self.id, key)
    }

    /// Look up a child bucket.
    pub fn bucket(&self, name: &[u8]) -> Result<Option<Bucket<'a, 'txn>>> {
        self.tx.child(self.id, name)
    }

    /// Look up a child bucket, creating it if absent.
    pub fn create_bucket_if_not_exists(&self, name: &[u8]) -> Result<Bucket<'a, 'txn>> {
        self.tx.create_child(self.id, name)
    }

    /// Remove a child bucket according to `removal`.
    pub fn delete_bucket(&self, name: &[u8], removal: BucketRemoval) -> Result<()> {
        self.tx.remove_child(self.id, name, removal)
    }

    /// Names of the child buckets, in order.
    pub fn bucket_names(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .tx
            .children(self.id)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Advance the bucket's sequence and return the new value.
    ///
    /// Sequences start at zero, so the first call returns 1. The counter is
    /// part of the write transaction: an aborted transaction rolls it back.
    pub fn next_sequence(&self) -> Result<u64> {
        self.tx.next_sequence(&self.slot)
    }

    /// The bucket's current sequence value.
    pub fn sequence(&self) -> Result<u64> {
        self.tx.sequence(&self.slot)
    }

    /// A cursor over the bucket's values in key order.
    pub fn cursor(&self) -> Cursor<'a, 'txn> {
        Cursor::new(self.tx, self.id)
    }

    pub fn stats(&self) -> Result<BucketStats> {
        Ok(BucketStats {
            key_count: self.tx.entry_count(self.id)?,
            bucket_count: self.tx.child_count(self.id)?,
        })
    }
}

impl std::fmt::Debug for Bucket<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("id", &self.id)
            .field("name", &String::from_utf8_lossy(self.name()))
            .finish()
    }
}
