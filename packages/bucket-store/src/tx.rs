//! Transactions over the bucket tree.

use std::cell::RefCell;
use std::ops::Bound;

use redb::{ReadOnlyTable, ReadTransaction, ReadableTable, Table, Value, WriteTransaction};

use crate::bucket::{Bucket, BucketRemoval};
use crate::error::{Error, Result};
use crate::tables::{
    decode_key, encode_key, OwnerRange, BUCKETS, ENTRIES, FIRST_BUCKET_ID, META, NEXT_BUCKET_ID,
    ROOT_ID,
};

/// A key/value pair read from a bucket.
pub type Pair = (Vec<u8>, Vec<u8>);

type BucketTable<'txn> = Table<'txn, &'static [u8], (u64, u64)>;
type EntryTable<'txn> = Table<'txn, &'static [u8], &'static [u8]>;
type MetaTable<'txn> = Table<'txn, &'static str, u64>;

struct WriteTables<'txn> {
    buckets: RefCell<BucketTable<'txn>>,
    entries: RefCell<EntryTable<'txn>>,
    meta: RefCell<MetaTable<'txn>>,
}

enum Tables<'txn> {
    Read {
        buckets: ReadOnlyTable<&'static [u8], (u64, u64)>,
        entries: ReadOnlyTable<&'static [u8], &'static [u8]>,
    },
    Write(WriteTables<'txn>),
}

/// A read or write transaction.
///
/// Obtained through [`Store::view`](crate::Store::view) or
/// [`Store::update`](crate::Store::update). Every bucket handle borrows the
/// transaction it came from, so nothing outlives the transaction boundary.
/// Mutating calls on a read transaction fail with [`Error::ReadOnly`].
pub struct Tx<'txn> {
    tables: Tables<'txn>,
}

impl Tx<'static> {
    pub(crate) fn read(txn: &ReadTransaction) -> Result<Self> {
        Ok(Self {
            tables: Tables::Read {
                buckets: txn.open_table(BUCKETS)?,
                entries: txn.open_table(ENTRIES)?,
            },
        })
    }
}

impl<'txn> Tx<'txn> {
    pub(crate) fn write(txn: &'txn WriteTransaction) -> Result<Self> {
        Ok(Self {
            tables: Tables::Write(WriteTables {
                buckets: RefCell::new(txn.open_table(BUCKETS)?),
                entries: RefCell::new(txn.open_table(ENTRIES)?),
                meta: RefCell::new(txn.open_table(META)?),
            }),
        })
    }

    /// Whether this transaction may modify the store.
    pub fn is_writable(&self) -> bool {
        matches!(self.tables, Tables::Write(_))
    }

    /// Look up a top-level bucket.
    pub fn bucket(&self, name: &[u8]) -> Result<Option<Bucket<'_, 'txn>>> {
        self.child(ROOT_ID, name)
    }

    /// Look up a top-level bucket, creating it if absent.
    pub fn create_bucket_if_not_exists(&self, name: &[u8]) -> Result<Bucket<'_, 'txn>> {
        self.create_child(ROOT_ID, name)
    }

    /// Remove a top-level bucket according to `removal`.
    pub fn delete_bucket(&self, name: &[u8], removal: BucketRemoval) -> Result<()> {
        self.remove_child(ROOT_ID, name, removal)
    }

    fn write_tables(&self) -> Result<&WriteTables<'txn>> {
        match &self.tables {
            Tables::Write(tables) => Ok(tables),
            Tables::Read { .. } => Err(Error::ReadOnly),
        }
    }

    // === Buckets ===

    fn bucket_record(&self, slot: &[u8]) -> Result<Option<(u64, u64)>> {
        match &self.tables {
            Tables::Read { buckets, .. } => read_bucket_record(buckets, slot),
            Tables::Write(tables) => read_bucket_record(&*tables.buckets.borrow(), slot),
        }
    }

    pub(crate) fn child(&self, parent: u64, name: &[u8]) -> Result<Option<Bucket<'_, 'txn>>> {
        if name.is_empty() {
            return Ok(None);
        }
        let slot = encode_key(parent, name);
        Ok(self
            .bucket_record(&slot)?
            .map(|(id, _)| Bucket::new(self, id, slot)))
    }

    pub(crate) fn create_child(&self, parent: u64, name: &[u8]) -> Result<Bucket<'_, 'txn>> {
        if name.is_empty() {
            return Err(Error::BucketNameRequired);
        }
        let tables = self.write_tables()?;

        let slot = encode_key(parent, name);
        if let Some((id, _)) = self.bucket_record(&slot)? {
            return Ok(Bucket::new(self, id, slot));
        }
        if parent != ROOT_ID && self.entry(parent, name)?.is_some() {
            return Err(Error::IncompatibleValue);
        }

        let id = {
            let mut meta = tables.meta.borrow_mut();
            let id = meta
                .get(NEXT_BUCKET_ID)?
                .map(|guard| guard.value())
                .unwrap_or(FIRST_BUCKET_ID);
            meta.insert(NEXT_BUCKET_ID, id + 1)?;
            id
        };

        {
            let mut buckets = tables.buckets.borrow_mut();
            buckets.insert(slot.as_slice(), (id, 0u64))?;
        }
        tracing::debug!(parent, id, "created bucket");

        Ok(Bucket::new(self, id, slot))
    }

    pub(crate) fn remove_child(
        &self,
        parent: u64,
        name: &[u8],
        removal: BucketRemoval,
    ) -> Result<()> {
        let tables = self.write_tables()?;

        let Some(child) = self.child(parent, name)? else {
            if parent != ROOT_ID && !name.is_empty() && self.entry(parent, name)?.is_some() {
                return Err(Error::IncompatibleValue);
            }
            return Err(Error::BucketNotFound);
        };

        if self.has_children(child.id())? {
            return Err(Error::BucketHasChildren);
        }
        if removal == BucketRemoval::Empty && self.has_entries(child.id())? {
            return Err(Error::BucketNotEmpty);
        }

        let keys = self.physical_keys(child.id())?;

        {
            let mut entries = tables.entries.borrow_mut();
            for key in &keys {
                entries.remove(key.as_slice())?;
            }
        }
        {
            let mut buckets = tables.buckets.borrow_mut();
            buckets.remove(child.slot())?;
        }
        tracing::debug!(parent, id = child.id(), values = keys.len(), "removed bucket");

        Ok(())
    }

    /// Names and ids of the buckets directly below `parent`, in name order.
    pub(crate) fn children(&self, parent: u64) -> Result<Vec<(Vec<u8>, u64)>> {
        match &self.tables {
            Tables::Read { buckets, .. } => list_children(buckets, parent),
            Tables::Write(tables) => list_children(&*tables.buckets.borrow(), parent),
        }
    }

    pub(crate) fn child_count(&self, parent: u64) -> Result<usize> {
        match &self.tables {
            Tables::Read { buckets, .. } => count_owned(buckets, parent, None),
            Tables::Write(tables) => count_owned(&*tables.buckets.borrow(), parent, None),
        }
    }

    fn has_children(&self, parent: u64) -> Result<bool> {
        let found = match &self.tables {
            Tables::Read { buckets, .. } => count_owned(buckets, parent, Some(1))?,
            Tables::Write(tables) => count_owned(&*tables.buckets.borrow(), parent, Some(1))?,
        };
        Ok(found > 0)
    }

    pub(crate) fn next_sequence(&self, slot: &[u8]) -> Result<u64> {
        let tables = self.write_tables()?;
        let mut buckets = tables.buckets.borrow_mut();
        let (id, sequence) = buckets
            .get(slot)?
            .map(|guard| guard.value())
            .ok_or(Error::BucketNotFound)?;
        let next = sequence + 1;
        buckets.insert(slot, (id, next))?;
        Ok(next)
    }

    pub(crate) fn sequence(&self, slot: &[u8]) -> Result<u64> {
        self.bucket_record(slot)?
            .map(|(_, sequence)| sequence)
            .ok_or(Error::BucketNotFound)
    }

    // === Entries ===

    pub(crate) fn entry(&self, owner: u64, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let physical = encode_key(owner, key);
        match &self.tables {
            Tables::Read { entries, .. } => read_entry(entries, &physical),
            Tables::Write(tables) => read_entry(&*tables.entries.borrow(), &physical),
        }
    }

    pub(crate) fn put_entry(&self, owner: u64, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::KeyRequired);
        }
        let tables = self.write_tables()?;
        if self.child(owner, key)?.is_some() {
            return Err(Error::IncompatibleValue);
        }

        let physical = encode_key(owner, key);
        let mut entries = tables.entries.borrow_mut();
        entries.insert(physical.as_slice(), value)?;
        Ok(())
    }

    pub(crate) fn delete_entry(&self, owner: u64, key: &[u8]) -> Result<()> {
        let tables = self.write_tables()?;
        if self.child(owner, key)?.is_some() {
            return Err(Error::IncompatibleValue);
        }

        let physical = encode_key(owner, key);
        let mut entries = tables.entries.borrow_mut();
        entries.remove(physical.as_slice())?;
        Ok(())
    }

    pub(crate) fn entry_count(&self, owner: u64) -> Result<usize> {
        match &self.tables {
            Tables::Read { entries, .. } => count_owned(entries, owner, None),
            Tables::Write(tables) => count_owned(&*tables.entries.borrow(), owner, None),
        }
    }

    fn has_entries(&self, owner: u64) -> Result<bool> {
        let found = match &self.tables {
            Tables::Read { entries, .. } => count_owned(entries, owner, Some(1))?,
            Tables::Write(tables) => count_owned(&*tables.entries.borrow(), owner, Some(1))?,
        };
        Ok(found > 0)
    }

    fn physical_keys(&self, owner: u64) -> Result<Vec<Vec<u8>>> {
        match &self.tables {
            Tables::Read { entries, .. } => list_physical_keys(entries, owner),
            Tables::Write(tables) => list_physical_keys(&*tables.entries.borrow(), owner),
        }
    }

    /// The entry nearest to the edge of `(lower, upper)`: the smallest key
    /// when walking forward, the largest when walking backward.
    pub(crate) fn entry_step(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        backward: bool,
    ) -> Result<Option<Pair>> {
        match &self.tables {
            Tables::Read { entries, .. } => step_entries(entries, lower, upper, backward),
            Tables::Write(tables) => {
                step_entries(&*tables.entries.borrow(), lower, upper, backward)
            }
        }
    }
}

fn read_bucket_record<T>(table: &T, slot: &[u8]) -> Result<Option<(u64, u64)>>
where
    T: ReadableTable<&'static [u8], (u64, u64)>,
{
    Ok(table.get(slot)?.map(|guard| guard.value()))
}

fn list_children<T>(table: &T, parent: u64) -> Result<Vec<(Vec<u8>, u64)>>
where
    T: ReadableTable<&'static [u8], (u64, u64)>,
{
    let range = OwnerRange::new(parent);
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (range.lower(), range.upper());

    let mut children = Vec::new();
    for item in table.range::<&[u8]>(bounds)? {
        let (slot, record) = item?;
        let (id, _) = record.value();
        children.push((decode_key(slot.value()).to_vec(), id));
    }
    Ok(children)
}

/// Number of rows owned by `owner`, stopping early at `cap` when given.
fn count_owned<T, V>(table: &T, owner: u64, cap: Option<usize>) -> Result<usize>
where
    T: ReadableTable<&'static [u8], V>,
    V: Value + 'static,
{
    let range = OwnerRange::new(owner);
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (range.lower(), range.upper());

    let mut count = 0;
    for item in table.range::<&[u8]>(bounds)? {
        item?;
        count += 1;
        if cap.is_some_and(|cap| count >= cap) {
            break;
        }
    }
    Ok(count)
}

fn read_entry<T>(table: &T, physical: &[u8]) -> Result<Option<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    Ok(table.get(physical)?.map(|guard| guard.value().to_vec()))
}

fn list_physical_keys<T>(table: &T, owner: u64) -> Result<Vec<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let range = OwnerRange::new(owner);
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (range.lower(), range.upper());

    let mut keys = Vec::new();
    for item in table.range::<&[u8]>(bounds)? {
        let (key, _) = item?;
        keys.push(key.value().to_vec());
    }
    Ok(keys)
}

fn step_entries<T>(
    table: &T,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    backward: bool,
) -> Result<Option<Pair>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (lower, upper);
    let mut range = table.range::<&[u8]>(bounds)?;
    let item = if backward {
        range.next_back()
    } else {
        range.next()
    };

    match item {
        Some(item) => {
            let (key, value) = item?;
            Ok(Some((
                decode_key(key.value()).to_vec(),
                value.value().to_vec(),
            )))
        }
        None => Ok(None),
    }
}
