//! Positional cursors over a bucket's values.

use std::ops::Bound;

use crate::error::Result;
use crate::tables::{encode_key, OwnerRange};
use crate::tx::{Pair, Tx};

/// A cursor walking one bucket's values in bytewise key order.
///
/// The cursor remembers the key it last landed on and re-seeks from there on
/// every step, so it never pins engine iterators between calls. Child
/// buckets are not visited.
///
/// ```rust,ignore
/// let mut cursor = bucket.cursor();
/// let mut entry = cursor.first()?;
/// while let Some((key, value)) = entry {
///     // ...
///     entry = cursor.next()?;
/// }
/// ```
pub struct Cursor<'a, 'txn> {
    tx: &'a Tx<'txn>,
    owner: u64,
    position: Option<Vec<u8>>,
}

impl<'a, 'txn> Cursor<'a, 'txn> {
    pub(crate) fn new(tx: &'a Tx<'txn>, owner: u64) -> Self {
        Self {
            tx,
            owner,
            position: None,
        }
    }

    /// Move to the smallest key.
    pub fn first(&mut self) -> Result<Option<Pair>> {
        let range = OwnerRange::new(self.owner);
        let found = self.tx.entry_step(range.lower(), range.upper(), false)?;
        Ok(self.land(found))
    }

    /// Move to the largest key.
    pub fn last(&mut self) -> Result<Option<Pair>> {
        let range = OwnerRange::new(self.owner);
        let found = self.tx.entry_step(range.lower(), range.upper(), true)?;
        Ok(self.land(found))
    }

    /// Move to the next key. An unpositioned cursor starts at the first key.
    pub fn next(&mut self) -> Result<Option<Pair>> {
        let Some(current) = &self.position else {
            return self.first();
        };
        let range = OwnerRange::new(self.owner);
        let after = encode_key(self.owner, current);
        let found = self
            .tx
            .entry_step(Bound::Excluded(&after[..]), range.upper(), false)?;
        Ok(self.land(found))
    }

    /// Move to the previous key. An unpositioned cursor starts at the last key.
    pub fn prev(&mut self) -> Result<Option<Pair>> {
        let Some(current) = &self.position else {
            return self.last();
        };
        let range = OwnerRange::new(self.owner);
        let before = encode_key(self.owner, current);
        let found = self
            .tx
            .entry_step(range.lower(), Bound::Excluded(&before[..]), true)?;
        Ok(self.land(found))
    }

    /// Move to `key`, or to the next key after it when absent.
    pub fn seek(&mut self, key: &[u8]) -> Result<Option<Pair>> {
        let range = OwnerRange::new(self.owner);
        let from = encode_key(self.owner, key);
        let found = self
            .tx
            .entry_step(Bound::Included(&from[..]), range.upper(), false)?;
        Ok(self.land(found))
    }

    // Running off either end keeps the last position, so repeated steps
    // past the edge keep returning None.
    fn land(&mut self, found: Option<Pair>) -> Option<Pair> {
        if let Some((key, _)) = &found {
            self.position = Some(key.clone());
        }
        found
    }
}
