//! Paginated enumeration of a bucket's entries.

use serde::{Deserialize, Serialize};
use shelf_bucket_store::{Bucket, Cursor, Pair};

use crate::error::{Error, Result};

/// Default page size for listings.
pub const DEFAULT_LIMIT: usize = 1000;

/// Listing window: skip `offset` entries, then return at most `limit`,
/// walking keys in ascending order or, with `reverse`, descending.
///
/// ```rust
/// use shelf_mapper::Params;
///
/// let page = Params::new().offset(20).limit(10).reverse();
/// assert_eq!((page.offset, page.limit, page.reverse), (20, 10, true));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub offset: usize,
    pub limit: usize,
    pub reverse: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
            reverse: false,
        }
    }
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the offset.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the limit.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Walk from the largest key down.
    #[must_use]
    pub const fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Lazily yields the entries of one bucket inside a [`Params`] window.
///
/// Offset and limit count emitted entries, in the direction actually walked.
/// The walk stops as soon as the window is full. With `skip_empty`, entries
/// with an empty value are passed over before the offset is applied.
pub(crate) struct Entries<'a, 'txn> {
    cursor: Cursor<'a, 'txn>,
    params: Params,
    skip_empty: bool,
    skipped: usize,
    emitted: usize,
    started: bool,
    done: bool,
}

impl<'a, 'txn> Entries<'a, 'txn> {
    pub(crate) fn new(bucket: &Bucket<'a, 'txn>, params: Params, skip_empty: bool) -> Self {
        Self {
            cursor: bucket.cursor(),
            params,
            skip_empty,
            skipped: 0,
            emitted: 0,
            started: false,
            done: false,
        }
    }

    fn step(&mut self) -> shelf_bucket_store::Result<Option<Pair>> {
        let reverse = self.params.reverse;
        if !self.started {
            self.started = true;
            return if reverse {
                self.cursor.last()
            } else {
                self.cursor.first()
            };
        }
        if reverse {
            self.cursor.prev()
        } else {
            self.cursor.next()
        }
    }
}

impl Iterator for Entries<'_, '_> {
    type Item = Result<Pair>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.emitted >= self.params.limit {
                return None;
            }

            let (key, value) = match self.step() {
                Ok(Some(pair)) => pair,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(Error::store("read cursor", e)));
                }
            };

            if self.skip_empty && value.is_empty() {
                continue;
            }
            if self.skipped < self.params.offset {
                self.skipped += 1;
                continue;
            }

            self.emitted += 1;
            return Some(Ok((key, value)));
        }
    }
}
