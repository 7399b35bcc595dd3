//! Physical table layout.
//!
//! The whole bucket tree lives in two redb tables:
//!
//! - `BUCKETS`: `parent id (u64 BE) ++ name` -> `(bucket id, sequence)`
//! - `ENTRIES`: `bucket id (u64 BE) ++ key` -> `value`
//!
//! Prefixing by owner id keeps every bucket's entries contiguous and in
//! bytewise key order, so a bucket scan is a single range. Id 0 is the top
//! level, which only ever holds buckets. `META` tracks the next free id.

use std::ops::Bound;

use redb::TableDefinition;

pub(crate) const BUCKETS: TableDefinition<&[u8], (u64, u64)> =
    TableDefinition::new("shelf_buckets");
pub(crate) const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("shelf_entries");
pub(crate) const META: TableDefinition<&str, u64> = TableDefinition::new("shelf_meta");

pub(crate) const ROOT_ID: u64 = 0;
pub(crate) const FIRST_BUCKET_ID: u64 = 1;
pub(crate) const NEXT_BUCKET_ID: &str = "next_bucket_id";

const OWNER_LEN: usize = 8;

/// Prefix `key` with its owner id.
pub(crate) fn encode_key(owner: u64, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(OWNER_LEN + key.len());
    out.extend_from_slice(&owner.to_be_bytes());
    out.extend_from_slice(key);
    out
}

/// Strip the owner prefix from a physical key.
pub(crate) fn decode_key(physical: &[u8]) -> &[u8] {
    physical.get(OWNER_LEN..).unwrap_or_default()
}

/// The physical key range covering everything owned by `owner`.
pub(crate) struct OwnerRange {
    lower: [u8; OWNER_LEN],
    upper: Option<[u8; OWNER_LEN]>,
}

impl OwnerRange {
    pub(crate) fn new(owner: u64) -> Self {
        Self {
            lower: owner.to_be_bytes(),
            upper: owner.checked_add(1).map(u64::to_be_bytes),
        }
    }

    pub(crate) fn lower(&self) -> Bound<&[u8]> {
        Bound::Included(&self.lower[..])
    }

    pub(crate) fn upper(&self) -> Bound<&[u8]> {
        match &self.upper {
            Some(upper) => Bound::Excluded(&upper[..]),
            None => Bound::Unbounded,
        }
    }
}
