//! Filling caller collections with decoded records.

use std::rc::Rc;
use std::sync::Arc;

use shelf_bucket_store::{Bucket, Pair};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::record::Record;

/// An element type a listing can produce: a record, or a shared pointer
/// to one.
///
/// ```rust,ignore
/// let mut people: Vec<Person> = Vec::new();
/// db.list("people", &mut people)?;
///
/// let mut shared: Vec<Arc<Person>> = Vec::new();
/// db.list("people", &mut shared)?;
/// ```
pub trait Element: Sized {
    type Record: Record;

    fn from_record(record: Self::Record) -> Self;
}

impl<T: Record> Element for T {
    type Record = T;

    fn from_record(record: T) -> Self {
        record
    }
}

impl<T: Record> Element for Arc<T> {
    type Record = T;

    fn from_record(record: T) -> Self {
        Arc::new(record)
    }
}

impl<T: Record> Element for Rc<T> {
    type Record = T;

    fn from_record(record: T) -> Self {
        Rc::new(record)
    }
}

/// Decode one payload into a fresh record. An empty payload yields the
/// default record.
pub(crate) fn decode_element<E: Element, C: Codec>(codec: &C, bytes: &[u8]) -> Result<E> {
    let mut record = E::Record::default();
    codec.decode_into(bytes, &mut record)?;
    Ok(E::from_record(record))
}

/// Append every entry's decoded value to `dest`, in iteration order.
///
/// The first failure stops the fill. Elements appended before it stay in
/// `dest`.
pub(crate) fn fill<E, C, I>(codec: &C, entries: I, dest: &mut Vec<E>) -> Result<()>
where
    E: Element,
    C: Codec,
    I: IntoIterator<Item = Result<Pair>>,
{
    for entry in entries {
        let (_, value) = entry?;
        dest.push(decode_element(codec, &value)?);
    }
    Ok(())
}

/// Append the decoded values stored at `keys`, in the order given.
/// Keys with no stored value are skipped.
pub(crate) fn fill_keys<E, C, K>(
    codec: &C,
    bucket: &Bucket<'_, '_>,
    keys: &[K],
    dest: &mut Vec<E>,
) -> Result<()>
where
    E: Element,
    C: Codec,
    K: AsRef<[u8]>,
{
    for key in keys {
        let Some(value) = bucket
            .get(key.as_ref())
            .map_err(|e| Error::store("read key", e))?
        else {
            continue;
        };
        dest.push(decode_element(codec, &value)?);
    }
    Ok(())
}
