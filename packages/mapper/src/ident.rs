//! Identifier assignment.

use shelf_bucket_store::Bucket;

use crate::error::{Error, Result};
use crate::record::Record;

/// Whether a save created a record or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Assigned {
    New,
    Existing,
}

/// Give `record` an id if it has none and run its lifecycle hooks.
///
/// A new id is the bucket's next sequence value in decimal. It is drawn
/// inside the caller's write transaction, so an aborted save also rolls
/// the sequence back.
pub(crate) fn assign<R: Record>(bucket: &Bucket<'_, '_>, record: &mut R) -> Result<Assigned> {
    if !record.id().is_empty() {
        if let Some(hook) = record.update_hook() {
            hook.on_update();
        }
        return Ok(Assigned::Existing);
    }

    let sequence = bucket
        .next_sequence()
        .map_err(|e| Error::store("next sequence", e))?;
    record.set_id(sequence.to_string());

    if let Some(hook) = record.creation_hook() {
        hook.on_create();
    }
    if let Some(hook) = record.update_hook() {
        hook.on_update();
    }
    Ok(Assigned::New)
}
