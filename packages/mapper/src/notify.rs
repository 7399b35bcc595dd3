//! Mutation events.

use std::fmt;
use std::sync::Arc;

use shelf_event_hub::Publish;

use crate::record::Record;

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    Created,
    Updated,
    Deleted,
}

impl Mutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::Created => "Created",
            Mutation::Updated => "Updated",
            Mutation::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The topic a mutation of `R` is published on, e.g. `"PersonCreated"`.
///
/// ```rust,ignore
/// assert_eq!(event_name::<Person>(Mutation::Deleted), "PersonDeleted");
/// ```
pub fn event_name<R: Record>(mutation: Mutation) -> String {
    format!("{}{}", R::type_name(), mutation)
}

/// Announces record mutations to a publisher.
///
/// The payload is a copy of the record as saved, as an `R`. Publishing
/// never blocks and never fails.
#[derive(Clone)]
pub(crate) struct Notifier {
    publisher: Arc<dyn Publish>,
}

impl Notifier {
    pub(crate) fn new(publisher: Arc<dyn Publish>) -> Self {
        Self { publisher }
    }

    pub(crate) fn notify<R: Record>(&self, mutation: Mutation, record: &R) {
        let topic = event_name::<R>(mutation);
        tracing::trace!(topic = %topic, id = record.id(), "publishing mutation");
        self.publisher.publish(&topic, Arc::new(record.clone()));
    }
}
