//! The record contract and lifecycle hooks.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Called once, when a record is saved for the first time.
pub trait CreationHook {
    fn on_create(&mut self);
}

/// Called on every save, including the first.
pub trait UpdateHook {
    fn on_update(&mut self);
}

/// A value the mapper can store, identified by a string id.
///
/// An empty id means the record has never been saved; the first
/// [`Db::save`](crate::Db::save) assigns the next id from the bucket's
/// sequence. Once assigned, the mapper never changes an id.
///
/// Hooks are optional capabilities: override [`creation_hook`] and/or
/// [`update_hook`] to hand the mapper something to call. [`CreateTime`]
/// and [`UpdateTime`] are ready-made hook carriers.
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use shelf_mapper::{CreateTime, CreationHook, Record, UpdateHook, UpdateTime};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Note {
///     id: String,
///     text: String,
///     #[serde(flatten)]
///     created: CreateTime,
///     #[serde(flatten)]
///     updated: UpdateTime,
/// }
///
/// impl Record for Note {
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn set_id(&mut self, id: String) {
///         self.id = id;
///     }
///
///     fn creation_hook(&mut self) -> Option<&mut dyn CreationHook> {
///         Some(&mut self.created)
///     }
///
///     fn update_hook(&mut self) -> Option<&mut dyn UpdateHook> {
///         Some(&mut self.updated)
///     }
/// }
///
/// assert_eq!(Note::type_name(), "Note");
/// ```
///
/// [`creation_hook`]: Record::creation_hook
/// [`update_hook`]: Record::update_hook
pub trait Record: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn creation_hook(&mut self) -> Option<&mut dyn CreationHook> {
        None
    }

    fn update_hook(&mut self) -> Option<&mut dyn UpdateHook> {
        None
    }

    /// Short type name used to build event names, e.g. `"Person"`.
    fn type_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Strip module path and generic arguments from a full type name.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Creation timestamp, set when a record is first saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTime {
    pub created: DateTime<Utc>,
}

impl CreationHook for CreateTime {
    fn on_create(&mut self) {
        self.created = Utc::now();
    }
}

/// Modification timestamp, refreshed on every save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTime {
    pub updated: DateTime<Utc>,
}

impl UpdateHook for UpdateTime {
    fn on_update(&mut self) {
        self.updated = Utc::now();
    }
}
