//! Shelf mapper: typed records over nested buckets.
//!
//! The mapper stores serializable records in a [bucket
//! store](shelf_bucket_store), addressed by a [`Path`] of nested bucket
//! names and a string id. It assigns ids from each bucket's sequence, runs
//! creation and update hooks, pages through buckets in key order, and
//! announces every create, update and delete on an [event
//! hub](shelf_event_hub).
//!
//! ## Layers
//!
//! - `shelf-bucket-store`: nested buckets of ordered bytes, transactions
//! - `shelf-event-hub`: fire-and-forget topic delivery
//! - `shelf-mapper` (this crate): paths, codecs, records, pagination, the
//!   [`Db`] façade
//!
//! ## Paths
//!
//! Anything that converts into a [`Path`] names a bucket: `"users"`,
//! `"tenants/acme/users"`, `["tenants", "acme", "users"]` or
//! `path!("tenants", "acme", "users")`. Empty components are dropped, and a
//! path with no components is rejected with [`Error::EmptyPath`].
//!
//! ## Events
//!
//! A successful save publishes `<Type>Created` or `<Type>Updated`, and a
//! delete publishes `<Type>Deleted`, each with an `R` as payload:
//!
//! ```rust
//! use std::sync::mpsc;
//! use std::time::Duration;
//!
//! use serde::{Deserialize, Serialize};
//! use shelf_mapper::{event_name, Db, Mutation, Options, Record};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Task {
//!     id: String,
//!     title: String,
//! }
//!
//! impl Record for Task {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn set_id(&mut self, id: String) {
//!         self.id = id;
//!     }
//! }
//!
//! let db = Db::in_memory(Options::default()).unwrap();
//!
//! let (tx, rx) = mpsc::channel();
//! db.events().subscribe(&event_name::<Task>(Mutation::Created), move |event| {
//!     if let Some(task) = event.payload::<Task>() {
//!         let _ = tx.send(task.title.clone());
//!     }
//! });
//!
//! let mut task = Task { title: "write docs".into(), ..Default::default() };
//! db.save("tasks", &mut task).unwrap();
//!
//! let title = rx.recv_timeout(Duration::from_secs(5)).unwrap();
//! assert_eq!(title, "write docs");
//! ```

mod codec;
mod collect;
mod cursor;
mod db;
mod error;
mod format;
mod ident;
mod instrument;
mod notify;
mod options;
mod path;
mod record;
mod resolve;

pub use codec::{Codec, JsonCodec};
pub use collect::Element;
pub use cursor::{Params, DEFAULT_LIMIT};
pub use db::Db;
pub use error::{Error, Result};
pub use format::Format;
pub use instrument::OPS_TARGET;
pub use notify::{event_name, Mutation};
pub use options::Options;
pub use path::{Path, PathError};
pub use record::{CreateTime, CreationHook, Record, UpdateHook, UpdateTime};

pub use bytes::Bytes;
pub use shelf_bucket_store::{BucketRemoval, StoreOptions};
pub use shelf_event_hub::{Event, Hub, Publish, SubscriptionId};
