//! Shelf: embedded record storage on nested buckets.
//!
//! Records are plain serde types identified by a string id. They live in
//! buckets addressed by slash-separated paths, get ids from a per-bucket
//! sequence when first saved, and announce every create, update and delete
//! on an event hub.
//!
//! This crate re-exports the layers:
//!
//! - [`bucket_store`]: transactional nested buckets of ordered bytes
//! - [`events`]: fire-and-forget topic publish/subscribe
//! - [`validate`]: field validation helpers
//! - [`mapper`]: the record mapper, also re-exported at the crate root
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use shelf::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Book {
//!     id: String,
//!     title: String,
//!     #[serde(flatten)]
//!     created: CreateTime,
//! }
//!
//! impl Record for Book {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn set_id(&mut self, id: String) {
//!         self.id = id;
//!     }
//!
//!     fn creation_hook(&mut self) -> Option<&mut dyn CreationHook> {
//!         Some(&mut self.created)
//!     }
//! }
//!
//! let db = Db::in_memory(Options::default()).unwrap();
//!
//! for title in ["Dune", "Emma", "Ulysses"] {
//!     let mut book = Book { title: title.into(), ..Default::default() };
//!     db.save(path!("library", "books"), &mut book).unwrap();
//! }
//!
//! let mut newest: Vec<Book> = Vec::new();
//! db.list_with("library/books", &mut newest, Params::new().limit(2).reverse())
//!     .unwrap();
//! assert_eq!(newest[0].title, "Ulysses");
//! assert_eq!(db.count("library/books"), 3);
//! ```

pub use shelf_bucket_store as bucket_store;
pub use shelf_event_hub as events;
pub use shelf_mapper as mapper;
pub use shelf_validate as validate;

pub use shelf_mapper::*;

/// The types most programs need.
pub mod prelude {
    pub use shelf_mapper::{
        event_name, path, Codec, CreateTime, CreationHook, Db, Element, Error, JsonCodec,
        Mutation, Options, Params, Path, Record, UpdateHook, UpdateTime,
    };
    pub use shelf_validate::Validator;
}
