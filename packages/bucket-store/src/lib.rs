//! Shelf bucket store: nested buckets of ordered key/value entries.
//!
//! This is the bottom layer of the shelf stack. Everything here is bytes:
//! bucket names, keys and values are opaque, and ordering is bytewise. The
//! record mapper builds on top of it.
//!
//! A store is a tree of named buckets. Each bucket holds ordered entries and
//! may hold child buckets, has its own sequence counter for minting ids, and
//! can be walked with a [`Cursor`]. All access happens inside a transaction:
//! [`Store::view`] for snapshot reads, [`Store::update`] for writes. The
//! engine underneath is [redb](https://docs.rs/redb), so readers never block
//! the single writer and a failed write leaves no trace.
//!
//! # Example
//!
//! ```rust
//! use shelf_bucket_store::{BucketRemoval, Error, Store};
//!
//! let store = Store::in_memory().unwrap();
//!
//! let id = store
//!     .update(|tx| {
//!         let users = tx.create_bucket_if_not_exists(b"users")?;
//!         let id = users.next_sequence()?;
//!         users.put(id.to_string().as_bytes(), b"{\"name\":\"Alice\"}")?;
//!         Ok::<_, Error>(id)
//!     })
//!     .unwrap();
//! assert_eq!(id, 1);
//!
//! store
//!     .update(|tx| tx.delete_bucket(b"users", BucketRemoval::Leaf))
//!     .unwrap();
//! ```

mod bucket;
mod cursor;
mod error;
mod store;
mod tables;
mod tx;

pub use bucket::{Bucket, BucketRemoval, BucketStats};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use store::{Store, StoreOptions};
pub use tx::{Pair, Tx};
