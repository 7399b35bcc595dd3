//! Shelf event hub: fire-and-forget topic publish/subscribe.
//!
//! The record mapper announces every successful create, update and delete
//! through the [`Publish`] capability. [`Hub`] is the stock implementation:
//! `publish` enqueues and returns at once, and a small pool of worker
//! threads hands each event to the handlers subscribed to its topic.
//!
//! Publishers never wait for, and never hear about, what subscribers do.

mod error;
mod event;
mod hub;

pub use error::{HubError, Result};
pub use event::{Event, Handler, Payload, SubscriptionId};
pub use hub::{Hub, Publish};
