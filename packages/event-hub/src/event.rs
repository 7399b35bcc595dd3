//! Events and subscriptions.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Payload carried by an event. Subscribers downcast it with
/// [`Event::payload`].
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A callback invoked for every event published on its topic.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// A published event: the topic it was published on and its payload.
#[derive(Clone)]
pub struct Event {
    name: String,
    payload: Payload,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// The topic the event was published on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the payload as `T`, or `None` if it has another type.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// The untyped payload.
    pub fn raw_payload(&self) -> &Payload {
        &self.payload
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Identifies one subscription, for [`Hub::unsubscribe`](crate::Hub::unsubscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random SubscriptionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
