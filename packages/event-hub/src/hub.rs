//! The hub: a topic registry in front of a worker pool.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::error::{HubError, Result};
use crate::event::{Event, Handler, Payload, SubscriptionId};

/// Anything events can be published to.
///
/// `publish` must return without waiting for subscribers, and nothing a
/// subscriber does may surface to the publisher.
pub trait Publish: Send + Sync {
    fn publish(&self, topic: &str, payload: Payload);
}

/// Subscribers by topic, shared between the handle and the workers.
#[derive(Default)]
struct Registry {
    topics: RwLock<HashMap<String, Vec<(SubscriptionId, Handler)>>>,
}

impl Registry {
    fn has_subscribers(&self, topic: &str) -> bool {
        self.topics
            .read()
            .get(topic)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    fn dispatch(&self, worker: usize, event: &Event) {
        // Snapshot the handlers so a handler may (un)subscribe without
        // deadlocking on the registry.
        let handlers: Vec<Handler> = match self.topics.read().get(event.name()) {
            Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return,
        };

        tracing::trace!(worker, topic = event.name(), handlers = handlers.len(), "dispatching event");
        for handler in handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::warn!(worker, topic = event.name(), "event handler panicked");
            }
        }
    }
}

struct Inner {
    registry: Arc<Registry>,
    sender: RwLock<Option<mpsc::UnboundedSender<Event>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// A fire-and-forget publish/subscribe hub.
///
/// Published events go onto an unbounded queue drained by a fixed pool of
/// worker threads, which call every handler subscribed to the event's topic.
/// Delivery is at-most-once and best-effort: events published to a topic
/// nobody listens on, or after [`shutdown`](Hub::shutdown), are dropped, and
/// a panicking handler is logged and skipped.
///
/// `Hub` is a cheap handle; clones share the same queue and subscribers.
///
/// # Example
///
/// ```rust
/// use std::sync::{mpsc, Arc};
/// use std::time::Duration;
/// use shelf_event_hub::{Hub, Publish};
///
/// let hub = Hub::start(2).unwrap();
/// let (tx, rx) = mpsc::channel();
/// hub.subscribe("greeting", move |event| {
///     let text = event.payload::<String>().cloned().unwrap_or_default();
///     let _ = tx.send(text);
/// });
///
/// hub.publish("greeting", Arc::new(String::from("hello")));
/// assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "hello");
/// hub.shutdown().unwrap();
/// ```
#[derive(Clone)]
pub struct Hub {
    inner: Arc<Inner>,
}

impl Hub {
    /// Start a hub with `workers` dispatch threads (at least one).
    pub fn start(workers: usize) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel::<Event>();
        let receiver = Arc::new(Mutex::new(receiver));
        let registry = Arc::new(Registry::default());

        let mut handles = Vec::with_capacity(workers.max(1));
        for worker in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let registry = Arc::clone(&registry);
            let handle = thread::Builder::new()
                .name(format!("shelf-events-{worker}"))
                .spawn(move || loop {
                    // Only one worker waits on the queue at a time; the
                    // lock is released before dispatching.
                    let next = receiver.lock().blocking_recv();
                    match next {
                        Some(event) => registry.dispatch(worker, &event),
                        None => break,
                    }
                })?;
            handles.push(handle);
        }

        tracing::debug!(workers = handles.len(), "started event hub");
        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                sender: RwLock::new(Some(sender)),
                workers: Mutex::new(handles),
            }),
        })
    }

    /// Register `handler` for events published on `topic`.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let handler: Handler = Arc::new(handler);
        self.inner
            .registry
            .topics
            .write()
            .entry(topic.into())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut topics = self.inner.registry.topics.write();
        let Some(handlers) = topics.get_mut(topic) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Number of handlers subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .registry
            .topics
            .read()
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Whether the hub still accepts events.
    pub fn is_running(&self) -> bool {
        self.inner.sender.read().is_some()
    }

    /// Stop accepting events and wait for the workers to drain the queue.
    ///
    /// Idempotent. When called from inside a handler, the calling worker is
    /// not joined.
    pub fn shutdown(&self) -> Result<()> {
        self.inner.sender.write().take();

        let handles = std::mem::take(&mut *self.inner.workers.lock());
        let current = thread::current().id();
        let mut outcome = Ok(());
        for (worker, handle) in handles.into_iter().enumerate() {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                outcome = Err(HubError::WorkerPanicked(worker));
            }
        }

        tracing::debug!("event hub stopped");
        outcome
    }
}

impl Publish for Hub {
    fn publish(&self, topic: &str, payload: Payload) {
        if !self.inner.registry.has_subscribers(topic) {
            tracing::trace!(topic, "no subscribers, dropping event");
            return;
        }

        let sender = self.inner.sender.read();
        let Some(sender) = sender.as_ref() else {
            tracing::trace!(topic, "hub stopped, dropping event");
            return;
        };
        if sender.send(Event::new(topic, payload)).is_err() {
            tracing::trace!(topic, "event queue closed, dropping event");
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("running", &self.is_running())
            .field("topics", &self.inner.registry.topics.read().len())
            .finish()
    }
}
