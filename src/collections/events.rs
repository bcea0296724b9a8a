//! Change notifications and their suspension.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// A change to a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionChange<T> {
    Added(T),
    Removed(T),
    /// Anything may have changed; observers should re-read the collection.
    Refresh,
}

impl<T> CollectionChange<T> {
    pub fn is_refresh(&self) -> bool {
        matches!(self, CollectionChange::Refresh)
    }
}

/// Handle returned by [`Subscribers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Box<dyn FnMut(&E) + Send>;

/// A list of event handlers.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use zzmod::collections::Subscribers;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let mut subscribers = Subscribers::new();
/// let sink = seen.clone();
/// let id = subscribers.subscribe(move |e: &u32| sink.lock().unwrap().push(*e));
///
/// subscribers.publish(&7);
/// assert!(subscribers.unsubscribe(id));
/// subscribers.publish(&8);
///
/// assert_eq!(*seen.lock().unwrap(), vec![7]);
/// assert_eq!(subscribers.subscriber_count(), 0);
/// ```
pub struct Subscribers<E> {
    handlers: Vec<(SubscriptionId, Handler<E>)>,
    next_id: u64,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn has_subscribers(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Call every handler in subscription order.
    pub fn publish(&mut self, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.handlers.len())
            .finish()
    }
}

/// Identifies a collection whose notifications go through an [`EventBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(pub u64);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Nested suspension of collection notifications.
///
/// While suspended, collections record that they changed instead of
/// notifying. Resuming the outermost suspension hands back every collection
/// that recorded a change, once, in the order they first changed. Their
/// owner then raises one refresh for each.
///
/// # Examples
///
/// ```rust
/// use zzmod::collections::{CollectionId, EventBuffer};
///
/// let mut buffer = EventBuffer::new();
/// assert!(!buffer.record(CollectionId(1)));
///
/// buffer.suspend();
/// buffer.suspend();
/// assert!(buffer.record(CollectionId(1)));
/// assert!(buffer.record(CollectionId(1)));
/// assert!(buffer.resume().is_empty());
/// assert_eq!(buffer.resume(), vec![CollectionId(1)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    depth: usize,
    pending: Vec<CollectionId>,
    seen: HashSet<CollectionId>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_suspended(&self) -> bool {
        self.depth > 0
    }

    pub fn suspend(&mut self) {
        self.depth += 1;
        debug!(depth = self.depth, "Suspended collection events");
    }

    /// Leave one level of suspension.
    ///
    /// Returns the collections to refresh, which is non-empty only when
    /// the outermost level is left. Resuming while not suspended does
    /// nothing.
    pub fn resume(&mut self) -> Vec<CollectionId> {
        if self.depth == 0 {
            return Vec::new();
        }
        self.depth -= 1;
        if self.depth > 0 {
            debug!(depth = self.depth, "Resumed collection events");
            return Vec::new();
        }
        self.seen.clear();
        let pending = std::mem::take(&mut self.pending);
        debug!(pending = pending.len(), "Flushing collection events");
        pending
    }

    /// Record a change of `collection`.
    ///
    /// Returns `false` when not suspended; the caller notifies right away.
    pub fn record(&mut self, collection: CollectionId) -> bool {
        if self.depth == 0 {
            return false;
        }
        if self.seen.insert(collection) {
            self.pending.push(collection);
        }
        true
    }

    /// Collections with changes recorded in the current suspension.
    pub fn pending(&self) -> &[CollectionId] {
        &self.pending
    }
}
