//! The modifiers of one stat node, seen through two views.

use crate::collections::events::{CollectionChange, CollectionId, EventBuffer, SubscriptionId};
use crate::collections::node_collection::{CalculationNode, NodeChange, NodeCollection};
use crate::modifier::Modifier;
use serde::{Deserialize, Serialize};

/// Which view of a [`ModifierNodeCollection`] to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionView {
    /// Notifies every change as it happens.
    Default,
    /// Notifies through the [`EventBuffer`]; changes made while it is
    /// suspended arrive as one refresh.
    Suspendable,
}

/// Modifiers of one stat node with a live and a suspendable view.
///
/// Both views always hold the same pairs. Only the notifications of the
/// suspendable view depend on the buffer.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use zzmod::collections::{CalculationNode, CollectionId, EventBuffer, ModifierNodeCollection};
/// use zzmod::formula::Constant;
/// use zzmod::game::Entity;
/// use zzmod::source::ModifierSource;
/// use zzmod::stat::Stat;
/// use zzmod::{Form, Modifier};
///
/// let value = Arc::new(Constant::new(10.0));
/// let modifier = Modifier::new(
///     Stat::new("Life", Entity::Character),
///     Form::BaseAdd,
///     value.clone(),
///     ModifierSource::Global,
/// );
/// let node = CalculationNode::new(value);
///
/// let mut buffer = EventBuffer::new();
/// let mut collection = ModifierNodeCollection::new(CollectionId(0));
/// collection.add(node.clone(), modifier.clone(), &mut buffer);
/// assert_eq!(collection.len(), 1);
///
/// collection.remove(&node, &modifier, &mut buffer);
/// assert!(collection.is_empty());
/// ```
#[derive(Debug)]
pub struct ModifierNodeCollection {
    default_view: NodeCollection<Modifier>,
    suspendable_view: NodeCollection<Modifier>,
}

impl ModifierNodeCollection {
    pub fn new(id: CollectionId) -> Self {
        Self {
            default_view: NodeCollection::new(id),
            suspendable_view: NodeCollection::new(id),
        }
    }

    pub fn id(&self) -> CollectionId {
        self.suspendable_view.id()
    }

    /// Both views are updated before either one notifies.
    pub fn add(&mut self, node: CalculationNode, modifier: Modifier, buffer: &mut EventBuffer) {
        let added = self.default_view.insert(node.clone(), modifier.clone());
        self.suspendable_view.insert(node.clone(), modifier.clone());
        if added {
            let change = CollectionChange::Added((node, modifier));
            self.default_view.publish(&change);
            self.notify(change, buffer);
        }
    }

    pub fn remove(&mut self, node: &CalculationNode, modifier: &Modifier, buffer: &mut EventBuffer) {
        let removed = self.default_view.delete(node, modifier);
        self.suspendable_view.delete(node, modifier);
        if removed {
            let change = CollectionChange::Removed((node.clone(), modifier.clone()));
            self.default_view.publish(&change);
            self.notify(change, buffer);
        }
    }

    fn notify(&mut self, change: NodeChange<Modifier>, buffer: &mut EventBuffer) {
        if !buffer.record(self.id()) {
            self.suspendable_view.publish(&change);
        }
    }

    /// Raise the refresh owed after a suspension.
    pub fn flush(&mut self) {
        self.suspendable_view.publish(&CollectionChange::Refresh);
    }

    pub fn default_view(&self) -> &NodeCollection<Modifier> {
        &self.default_view
    }

    pub fn suspendable_view(&self) -> &NodeCollection<Modifier> {
        &self.suspendable_view
    }

    pub fn subscribe(
        &mut self,
        view: CollectionView,
        handler: impl FnMut(&NodeChange<Modifier>) + Send + 'static,
    ) -> SubscriptionId {
        match view {
            CollectionView::Default => self.default_view.subscribe(handler),
            CollectionView::Suspendable => self.suspendable_view.subscribe(handler),
        }
    }

    pub fn unsubscribe(&mut self, view: CollectionView, id: SubscriptionId) -> bool {
        match view {
            CollectionView::Default => self.default_view.unsubscribe(id),
            CollectionView::Suspendable => self.suspendable_view.unsubscribe(id),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.default_view.subscriber_count() + self.suspendable_view.subscriber_count()
    }

    pub fn contains(&self, node: &CalculationNode, modifier: &Modifier) -> bool {
        self.default_view.contains(node, modifier)
    }

    pub fn len(&self) -> usize {
        self.default_view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.default_view.is_empty()
    }

    pub fn modifiers(&self) -> impl Iterator<Item = &Modifier> {
        self.default_view.items()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Form;
    use crate::formula::{Constant, ValueRef};
    use crate::game::Entity;
    use crate::source::ModifierSource;
    use crate::stat::Stat;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn entry(value: f64) -> (CalculationNode, Modifier) {
        let formula: ValueRef = Arc::new(Constant::new(value));
        let modifier = Modifier::new(
            Stat::new("Life", Entity::Character),
            Form::BaseAdd,
            formula.clone(),
            ModifierSource::Global,
        );
        (CalculationNode::new(formula), modifier)
    }

    fn observe(collection: &mut ModifierNodeCollection, view: CollectionView) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        collection.subscribe(view, move |change| {
            sink.lock().unwrap().push(match change {
                CollectionChange::Added(_) => "added",
                CollectionChange::Removed(_) => "removed",
                CollectionChange::Refresh => "refresh",
            });
        });
        log
    }

    #[test]
    fn test_views_notify_alike_when_active() {
        let mut buffer = EventBuffer::new();
        let mut collection = ModifierNodeCollection::new(CollectionId(1));
        let live = observe(&mut collection, CollectionView::Default);
        let buffered = observe(&mut collection, CollectionView::Suspendable);
        let (node, modifier) = entry(1.0);

        collection.add(node.clone(), modifier.clone(), &mut buffer);
        collection.remove(&node, &modifier, &mut buffer);

        assert_eq!(*live.lock().unwrap(), vec!["added", "removed"]);
        assert_eq!(*buffered.lock().unwrap(), vec!["added", "removed"]);
        assert_eq!(collection.subscriber_count(), 2);
    }

    #[test]
    fn test_suspension_only_silences_suspendable_view() {
        let mut buffer = EventBuffer::new();
        let mut collection = ModifierNodeCollection::new(CollectionId(1));
        let live = observe(&mut collection, CollectionView::Default);
        let buffered = observe(&mut collection, CollectionView::Suspendable);
        let (node, modifier) = entry(1.0);

        buffer.suspend();
        collection.add(node.clone(), modifier.clone(), &mut buffer);
        assert!(collection.suspendable_view().contains(&node, &modifier));
        assert_eq!(*live.lock().unwrap(), vec!["added"]);
        assert!(buffered.lock().unwrap().is_empty());

        assert_eq!(buffer.resume(), vec![CollectionId(1)]);
        collection.flush();
        assert_eq!(*buffered.lock().unwrap(), vec!["refresh"]);
    }

    #[test]
    fn test_views_agree_when_notified() {
        let mut buffer = EventBuffer::new();
        let mut collection = ModifierNodeCollection::new(CollectionId(1));
        let (node, modifier) = entry(1.0);
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        collection.subscribe(CollectionView::Default, move |change| {
            sink.lock().unwrap().push(match change {
                CollectionChange::Added(_) => 1,
                _ => 0,
            });
        });

        collection.add(node.clone(), modifier.clone(), &mut buffer);
        // Both views hold the pair by the time the default view has spoken
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(collection.default_view().len(), 1);
        assert_eq!(collection.suspendable_view().len(), 1);

        collection.remove(&node, &modifier, &mut buffer);
        assert!(collection.default_view().is_empty());
        assert!(collection.suspendable_view().is_empty());
    }

    #[test]
    fn test_unsubscribe_by_view() {
        let mut collection = ModifierNodeCollection::new(CollectionId(1));
        let id = collection.subscribe(CollectionView::Default, |_| {});
        assert!(!collection.unsubscribe(CollectionView::Suspendable, id));
        assert!(collection.unsubscribe(CollectionView::Default, id));
        assert_eq!(collection.subscriber_count(), 0);
    }
}
