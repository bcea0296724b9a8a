//! Counted multisets of calculation nodes.

use crate::collections::events::{CollectionChange, CollectionId, Subscribers, SubscriptionId};
use crate::context::ValueCalculationContext;
use crate::formula::ValueRef;
use crate::value::NodeValue;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A formula node as a collection key.
///
/// Two nodes are the same when they share the formula instance.
#[derive(Clone)]
pub struct CalculationNode(ValueRef);

impl CalculationNode {
    pub fn new(value: ValueRef) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &ValueRef {
        &self.0
    }

    pub fn calculate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue> {
        self.0.calculate(context)
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for CalculationNode {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for CalculationNode {}

impl Hash for CalculationNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for CalculationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalculationNode({})", self.0.label())
    }
}

/// Event raised by a [`NodeCollection`].
pub type NodeChange<T> = CollectionChange<(CalculationNode, T)>;

/// A multiset of `(node, item)` pairs.
///
/// Every pair has a count. Only the transitions 0→1 and 1→0 notify;
/// adding a present pair again or removing one of several copies is
/// silent. Removing an absent pair does nothing.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use zzmod::collections::{CalculationNode, CollectionId, NodeCollection};
/// use zzmod::formula::Constant;
///
/// let node = CalculationNode::new(Arc::new(Constant::new(1.0)));
/// let mut collection = NodeCollection::new(CollectionId(0));
///
/// assert!(collection.add(node.clone(), "life"));
/// assert!(!collection.add(node.clone(), "life"));
/// assert!(!collection.remove(&node, &"life"));
/// assert!(collection.contains(&node, &"life"));
/// assert!(collection.remove(&node, &"life"));
/// assert!(collection.is_empty());
/// ```
pub struct NodeCollection<T> {
    id: CollectionId,
    slots: HashMap<(CalculationNode, T), Slot>,
    /// First-added order; removed pairs leave a hole until compaction.
    order: Vec<Option<(CalculationNode, T)>>,
    live: usize,
    subscribers: Subscribers<NodeChange<T>>,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    count: usize,
    position: usize,
}

impl<T: Clone + Eq + Hash> NodeCollection<T> {
    pub fn new(id: CollectionId) -> Self {
        Self {
            id,
            slots: HashMap::new(),
            order: Vec::new(),
            live: 0,
            subscribers: Subscribers::new(),
        }
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Add one copy and notify if the pair is new.
    ///
    /// Returns whether the pair is new.
    pub fn add(&mut self, node: CalculationNode, item: T) -> bool {
        let added = self.insert(node.clone(), item.clone());
        if added {
            self.subscribers.publish(&CollectionChange::Added((node, item)));
        }
        added
    }

    /// Remove one copy and notify if it was the last one.
    ///
    /// Returns whether the pair is gone now.
    pub fn remove(&mut self, node: &CalculationNode, item: &T) -> bool {
        let removed = self.delete(node, item);
        if removed {
            self.subscribers
                .publish(&CollectionChange::Removed((node.clone(), item.clone())));
        }
        removed
    }

    /// Add one copy without notifying.
    pub(crate) fn insert(&mut self, node: CalculationNode, item: T) -> bool {
        let key = (node, item);
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.count += 1;
            return false;
        }
        let position = self.order.len();
        self.order.push(Some(key.clone()));
        self.slots.insert(key, Slot { count: 1, position });
        self.live += 1;
        true
    }

    /// Remove one copy without notifying.
    pub(crate) fn delete(&mut self, node: &CalculationNode, item: &T) -> bool {
        let key = (node.clone(), item.clone());
        let Some(slot) = self.slots.get_mut(&key) else {
            return false;
        };
        slot.count -= 1;
        if slot.count > 0 {
            return false;
        }
        let position = slot.position;
        self.slots.remove(&key);
        self.order[position] = None;
        self.live -= 1;
        if self.order.len() > 2 * self.live {
            self.compact();
        }
        true
    }

    /// Drop the holes left by removals and renumber the positions.
    fn compact(&mut self) {
        self.order.retain(Option::is_some);
        for (position, key) in self.order.iter().enumerate() {
            if let Some(slot) = key.as_ref().and_then(|key| self.slots.get_mut(key)) {
                slot.position = position;
            }
        }
    }

    pub(crate) fn publish(&mut self, change: &NodeChange<T>) {
        self.subscribers.publish(change);
    }

    pub fn contains(&self, node: &CalculationNode, item: &T) -> bool {
        self.count(node, item) > 0
    }

    /// How many copies of the pair are present.
    pub fn count(&self, node: &CalculationNode, item: &T) -> usize {
        self.slots
            .get(&(node.clone(), item.clone()))
            .map_or(0, |slot| slot.count)
    }

    /// Number of distinct pairs.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Distinct pairs in the order they were first added.
    pub fn iter(&self) -> impl Iterator<Item = (&CalculationNode, &T)> {
        self.order.iter().flatten().map(|(node, item)| (node, item))
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.order.iter().flatten().map(|(_, item)| item)
    }

    pub fn subscribe(
        &mut self,
        handler: impl FnMut(&NodeChange<T>) + Send + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.subscriber_count()
    }
}

impl<T> fmt::Debug for NodeCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCollection")
            .field("id", &self.id)
            .field("len", &self.live)
            .field("subscribers", &self.subscribers)
            .finish()
    }
}
