//! The stat dependency graph.
//!
//! Registered modifiers are grouped by the stat node they feed: one
//! [`ModifierNodeCollection`] per stat, form and path. Observers subscribe
//! to these collections. Bulk changes are wrapped in
//! [`StatDependencyGraph::suspend_events`] and
//! [`StatDependencyGraph::resume_events`] so observers of the suspendable
//! views see one refresh per changed collection instead of every change.
//!
//! Mutation takes `&mut self`; the graph owns its collections and its
//! [`EventBuffer`], so there is exactly one writer.

use crate::collections::{
    CalculationNode, CollectionId, CollectionView, EventBuffer, ModifierNodeCollection, NodeChange,
    SubscriptionId,
};
use crate::context::ValueCalculationContext;
use crate::error::CompileError;
use crate::form::Form;
use crate::graph::DependencyGraph;
use crate::modifier::Modifier;
use crate::path::{NodeType, PathDefinition};
use crate::stat::Stat;
use crate::stat_id::StatId;
use crate::value::{product, sum, NodeValue};
use std::collections::HashMap;
use tracing::debug;

/// Key of one modifier collection.
pub type NodeKey = (Stat, Form, PathDefinition);

/// Registered modifiers, grouped per stat node.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use zzmod::dependency::StatDependencyGraph;
/// use zzmod::formula::Constant;
/// use zzmod::game::Entity;
/// use zzmod::path::{NodeType, PathDefinition};
/// use zzmod::source::ModifierSource;
/// use zzmod::stat::Stat;
/// use zzmod::{Form, Modifier, NodeValue};
///
/// let life = Stat::new("Life", Entity::Character);
/// let mut graph = StatDependencyGraph::new();
/// graph.register(Modifier::new(life.clone(), Form::BaseAdd, Arc::new(Constant::new(50.0)), ModifierSource::Global));
/// graph.register(Modifier::new(life.clone(), Form::Increase, Arc::new(Constant::new(20.0)), ModifierSource::Global));
///
/// let total = graph.value(&life, NodeType::Total, &PathDefinition::MainPath).unwrap();
/// assert_eq!(total, Some(NodeValue::from(60.0)));
/// ```
#[derive(Debug, Default)]
pub struct StatDependencyGraph {
    collections: HashMap<NodeKey, ModifierNodeCollection>,
    keys: HashMap<CollectionId, NodeKey>,
    next_id: u64,
    buffer: EventBuffer,
}

impl StatDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection_mut(&mut self, key: NodeKey) -> &mut ModifierNodeCollection {
        Self::collection_entry(&mut self.collections, &mut self.keys, &mut self.next_id, key)
    }

    fn collection_entry<'a>(
        collections: &'a mut HashMap<NodeKey, ModifierNodeCollection>,
        keys: &mut HashMap<CollectionId, NodeKey>,
        next_id: &mut u64,
        key: NodeKey,
    ) -> &'a mut ModifierNodeCollection {
        collections.entry(key.clone()).or_insert_with(|| {
            let id = CollectionId(*next_id);
            *next_id += 1;
            keys.insert(id, key);
            ModifierNodeCollection::new(id)
        })
    }

    /// Register `modifier` on the main path.
    pub fn register(&mut self, modifier: Modifier) {
        self.register_on(PathDefinition::MainPath, modifier);
    }

    /// Register `modifier` on `path`.
    ///
    /// Registering the same modifier twice needs two deregistrations to
    /// remove it.
    pub fn register_on(&mut self, path: PathDefinition, modifier: Modifier) {
        debug!(modifier = %modifier, path = %path, "Registering modifier");
        let key = (modifier.stat.clone(), modifier.form, path);
        let node = CalculationNode::new(modifier.value.clone());
        let collection =
            Self::collection_entry(&mut self.collections, &mut self.keys, &mut self.next_id, key);
        collection.add(node, modifier, &mut self.buffer);
    }

    /// Register every modifier under one suspension.
    pub fn register_all(&mut self, modifiers: impl IntoIterator<Item = Modifier>) {
        self.suspend_events();
        for modifier in modifiers {
            self.register(modifier);
        }
        self.resume_events();
    }

    pub fn deregister(&mut self, modifier: &Modifier) -> bool {
        self.deregister_from(&PathDefinition::MainPath, modifier)
    }

    /// Remove one registration of `modifier` from `path`.
    ///
    /// Returns `false` if it wasn't registered there. A node left without
    /// modifiers and observers is dropped.
    pub fn deregister_from(&mut self, path: &PathDefinition, modifier: &Modifier) -> bool {
        let key = (modifier.stat.clone(), modifier.form, path.clone());
        let node = CalculationNode::new(modifier.value.clone());
        let Some(collection) = self.collections.get_mut(&key) else {
            return false;
        };
        if !collection.contains(&node, modifier) {
            return false;
        }
        debug!(modifier = %modifier, path = %path, "Deregistering modifier");
        collection.remove(&node, modifier, &mut self.buffer);
        self.prune(&key);
        true
    }

    fn prune(&mut self, key: &NodeKey) {
        let Some(collection) = self.collections.get(key) else {
            return;
        };
        if collection.is_empty() && collection.subscriber_count() == 0 {
            let id = collection.id();
            self.collections.remove(key);
            self.keys.remove(&id);
        }
    }

    /// Deregister every modifier under one suspension.
    pub fn deregister_all<'a>(&mut self, modifiers: impl IntoIterator<Item = &'a Modifier>) {
        self.suspend_events();
        for modifier in modifiers {
            self.deregister(modifier);
        }
        self.resume_events();
    }

    pub fn suspend_events(&mut self) {
        self.buffer.suspend();
    }

    /// Leave one suspension level and, at the outermost one, refresh every
    /// collection that changed while suspended.
    pub fn resume_events(&mut self) {
        for id in self.buffer.resume() {
            let Some(key) = self.keys.get(&id) else {
                continue;
            };
            if let Some(collection) = self.collections.get_mut(key) {
                debug!(stat = %key.0, form = %key.1, "Refreshing modifier collection");
                collection.flush();
            }
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.buffer.is_suspended()
    }

    /// Observe the modifiers of a stat node.
    ///
    /// The collection is created if nothing was registered on it yet.
    pub fn subscribe(
        &mut self,
        stat: &Stat,
        form: Form,
        path: &PathDefinition,
        view: CollectionView,
        handler: impl FnMut(&NodeChange<Modifier>) + Send + 'static,
    ) -> SubscriptionId {
        self.collection_mut((stat.clone(), form, path.clone()))
            .subscribe(view, handler)
    }

    pub fn unsubscribe(
        &mut self,
        stat: &Stat,
        form: Form,
        path: &PathDefinition,
        view: CollectionView,
        id: SubscriptionId,
    ) -> bool {
        let key = (stat.clone(), form, path.clone());
        let removed = self
            .collections
            .get_mut(&key)
            .is_some_and(|collection| collection.unsubscribe(view, id));
        self.prune(&key);
        removed
    }

    pub fn collection(
        &self,
        stat: &Stat,
        form: Form,
        path: &PathDefinition,
    ) -> Option<&ModifierNodeCollection> {
        self.collections.get(&(stat.clone(), form, path.clone()))
    }

    /// Modifiers registered on a stat node, in registration order.
    pub fn modifiers(&self, stat: &Stat, form: Form, path: &PathDefinition) -> Vec<&Modifier> {
        self.collection(stat, form, path)
            .map(|collection| collection.modifiers().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, modifier: &Modifier) -> bool {
        self.collections.iter().any(|((stat, form, _), collection)| {
            *stat == modifier.stat
                && *form == modifier.form
                && collection.contains(&CalculationNode::new(modifier.value.clone()), modifier)
        })
    }

    /// Number of distinct registered modifiers over all paths.
    pub fn len(&self) -> usize {
        self.collections.values().map(ModifierNodeCollection::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Which stats the registered formulas read, per stat.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for ((stat, _, _), collection) in &self.collections {
            let own = node_id(stat);
            graph.add_node(own.clone());
            for modifier in collection.modifiers() {
                for dependency in modifier.dependencies() {
                    graph.add_edge(own.clone(), node_id(&dependency));
                }
            }
        }
        graph
    }

    /// Context reading the registered modifiers.
    ///
    /// It does not check for cycles; a formula reading its own stat
    /// recurses without end. Use [`StatDependencyGraph::value`] unless the
    /// graph was checked.
    pub fn context(&self) -> GraphContext<'_> {
        GraphContext { graph: self }
    }

    /// Evaluate one node of `stat`, after checking that nothing it depends
    /// on depends on it.
    pub fn value(
        &self,
        stat: &Stat,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> Result<Option<NodeValue>, CompileError> {
        self.dependency_graph()
            .subgraph_for_targets(&[node_id(stat)])
            .detect_cycles()?;
        Ok(self.context().get_value(stat, node_type, path))
    }
}

fn node_id(stat: &Stat) -> StatId {
    StatId::from(stat.to_string())
}

/// Evaluation context over a [`StatDependencyGraph`].
///
/// Node values aggregate the registered modifiers:
/// the base is the base override if present, else set plus added;
/// the total is the total override if present, else
/// `base * (1 + increase / 100) * more`, where `more` multiplies
/// `1 + m / 100` over every more modifier.
#[derive(Debug, Clone, Copy)]
pub struct GraphContext<'a> {
    graph: &'a StatDependencyGraph,
}

impl GraphContext<'_> {
    fn form_values(&self, stat: &Stat, form: Form, path: &PathDefinition) -> Vec<Option<NodeValue>> {
        self.graph
            .modifiers(stat, form, path)
            .into_iter()
            .map(|modifier| modifier.evaluate(self))
            .collect()
    }

    fn base(&self, stat: &Stat, path: &PathDefinition) -> Option<NodeValue> {
        if let Some(value) = sum(self.form_values(stat, Form::BaseOverride, path)) {
            return Some(value);
        }
        let set = sum(self.form_values(stat, Form::BaseSet, path));
        let added = sum(self.form_values(stat, Form::BaseAdd, path));
        match (set, added) {
            (None, None) => None,
            (set, added) => Some(set.unwrap_or(NodeValue::new(0.0)) + added.unwrap_or(NodeValue::new(0.0))),
        }
    }

    fn more(&self, stat: &Stat, path: &PathDefinition) -> Option<NodeValue> {
        product(
            self.form_values(stat, Form::More, path)
                .into_iter()
                .map(|value| value.map(|v| v.select(|m| 1.0 + m / 100.0))),
        )
    }

    fn subtotal(&self, stat: &Stat, path: &PathDefinition) -> Option<NodeValue> {
        let base = self.base(stat, path)?;
        let increase = sum(self.form_values(stat, Form::Increase, path))
            .map_or(NodeValue::new(1.0), |v| v.select(|i| 1.0 + i / 100.0));
        let more = self.more(stat, path).unwrap_or(NodeValue::new(1.0));
        Some(base * increase * more)
    }
}

impl ValueCalculationContext for GraphContext<'_> {
    fn get_value(
        &self,
        stat: &Stat,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> Option<NodeValue> {
        match node_type {
            NodeType::Total => sum(self.form_values(stat, Form::TotalOverride, path))
                .or_else(|| self.subtotal(stat, path)),
            NodeType::Subtotal | NodeType::UncappedSubtotal => self.subtotal(stat, path),
            NodeType::TotalOverride => sum(self.form_values(stat, Form::TotalOverride, path)),
            NodeType::Base => self.base(stat, path),
            NodeType::BaseOverride => sum(self.form_values(stat, Form::BaseOverride, path)),
            NodeType::BaseSet => sum(self.form_values(stat, Form::BaseSet, path)),
            NodeType::BaseAdd => sum(self.form_values(stat, Form::BaseAdd, path)),
            NodeType::Increase => sum(self.form_values(stat, Form::Increase, path)),
            NodeType::More => self.more(stat, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::CollectionChange;
    use crate::formula::{Constant, StatValue, ValueRef};
    use crate::game::Entity;
    use crate::source::ModifierSource;
    use std::sync::{Arc, Mutex};

    fn stat(name: &str) -> Stat {
        Stat::new(name, Entity::Character)
    }

    fn modifier(stat: &Stat, form: Form, value: f64) -> Modifier {
        Modifier::new(
            stat.clone(),
            form,
            Arc::new(Constant::new(value)),
            ModifierSource::Global,
        )
    }

    fn total(graph: &StatDependencyGraph, stat: &Stat) -> Option<NodeValue> {
        graph
            .value(stat, NodeType::Total, &PathDefinition::MainPath)
            .unwrap()
    }

    fn observe(graph: &mut StatDependencyGraph, stat: &Stat, view: CollectionView) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        graph.subscribe(stat, Form::BaseAdd, &PathDefinition::MainPath, view, move |change| {
            sink.lock().unwrap().push(match change {
                CollectionChange::Added((_, m)) => format!("+{}", m.value.label()),
                CollectionChange::Removed((_, m)) => format!("-{}", m.value.label()),
                CollectionChange::Refresh => "refresh".to_string(),
            });
        });
        log
    }

    #[test]
    fn test_total_combines_forms() {
        let life = stat("Life");
        let mut graph = StatDependencyGraph::new();
        graph.register_all([
            modifier(&life, Form::BaseSet, 10.0),
            modifier(&life, Form::BaseAdd, 90.0),
            modifier(&life, Form::Increase, 30.0),
            modifier(&life, Form::Increase, 20.0),
            modifier(&life, Form::More, 10.0),
            modifier(&life, Form::More, 100.0),
        ]);
        // 100 * 1.5 * 1.1 * 2
        assert_eq!(total(&graph, &life), Some(NodeValue::from(330.0)));
        assert_eq!(
            graph.context().get_value(&life, NodeType::More, &PathDefinition::MainPath),
            Some(NodeValue::from(2.2))
        );
    }

    #[test]
    fn test_ranged_increase_keeps_both_bounds() {
        let life = stat("Life");
        let mut graph = StatDependencyGraph::new();
        graph.register_all([
            modifier(&life, Form::BaseAdd, 100.0),
            Modifier::new(
                life.clone(),
                Form::Increase,
                Arc::new(Constant::new(NodeValue::range(0.0, 100.0))),
                ModifierSource::Global,
            ),
        ]);
        assert_eq!(total(&graph, &life), Some(NodeValue::range(100.0, 200.0)));
        assert_eq!(
            graph.context().get_value(&life, NodeType::Subtotal, &PathDefinition::MainPath),
            Some(NodeValue::range(100.0, 200.0))
        );
    }

    #[test]
    fn test_overrides_win() {
        let life = stat("Life");
        let mut graph = StatDependencyGraph::new();
        graph.register(modifier(&life, Form::BaseAdd, 90.0));
        graph.register(modifier(&life, Form::BaseOverride, 1.0));
        graph.register(modifier(&life, Form::Increase, 100.0));
        assert_eq!(total(&graph, &life), Some(NodeValue::from(2.0)));

        graph.register(modifier(&life, Form::TotalOverride, 7.0));
        assert_eq!(total(&graph, &life), Some(NodeValue::from(7.0)));
    }

    #[test]
    fn test_unknown_stat_is_absent() {
        let graph = StatDependencyGraph::new();
        assert_eq!(total(&graph, &stat("Life")), None);
    }

    #[test]
    fn test_formulas_read_other_stats() {
        let strength = stat("Strength");
        let life = stat("Life");
        let per_strength: ValueRef = Arc::new(StatValue::total(strength.clone()));
        let mut graph = StatDependencyGraph::new();
        graph.register(modifier(&strength, Form::BaseAdd, 20.0));
        graph.register(Modifier::new(life.clone(), Form::BaseAdd, per_strength, ModifierSource::Global));

        assert_eq!(total(&graph, &life), Some(NodeValue::from(20.0)));
        graph.register(modifier(&strength, Form::BaseAdd, 5.0));
        assert_eq!(total(&graph, &life), Some(NodeValue::from(25.0)));
    }

    #[test]
    fn test_cycle_is_reported() {
        let a = stat("A");
        let b = stat("B");
        let mut graph = StatDependencyGraph::new();
        graph.register(Modifier::new(a.clone(), Form::BaseAdd, Arc::new(StatValue::total(b.clone())), ModifierSource::Global));
        graph.register(Modifier::new(b.clone(), Form::BaseAdd, Arc::new(StatValue::total(a.clone())), ModifierSource::Global));

        let err = graph
            .value(&a, NodeType::Total, &PathDefinition::MainPath)
            .unwrap_err();
        assert!(matches!(err, CompileError::Cycle { .. }));
        // Stats outside the cycle still evaluate.
        let c = stat("C");
        graph.register(modifier(&c, Form::BaseAdd, 1.0));
        assert_eq!(total(&graph, &c), Some(NodeValue::from(1.0)));
    }

    #[test]
    fn test_counted_registration() {
        let life = stat("Life");
        let twice = modifier(&life, Form::BaseAdd, 5.0);
        let mut graph = StatDependencyGraph::new();
        graph.register(twice.clone());
        graph.register(twice.clone());
        assert_eq!(graph.len(), 1);

        assert!(graph.deregister(&twice));
        assert!(graph.contains(&twice));
        assert!(graph.deregister(&twice));
        assert!(!graph.contains(&twice));
        assert!(!graph.deregister(&twice));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_empty_nodes_are_dropped_unless_observed() {
        let life = stat("Life");
        let mana = stat("Mana");
        let path = PathDefinition::MainPath;
        let mut graph = StatDependencyGraph::new();
        let life_modifier = modifier(&life, Form::BaseAdd, 1.0);
        let mana_modifier = modifier(&mana, Form::BaseAdd, 1.0);
        let log = observe(&mut graph, &mana, CollectionView::Default);

        graph.register_all([life_modifier.clone(), mana_modifier.clone()]);
        graph.deregister_all([&life_modifier, &mana_modifier]);

        assert!(graph.collection(&life, Form::BaseAdd, &path).is_none());
        assert_eq!(graph.keys.len(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["+1", "-1"]);

        assert!(graph.collection(&mana, Form::BaseAdd, &path).is_some());

        // An unobserved empty node goes with its last observer
        let rage = stat("Rage");
        let id = graph.subscribe(&rage, Form::BaseAdd, &path, CollectionView::Suspendable, |_| {});
        assert!(graph.collection(&rage, Form::BaseAdd, &path).is_some());
        assert!(graph.unsubscribe(&rage, Form::BaseAdd, &path, CollectionView::Suspendable, id));
        assert!(graph.collection(&rage, Form::BaseAdd, &path).is_none());
        assert_eq!(graph.keys.len(), 1);
    }

    #[test]
    fn test_suspension_coalesces_per_collection() {
        let life = stat("Life");
        let mana = stat("Mana");
        let mut graph = StatDependencyGraph::new();
        let live = observe(&mut graph, &life, CollectionView::Default);
        let life_log = observe(&mut graph, &life, CollectionView::Suspendable);
        let mana_log = observe(&mut graph, &mana, CollectionView::Suspendable);

        let first = modifier(&life, Form::BaseAdd, 1.0);
        let second = modifier(&life, Form::BaseAdd, 2.0);
        graph.suspend_events();
        graph.suspend_events();
        graph.register(first.clone());
        graph.register(second);
        graph.deregister(&first);
        graph.resume_events();
        assert!(life_log.lock().unwrap().is_empty());
        graph.resume_events();

        assert_eq!(*life_log.lock().unwrap(), vec!["refresh"]);
        assert!(mana_log.lock().unwrap().is_empty());
        assert_eq!(*live.lock().unwrap(), vec!["+1", "+2", "-1"]);
    }

    #[test]
    fn test_suspension_without_changes_is_silent() {
        let life = stat("Life");
        let mut graph = StatDependencyGraph::new();
        let log = observe(&mut graph, &life, CollectionView::Suspendable);
        graph.suspend_events();
        graph.resume_events();
        assert!(log.lock().unwrap().is_empty());
        assert!(!graph.is_suspended());
    }

    #[test]
    fn test_conversion_path_is_separate() {
        let life = stat("Life");
        let path = PathDefinition::Conversion(ModifierSource::Global);
        let mut graph = StatDependencyGraph::new();
        graph.register_on(path.clone(), modifier(&life, Form::BaseAdd, 4.0));
        assert_eq!(total(&graph, &life), None);
        assert_eq!(
            graph.value(&life, NodeType::Total, &path).unwrap(),
            Some(NodeValue::from(4.0))
        );
    }
}
