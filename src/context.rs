//! Calculation contexts.
//!
//! Formulas don't know where stat values come from. They ask a
//! `ValueCalculationContext`, which answers "what is node `N` of stat `S`
//! along path `P`". The dependency graph implements it for registered
//! modifiers; `StatContext` is a plain lookup table for callers that
//! already have the numbers.

use crate::path::{NodeType, PathDefinition};
use crate::stat::Stat;
use crate::value::NodeValue;
use std::collections::HashMap;

/// Answers stat lookups during evaluation.
///
/// A missing answer is `None` and propagates through formulas as absence.
pub trait ValueCalculationContext {
    /// Get the value of `node_type` for `stat` along `path`.
    fn get_value(
        &self,
        stat: &Stat,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> Option<NodeValue>;
}

/// A fixed table of stat values.
///
/// # Examples
///
/// ```rust
/// use zzmod::{NodeValue, StatContext, ValueCalculationContext};
/// use zzmod::game::Entity;
/// use zzmod::path::{NodeType, PathDefinition};
/// use zzmod::stat::Stat;
///
/// let life = Stat::new("Life", Entity::Character);
/// let mut context = StatContext::new();
/// context.set(life.clone(), 100.0);
///
/// let value = context.get_value(&life, NodeType::Total, &PathDefinition::MainPath);
/// assert_eq!(value, Some(NodeValue::from(100.0)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatContext {
    values: HashMap<(Stat, NodeType, PathDefinition), NodeValue>,
}

impl StatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the main-path total of `stat`.
    pub fn set(&mut self, stat: Stat, value: impl Into<NodeValue>) {
        self.set_node(stat, NodeType::Total, PathDefinition::MainPath, value);
    }

    /// Set any node of `stat`.
    pub fn set_node(
        &mut self,
        stat: Stat,
        node_type: NodeType,
        path: PathDefinition,
        value: impl Into<NodeValue>,
    ) {
        self.values.insert((stat, node_type, path), value.into());
    }

    /// Remove the main-path total of `stat`.
    pub fn remove(&mut self, stat: &Stat) -> Option<NodeValue> {
        self.values
            .remove(&(stat.clone(), NodeType::Total, PathDefinition::MainPath))
    }

    /// Builder-style variant of [`StatContext::set`].
    pub fn with(mut self, stat: Stat, value: impl Into<NodeValue>) -> Self {
        self.set(stat, value);
        self
    }
}

impl ValueCalculationContext for StatContext {
    fn get_value(
        &self,
        stat: &Stat,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> Option<NodeValue> {
        self.values
            .get(&(stat.clone(), node_type, path.clone()))
            .copied()
    }
}

/// Context that knows no stats.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl ValueCalculationContext for EmptyContext {
    fn get_value(&self, _: &Stat, _: NodeType, _: &PathDefinition) -> Option<NodeValue> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Entity;

    #[test]
    fn test_lookup_is_keyed_by_node_type() {
        let stat = Stat::new("Armour", Entity::Character);
        let mut context = StatContext::new();
        context.set_node(stat.clone(), NodeType::Base, PathDefinition::MainPath, 50.0);

        assert_eq!(
            context.get_value(&stat, NodeType::Base, &PathDefinition::MainPath),
            Some(NodeValue::from(50.0))
        );
        assert_eq!(
            context.get_value(&stat, NodeType::Total, &PathDefinition::MainPath),
            None
        );
    }

    #[test]
    fn test_remove() {
        let stat = Stat::new("Armour", Entity::Character);
        let mut context = StatContext::new().with(stat.clone(), true);
        assert_eq!(context.remove(&stat), Some(NodeValue::from(1.0)));
        assert_eq!(
            context.get_value(&stat, NodeType::Total, &PathDefinition::MainPath),
            None
        );
    }

    #[test]
    fn test_empty_context() {
        let stat = Stat::new("Armour", Entity::Character);
        assert!(EmptyContext
            .get_value(&stat, NodeType::Total, &PathDefinition::MainPath)
            .is_none());
    }
}
