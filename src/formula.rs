//! Value formulas.
//!
//! A formula is a tree of [`Value`] nodes evaluated lazily against a
//! [`ValueCalculationContext`]. Nodes carry no state between calls, so the
//! same formula can be evaluated any number of times and always reflects the
//! context it is given.
//!
//! Absence (`None`) propagates through arithmetic. Conditions read a value
//! as true when it is present and non-zero.

use crate::context::ValueCalculationContext;
use crate::path::{NodeType, PathDefinition};
use crate::stat::Stat;
use crate::value::{NodeValue, NodeValueExt};
use std::fmt;
use std::sync::Arc;

/// A node of a value formula.
pub trait Value: Send + Sync {
    /// Evaluate against `context`.
    fn calculate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue>;

    /// Human-readable rendering of the formula.
    fn label(&self) -> String;

    /// Stats read while evaluating.
    fn stats(&self) -> Vec<Stat> {
        Vec::new()
    }
}

/// Shared handle to a formula.
pub type ValueRef = Arc<dyn Value>;

impl fmt::Debug for dyn Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.label())
    }
}

type Combine = dyn Fn(&[Option<NodeValue>]) -> Option<NodeValue> + Send + Sync;
type Predicate = dyn Fn(&[Option<NodeValue>]) -> bool + Send + Sync;

/// A constant, possibly absent.
///
/// # Examples
///
/// ```rust
/// use zzmod::formula::{Constant, Value};
/// use zzmod::context::EmptyContext;
/// use zzmod::NodeValue;
///
/// let two = Constant::new(2.0);
/// assert_eq!(two.calculate(&EmptyContext), Some(NodeValue::from(2.0)));
/// assert_eq!(Constant::absent().calculate(&EmptyContext), None);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub Option<NodeValue>);

impl Constant {
    pub fn new(value: impl Into<NodeValue>) -> Self {
        Self(Some(value.into()))
    }

    pub fn absent() -> Self {
        Self(None)
    }
}

impl Value for Constant {
    fn calculate(&self, _: &dyn ValueCalculationContext) -> Option<NodeValue> {
        self.0
    }

    fn label(&self) -> String {
        match self.0 {
            Some(v) => v.to_string(),
            None => "null".to_string(),
        }
    }
}

/// Lookup of one node of a stat.
#[derive(Debug, Clone)]
pub struct StatValue {
    pub stat: Stat,
    pub node_type: NodeType,
    pub path: PathDefinition,
}

impl StatValue {
    /// The main-path total of `stat`.
    pub fn total(stat: Stat) -> Self {
        Self {
            stat,
            node_type: NodeType::Total,
            path: PathDefinition::MainPath,
        }
    }
}

impl Value for StatValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue> {
        context.get_value(&self.stat, self.node_type, &self.path)
    }

    fn label(&self) -> String {
        if self.node_type == NodeType::Total && self.path.is_main_path() {
            self.stat.to_string()
        } else {
            format!("{}[{}, {}]", self.stat, self.node_type, self.path)
        }
    }

    fn stats(&self) -> Vec<Stat> {
        vec![self.stat.clone()]
    }
}

/// Combination of operand values through a closure.
///
/// The closure decides the absence rule; the label is kept next to it.
#[derive(Clone)]
pub struct FunctionalValue {
    operands: Vec<ValueRef>,
    combine: Arc<Combine>,
    label: String,
}

impl FunctionalValue {
    pub fn new(
        operands: Vec<ValueRef>,
        combine: impl Fn(&[Option<NodeValue>]) -> Option<NodeValue> + Send + Sync + 'static,
        label: impl Into<String>,
    ) -> Self {
        Self {
            operands,
            combine: Arc::new(combine),
            label: label.into(),
        }
    }

    /// Unary operation; absent input gives absent output.
    pub fn map(
        operand: ValueRef,
        op: impl Fn(NodeValue) -> NodeValue + Send + Sync + 'static,
        label: impl Into<String>,
    ) -> Self {
        Self::new(vec![operand], move |vs| vs[0].map(&op), label)
    }

    /// Binary operation; absent if either side is absent.
    pub fn binary(
        left: ValueRef,
        right: ValueRef,
        op: impl Fn(NodeValue, NodeValue) -> NodeValue + Send + Sync + 'static,
        label: impl Into<String>,
    ) -> Self {
        Self::new(
            vec![left, right],
            move |vs| match (vs[0], vs[1]) {
                (Some(l), Some(r)) => Some(op(l, r)),
                _ => None,
            },
            label,
        )
    }
}

impl Value for FunctionalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue> {
        let values: Vec<Option<NodeValue>> = self
            .operands
            .iter()
            .map(|operand| operand.calculate(context))
            .collect();
        (self.combine)(&values)
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn stats(&self) -> Vec<Stat> {
        self.operands.iter().flat_map(|o| o.stats()).collect()
    }
}

/// Boolean formula over operand values. Always present: `1` or `0`.
#[derive(Clone)]
pub struct ConditionalValue {
    operands: Vec<ValueRef>,
    predicate: Arc<Predicate>,
    label: String,
}

impl ConditionalValue {
    pub fn new(
        operands: Vec<ValueRef>,
        predicate: impl Fn(&[Option<NodeValue>]) -> bool + Send + Sync + 'static,
        label: impl Into<String>,
    ) -> Self {
        Self {
            operands,
            predicate: Arc::new(predicate),
            label: label.into(),
        }
    }

    /// True when `operand` is present and non-zero.
    pub fn is_true(operand: ValueRef) -> Self {
        let label = operand.label();
        Self::new(vec![operand], |vs| vs[0].is_true(), label)
    }

    /// A constant truth value.
    pub fn constant(value: bool) -> Self {
        Self::new(Vec::new(), move |_| value, value.to_string())
    }
}

impl Value for ConditionalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue> {
        let values: Vec<Option<NodeValue>> = self
            .operands
            .iter()
            .map(|operand| operand.calculate(context))
            .collect();
        Some(NodeValue::from((self.predicate)(&values)))
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn stats(&self) -> Vec<Stat> {
        self.operands.iter().flat_map(|o| o.stats()).collect()
    }
}

/// Number of operands that evaluate as true.
#[derive(Clone)]
pub struct CountingValue(pub Vec<ValueRef>);

impl Value for CountingValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue> {
        let count = self
            .0
            .iter()
            .filter(|v| v.calculate(context).is_true())
            .count();
        Some(NodeValue::from(count as f64))
    }

    fn label(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(|v| v.label()).collect();
        format!("Count({})", parts.join(", "))
    }

    fn stats(&self) -> Vec<Stat> {
        self.0.iter().flat_map(|o| o.stats()).collect()
    }
}

/// Evaluate `value` as a condition.
pub fn is_true(value: &dyn Value, context: &dyn ValueCalculationContext) -> bool {
    value.calculate(context).is_true()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EmptyContext, StatContext};
    use crate::game::Entity;

    fn constant(v: f64) -> ValueRef {
        Arc::new(Constant::new(v))
    }

    #[test]
    fn test_stat_value_reads_context() {
        let stat = Stat::new("Strength", Entity::Character);
        let context = StatContext::new().with(stat.clone(), 42.0);
        let value = StatValue::total(stat.clone());
        assert_eq!(value.calculate(&context), Some(NodeValue::from(42.0)));
        assert_eq!(value.calculate(&EmptyContext), None);
        assert_eq!(value.stats(), vec![stat]);
    }

    #[test]
    fn test_binary_propagates_absence() {
        let stat = Stat::new("Strength", Entity::Character);
        let sum = FunctionalValue::binary(
            constant(1.0),
            Arc::new(StatValue::total(stat)),
            |l, r| l + r,
            "1 + Strength",
        );
        assert_eq!(sum.calculate(&EmptyContext), None);
        assert_eq!(sum.label(), "1 + Strength");
    }

    #[test]
    fn test_conditional_is_never_absent() {
        let absent: ValueRef = Arc::new(Constant::absent());
        let cond = ConditionalValue::is_true(absent);
        assert_eq!(cond.calculate(&EmptyContext), Some(NodeValue::from(false)));
    }

    #[test]
    fn test_counting_value_sums_truthiness() {
        let count = CountingValue(vec![
            constant(3.0),
            constant(0.0),
            Arc::new(Constant::absent()),
            constant(-1.0),
        ]);
        assert_eq!(count.calculate(&EmptyContext), Some(NodeValue::from(2.0)));
        assert_eq!(CountingValue(Vec::new()).calculate(&EmptyContext), Some(NodeValue::from(0.0)));
    }

    #[test]
    fn test_stats_collected_from_operands() {
        let a = Stat::new("A", Entity::Character);
        let b = Stat::new("B", Entity::Enemy);
        let value = FunctionalValue::binary(
            Arc::new(StatValue::total(a.clone())),
            Arc::new(StatValue::total(b.clone())),
            |l, r| l * r,
            "A * B",
        );
        assert_eq!(value.stats(), vec![a, b]);
    }
}
