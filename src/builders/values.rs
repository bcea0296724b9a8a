//! Value builders.
//!
//! A [`ValueBuilder`] is an unbuilt formula. It may contain placeholders for
//! values captured by a regex, which [`ValueBuilder::resolve`] binds, and it
//! becomes a [`ValueRef`] once built with [`BuildParameters`].
//!
//! Every combinator returns a new builder; the operands are shared, never
//! copied or mutated.

use crate::builders::conditions::ConditionBuilder;
use crate::builders::references::ResolveContext;
use crate::error::CompileError;
use crate::formula::{ConditionalValue, Constant, FunctionalValue, Value, ValueRef};
use crate::modifier::BuildParameters;
use crate::value::{NodeValue, NodeValueExt};
use std::fmt;
use std::sync::Arc;

/// Rewrites a value builder, e.g. to negate it for "reduced".
pub type ValueConverter = Arc<dyn Fn(ValueBuilder) -> ValueBuilder + Send + Sync>;

/// The converter that leaves values untouched.
pub fn identity_value_converter() -> ValueConverter {
    Arc::new(|value: ValueBuilder| value)
}

/// `outer(inner(value))`.
pub fn compose_value_converters(inner: ValueConverter, outer: ValueConverter) -> ValueConverter {
    Arc::new(move |value: ValueBuilder| outer(inner(value)))
}

/// Core behaviour behind a [`ValueBuilder`].
pub trait CoreValueBuilder: Send + Sync {
    /// Bind placeholders. Builders without placeholders return `None` and
    /// the caller keeps the original handle.
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError>;

    /// Build the formula.
    fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError>;

    fn label(&self) -> String;
}

/// A shareable, immutable formula builder.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::ValueBuilder;
/// use zzmod::context::EmptyContext;
/// use zzmod::{BuildParameters, NodeValue};
///
/// let value = ValueBuilder::from(40.0).add(2.0).as_percentage();
/// let formula = value.build(&BuildParameters::default()).unwrap();
/// assert_eq!(formula.calculate(&EmptyContext), Some(NodeValue::from(0.42)));
/// ```
#[derive(Clone)]
pub struct ValueBuilder(Arc<dyn CoreValueBuilder>);

impl ValueBuilder {
    pub fn new(core: impl CoreValueBuilder + 'static) -> Self {
        Self(Arc::new(core))
    }

    /// A constant value.
    pub fn constant(value: impl Into<NodeValue>) -> Self {
        Self::new(ConstantValueBuilder(Some(value.into())))
    }

    /// A value that is always absent.
    pub fn absent() -> Self {
        Self::new(ConstantValueBuilder(None))
    }

    /// Placeholder for the captured value at `index`.
    pub fn placeholder(index: usize) -> Self {
        Self::new(PlaceholderValueBuilder { index })
    }

    /// A builder whose formula depends on the build parameters.
    pub fn from_parameters(
        label: impl Into<String>,
        build: impl Fn(&BuildParameters) -> Result<ValueRef, CompileError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(ParameterValueBuilder {
            label: label.into(),
            build: Arc::new(build),
        })
    }

    /// Combine operands through `combine`, which defines the absence rule.
    pub fn combine(
        operands: Vec<ValueBuilder>,
        combine: impl Fn(&[Option<NodeValue>]) -> Option<NodeValue> + Send + Sync + 'static,
        label: impl Into<String>,
    ) -> Self {
        Self::new(CompositeValueBuilder {
            operands,
            combine: Arc::new(combine),
            label: label.into(),
        })
    }

    /// `then` if `condition` holds, `otherwise` if not.
    ///
    /// Only the condition's truth value is used; stat conversions it would
    /// apply to a modifier are ignored here.
    pub fn when(
        condition: ConditionBuilder,
        then: impl Into<ValueBuilder>,
        otherwise: impl Into<ValueBuilder>,
    ) -> Self {
        Self::new(IfElseValueBuilder {
            condition,
            then: then.into(),
            otherwise: otherwise.into(),
        })
    }

    pub fn resolve(&self, context: &ResolveContext) -> Result<ValueBuilder, CompileError> {
        Ok(self.0.resolve(context)?.unwrap_or_else(|| self.clone()))
    }

    pub fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError> {
        self.0.build(parameters)
    }

    pub fn label(&self) -> String {
        self.0.label()
    }

    /// Whether both handles share the same builder.
    pub fn ptr_eq(&self, other: &ValueBuilder) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn binary(
        &self,
        other: impl Into<ValueBuilder>,
        symbol: &str,
        op: impl Fn(NodeValue, NodeValue) -> NodeValue + Send + Sync + 'static,
    ) -> ValueBuilder {
        let other = other.into();
        let label = format!("({} {} {})", self.label(), symbol, other.label());
        Self::combine(
            vec![self.clone(), other],
            move |vs| match (vs[0], vs[1]) {
                (Some(l), Some(r)) => Some(op(l, r)),
                _ => None,
            },
            label,
        )
    }

    pub fn add(&self, other: impl Into<ValueBuilder>) -> ValueBuilder {
        self.binary(other, "+", |l, r| l + r)
    }

    pub fn subtract(&self, other: impl Into<ValueBuilder>) -> ValueBuilder {
        self.binary(other, "-", |l, r| l - r)
    }

    pub fn multiply(&self, other: impl Into<ValueBuilder>) -> ValueBuilder {
        self.binary(other, "*", |l, r| l * r)
    }

    pub fn divide_by(&self, other: impl Into<ValueBuilder>) -> ValueBuilder {
        self.binary(other, "/", |l, r| l / r)
    }

    /// Apply `op` to both bounds.
    pub fn select(
        &self,
        op: impl Fn(f64) -> f64 + Send + Sync + 'static,
        label: impl Fn(&str) -> String,
    ) -> ValueBuilder {
        let label = label(&self.label());
        Self::combine(vec![self.clone()], move |vs| vs[0].select(&op), label)
    }

    pub fn negate(&self) -> ValueBuilder {
        self.select(|d| -d, |l| format!("-{}", l))
    }

    /// `value / 100`.
    pub fn as_percentage(&self) -> ValueBuilder {
        self.select(|d| d / 100.0, |l| format!("{}%", l))
    }

    /// `1 + value / 100`, the multiplier of a "more" modifier.
    pub fn as_percentage_more(&self) -> ValueBuilder {
        self.select(|d| 1.0 + d / 100.0, |l| format!("(1 + {}%)", l))
    }

    pub fn round_down(&self) -> ValueBuilder {
        self.select(f64::floor, |l| format!("floor({})", l))
    }

    /// Larger of the two. An absent side is ignored.
    pub fn maximum(&self, other: impl Into<ValueBuilder>) -> ValueBuilder {
        let other = other.into();
        let label = format!("max({}, {})", self.label(), other.label());
        Self::combine(
            vec![self.clone(), other],
            |vs| match (vs[0], vs[1]) {
                (Some(l), Some(r)) => Some(l.combine(r, f64::max)),
                (l, r) => l.or(r),
            },
            label,
        )
    }

    /// Smaller of the two. An absent side is ignored.
    pub fn minimum(&self, other: impl Into<ValueBuilder>) -> ValueBuilder {
        let other = other.into();
        let label = format!("min({}, {})", self.label(), other.label());
        Self::combine(
            vec![self.clone(), other],
            |vs| match (vs[0], vs[1]) {
                (Some(l), Some(r)) => Some(l.combine(r, f64::min)),
                (l, r) => l.or(r),
            },
            label,
        )
    }

    /// This value while `gate` is true, absent otherwise.
    pub fn gated_by(&self, gate: impl Into<ValueBuilder>) -> ValueBuilder {
        let gate = gate.into();
        let label = format!("({} if {})", self.label(), gate.label());
        Self::combine(
            vec![self.clone(), gate],
            |vs| if vs[1].is_true() { vs[0] } else { None },
            label,
        )
    }

    fn compare(
        &self,
        other: impl Into<ValueBuilder>,
        symbol: &str,
        predicate: impl Fn(NodeValue, NodeValue) -> bool + Send + Sync + 'static,
    ) -> ConditionBuilder {
        let other = other.into();
        let label = format!("{} {} {}", self.label(), symbol, other.label());
        let operands = vec![self.clone(), other];
        ConditionBuilder::from_value(ValueBuilder::new(PredicateValueBuilder {
            operands,
            predicate: Arc::new(move |vs: &[Option<NodeValue>]| match (vs[0], vs[1]) {
                (Some(l), Some(r)) => predicate(l, r),
                _ => false,
            }),
            label,
        }))
    }

    /// True if both sides are present and this is entirely above `other`.
    pub fn greater_than(&self, other: impl Into<ValueBuilder>) -> ConditionBuilder {
        self.compare(other, ">", |l, r| l > r)
    }

    /// True if both sides are present and this is entirely below `other`.
    pub fn less_than(&self, other: impl Into<ValueBuilder>) -> ConditionBuilder {
        self.compare(other, "<", |l, r| l < r)
    }

    /// True if both sides are present and equal.
    pub fn eq(&self, other: impl Into<ValueBuilder>) -> ConditionBuilder {
        self.compare(other, "==", |l, r| l == r)
    }
}

impl From<f64> for ValueBuilder {
    fn from(value: f64) -> Self {
        ValueBuilder::constant(value)
    }
}

impl From<NodeValue> for ValueBuilder {
    fn from(value: NodeValue) -> Self {
        ValueBuilder::constant(value)
    }
}

impl fmt::Debug for ValueBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueBuilder({})", self.label())
    }
}

struct ConstantValueBuilder(Option<NodeValue>);

impl CoreValueBuilder for ConstantValueBuilder {
    fn resolve(&self, _: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        Ok(None)
    }

    fn build(&self, _: &BuildParameters) -> Result<ValueRef, CompileError> {
        Ok(Arc::new(Constant(self.0)))
    }

    fn label(&self) -> String {
        Constant(self.0).label()
    }
}

struct PlaceholderValueBuilder {
    index: usize,
}

impl CoreValueBuilder for PlaceholderValueBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        context.value(self.index).map(|v| Some(v.clone()))
    }

    fn build(&self, _: &BuildParameters) -> Result<ValueRef, CompileError> {
        Err(CompileError::UnresolvedPlaceholder(self.label()))
    }

    fn label(&self) -> String {
        format!("Value#{}", self.index)
    }
}

type BuildFn = dyn Fn(&BuildParameters) -> Result<ValueRef, CompileError> + Send + Sync;

struct ParameterValueBuilder {
    label: String,
    build: Arc<BuildFn>,
}

impl CoreValueBuilder for ParameterValueBuilder {
    fn resolve(&self, _: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        Ok(None)
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError> {
        (self.build)(parameters)
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

type Combine = dyn Fn(&[Option<NodeValue>]) -> Option<NodeValue> + Send + Sync;
type Predicate = dyn Fn(&[Option<NodeValue>]) -> bool + Send + Sync;

/// Resolve every operand; `None` if none of them changed.
fn resolve_operands(
    operands: &[ValueBuilder],
    context: &ResolveContext,
) -> Result<Option<Vec<ValueBuilder>>, CompileError> {
    let resolved = operands
        .iter()
        .map(|o| o.resolve(context))
        .collect::<Result<Vec<_>, _>>()?;
    if resolved.iter().zip(operands).all(|(r, o)| r.ptr_eq(o)) {
        Ok(None)
    } else {
        Ok(Some(resolved))
    }
}

fn build_operands(
    operands: &[ValueBuilder],
    parameters: &BuildParameters,
) -> Result<Vec<ValueRef>, CompileError> {
    operands.iter().map(|o| o.build(parameters)).collect()
}

struct CompositeValueBuilder {
    operands: Vec<ValueBuilder>,
    combine: Arc<Combine>,
    label: String,
}

impl CoreValueBuilder for CompositeValueBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        Ok(resolve_operands(&self.operands, context)?.map(|operands| {
            ValueBuilder::new(CompositeValueBuilder {
                label: self.label.clone(),
                combine: self.combine.clone(),
                operands,
            })
        }))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError> {
        let operands = build_operands(&self.operands, parameters)?;
        let combine = self.combine.clone();
        Ok(Arc::new(FunctionalValue::new(
            operands,
            move |vs| combine(vs),
            self.label.clone(),
        )))
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

struct PredicateValueBuilder {
    operands: Vec<ValueBuilder>,
    predicate: Arc<Predicate>,
    label: String,
}

impl CoreValueBuilder for PredicateValueBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        Ok(resolve_operands(&self.operands, context)?.map(|operands| {
            ValueBuilder::new(PredicateValueBuilder {
                label: self.label.clone(),
                predicate: self.predicate.clone(),
                operands,
            })
        }))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError> {
        let operands = build_operands(&self.operands, parameters)?;
        let predicate = self.predicate.clone();
        Ok(Arc::new(ConditionalValue::new(
            operands,
            move |vs| predicate(vs),
            self.label.clone(),
        )))
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

struct IfElseValueBuilder {
    condition: ConditionBuilder,
    then: ValueBuilder,
    otherwise: ValueBuilder,
}

impl CoreValueBuilder for IfElseValueBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        Ok(Some(ValueBuilder::new(IfElseValueBuilder {
            condition: self.condition.resolve(context)?,
            then: self.then.resolve(context)?,
            otherwise: self.otherwise.resolve(context)?,
        })))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError> {
        let condition = self.condition.build(parameters)?;
        let then = self.then.build(parameters)?;
        let otherwise = self.otherwise.build(parameters)?;
        let label = self.label();
        match condition.value {
            None => Ok(then),
            Some(gate) => Ok(Arc::new(FunctionalValue::new(
                vec![gate, then, otherwise],
                |vs| if vs[0].is_true() { vs[1] } else { vs[2] },
                label,
            ))),
        }
    }

    fn label(&self) -> String {
        format!(
            "({} ? {} : {})",
            self.condition.label(),
            self.then.label(),
            self.otherwise.label()
        )
    }
}
