//! Condition builders.
//!
//! A condition contributes two things when built: a stat converter that
//! rewrites the stat builder it is attached to, and an optional truth value
//! gating the modifier. `None` as truth value means unconditional.
//!
//! `And`/`Or` composites flatten when nested in their own kind and negate
//! through De Morgan's law, so `not(a & b)` is `not(a) | not(b)` and never a
//! wrapper around the composite.

use crate::builders::entities::EntityBuilder;
use crate::builders::references::{ActionBuilder, KeywordBuilder, ResolveContext, SkillBuilder};
use crate::builders::stats::StatBuilder;
use crate::builders::values::ValueBuilder;
use crate::context::ValueCalculationContext;
use crate::error::CompileError;
use crate::formula::{ConditionalValue, StatValue, Value, ValueRef};
use crate::game::{AttackDamageHand, DamageSource};
use crate::modifier::BuildParameters;
use crate::stat::Stat;
use crate::value::{NodeValue, NodeValueExt};
use std::fmt;
use std::sync::Arc;

/// Rewrites a stat builder, e.g. to restrict it to an entity or hand.
pub type StatConverter = Arc<dyn Fn(StatBuilder) -> Result<StatBuilder, CompileError> + Send + Sync>;

/// The converter that leaves stats untouched.
pub fn identity_converter() -> StatConverter {
    Arc::new(|stat: StatBuilder| -> Result<StatBuilder, CompileError> { Ok(stat) })
}

/// Result of building a condition.
#[derive(Clone)]
pub struct ConditionBuildResult {
    pub stat_converter: StatConverter,
    /// Truth value, `None` when always true.
    pub value: Option<ValueRef>,
}

impl ConditionBuildResult {
    pub fn unconditional(stat_converter: StatConverter) -> Self {
        Self {
            stat_converter,
            value: None,
        }
    }

    pub fn from_value(value: ValueRef) -> Self {
        Self {
            stat_converter: identity_converter(),
            value: Some(value),
        }
    }

    /// Evaluate the truth value; unconditional results are true.
    pub fn is_true(&self, context: &dyn ValueCalculationContext) -> bool {
        self.value
            .as_ref()
            .map_or(true, |v| v.calculate(context).is_true())
    }
}

/// Kind of a composite condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    And,
    Or,
}

impl CompositeKind {
    fn opposite(self) -> Self {
        match self {
            CompositeKind::And => CompositeKind::Or,
            CompositeKind::Or => CompositeKind::And,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompositeKind::And => " && ",
            CompositeKind::Or => " || ",
        }
    }
}

/// Core behaviour behind a [`ConditionBuilder`].
pub trait CoreConditionBuilder: Send + Sync {
    /// Bind placeholders; `None` if there are none.
    fn resolve(&self, context: &ResolveContext)
        -> Result<Option<ConditionBuilder>, CompileError>;

    fn build(&self, parameters: &BuildParameters) -> Result<ConditionBuildResult, CompileError>;

    /// The negated condition.
    fn not(&self) -> ConditionBuilder;

    fn label(&self) -> String;

    /// Children, if this is a composite.
    fn composite(&self) -> Option<(CompositeKind, &[ConditionBuilder])> {
        None
    }
}

/// A shareable, immutable condition builder.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::ConditionBuilder;
/// use zzmod::context::EmptyContext;
/// use zzmod::BuildParameters;
///
/// let condition = ConditionBuilder::constant(true).and(&ConditionBuilder::constant(false));
/// let negated = condition.not();
/// assert_eq!(negated.label(), "(!true || !false)");
///
/// let built = negated.build(&BuildParameters::default()).unwrap();
/// assert!(built.is_true(&EmptyContext));
/// ```
#[derive(Clone)]
pub struct ConditionBuilder(Arc<dyn CoreConditionBuilder>);

impl ConditionBuilder {
    pub fn new(core: impl CoreConditionBuilder + 'static) -> Self {
        Self(Arc::new(core))
    }

    pub fn constant(value: bool) -> Self {
        Self::new(ConstantCondition(value))
    }

    /// Holds while `value` is present and non-zero.
    pub fn from_value(value: ValueBuilder) -> Self {
        Self::new(ValueCondition {
            value,
            negated: false,
        })
    }

    /// A condition that only rewrites stats.
    ///
    /// `negated` is the converter used by `not()`; without one, building the
    /// negation fails.
    pub fn stat_converting(
        label: impl Into<String>,
        converter: StatConverter,
        negated: Option<StatConverter>,
    ) -> Self {
        Self::new(StatConvertingCondition {
            label: label.into(),
            converter,
            negated,
        })
    }

    /// Restrict the stats to the entities of `entity`.
    pub fn for_entity(entity: EntityBuilder) -> Self {
        let label = format!("For({})", entity.label());
        Self::stat_converting(
            label,
            Arc::new(move |stat: StatBuilder| -> Result<StatBuilder, CompileError> {
                Ok(stat.for_entity(entity.clone()))
            }),
            None,
        )
    }

    /// Restrict damage stats to attacks with `hand`.
    pub fn attack_with(hand: AttackDamageHand) -> Self {
        let label = format!("AttackWith({})", hand);
        let combinator = label.clone();
        Self::stat_converting(
            label,
            Arc::new(move |stat: StatBuilder| {
                stat.with_damage_source(DamageSource::Attack, &combinator)?
                    .with_hand(hand, &combinator)
            }),
            None,
        )
    }

    /// Restrict damage stats to damage from `source`.
    pub fn with_damage_source(source: DamageSource) -> Self {
        let label = format!("With({})", source);
        let combinator = label.clone();
        Self::stat_converting(
            label,
            Arc::new(move |stat: StatBuilder| stat.with_damage_source(source, &combinator)),
            None,
        )
    }

    /// Restrict damage stats to skill damage.
    pub fn with_skills() -> Self {
        Self::stat_converting(
            "WithSkills",
            Arc::new(|stat: StatBuilder| stat.with_skills("WithSkills")),
            None,
        )
    }

    /// Holds while the active skill part has `keyword`.
    pub fn with_keyword(keyword: impl Into<KeywordBuilder>) -> Self {
        Self::new(KeywordCondition {
            keyword: keyword.into(),
            negated: false,
        })
    }

    /// Holds while `skill` is the active skill.
    pub fn with_skill(skill: impl Into<SkillBuilder>) -> Self {
        Self::new(SkillCondition {
            skill: skill.into(),
            negated: false,
        })
    }

    /// Holds if `action` happened recently.
    pub fn recently(action: impl Into<ActionBuilder>) -> Self {
        Self::new(ActionCondition {
            action: action.into(),
            negated: false,
        })
    }

    /// Conjunction of all `conditions`.
    pub fn all(conditions: impl IntoIterator<Item = ConditionBuilder>) -> Self {
        Self::composite_of(CompositeKind::And, conditions)
    }

    /// Disjunction of all `conditions`.
    pub fn any(conditions: impl IntoIterator<Item = ConditionBuilder>) -> Self {
        Self::composite_of(CompositeKind::Or, conditions)
    }

    fn composite_of(kind: CompositeKind, conditions: impl IntoIterator<Item = ConditionBuilder>) -> Self {
        let mut flattened = Vec::new();
        for condition in conditions {
            match condition.0.composite() {
                Some((k, children)) if k == kind => flattened.extend(children.iter().cloned()),
                _ => flattened.push(condition),
            }
        }
        Self::new(CompositeCondition {
            kind,
            conditions: flattened,
        })
    }

    pub fn and(&self, other: &ConditionBuilder) -> ConditionBuilder {
        Self::all([self.clone(), other.clone()])
    }

    pub fn or(&self, other: &ConditionBuilder) -> ConditionBuilder {
        Self::any([self.clone(), other.clone()])
    }

    pub fn not(&self) -> ConditionBuilder {
        self.0.not()
    }

    pub fn resolve(&self, context: &ResolveContext) -> Result<ConditionBuilder, CompileError> {
        Ok(self.0.resolve(context)?.unwrap_or_else(|| self.clone()))
    }

    pub fn build(&self, parameters: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        self.0.build(parameters)
    }

    pub fn label(&self) -> String {
        self.0.label()
    }

    /// Kind and children if this is a composite.
    pub fn composite(&self) -> Option<(CompositeKind, &[ConditionBuilder])> {
        self.0.composite()
    }

    pub fn ptr_eq(&self, other: &ConditionBuilder) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<bool> for ConditionBuilder {
    fn from(value: bool) -> Self {
        ConditionBuilder::constant(value)
    }
}

impl fmt::Debug for ConditionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConditionBuilder({})", self.label())
    }
}

struct ConstantCondition(bool);

impl CoreConditionBuilder for ConstantCondition {
    fn resolve(&self, _: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        Ok(None)
    }

    fn build(&self, _: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        if self.0 {
            Ok(ConditionBuildResult::unconditional(identity_converter()))
        } else {
            Ok(ConditionBuildResult::from_value(Arc::new(
                ConditionalValue::constant(false),
            )))
        }
    }

    fn not(&self) -> ConditionBuilder {
        ConditionBuilder::new(NegatedConstant(self.0))
    }

    fn label(&self) -> String {
        self.0.to_string()
    }
}

/// `!constant`, kept apart so labels show the negation.
struct NegatedConstant(bool);

impl CoreConditionBuilder for NegatedConstant {
    fn resolve(&self, _: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        Ok(None)
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        ConstantCondition(!self.0).build(parameters)
    }

    fn not(&self) -> ConditionBuilder {
        ConditionBuilder::constant(self.0)
    }

    fn label(&self) -> String {
        format!("!{}", self.0)
    }
}

struct ValueCondition {
    value: ValueBuilder,
    negated: bool,
}

impl CoreConditionBuilder for ValueCondition {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        let value = self.value.resolve(context)?;
        if value.ptr_eq(&self.value) {
            return Ok(None);
        }
        Ok(Some(ConditionBuilder::new(ValueCondition {
            value,
            negated: self.negated,
        })))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        let value = self.value.build(parameters)?;
        Ok(ConditionBuildResult::from_value(truth_value(value, self.negated)))
    }

    fn not(&self) -> ConditionBuilder {
        ConditionBuilder::new(ValueCondition {
            value: self.value.clone(),
            negated: !self.negated,
        })
    }

    fn label(&self) -> String {
        negated_label(self.negated, self.value.label())
    }
}

fn truth_value(value: ValueRef, negated: bool) -> ValueRef {
    let label = negated_label(negated, value.label());
    Arc::new(ConditionalValue::new(
        vec![value],
        move |vs| vs[0].is_true() != negated,
        label,
    ))
}

fn negated_label(negated: bool, label: String) -> String {
    if negated {
        format!("!{}", label)
    } else {
        label
    }
}

struct StatConvertingCondition {
    label: String,
    converter: StatConverter,
    negated: Option<StatConverter>,
}

impl CoreConditionBuilder for StatConvertingCondition {
    fn resolve(&self, _: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        Ok(None)
    }

    fn build(&self, _: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        Ok(ConditionBuildResult::unconditional(self.converter.clone()))
    }

    fn not(&self) -> ConditionBuilder {
        let label = format!("!{}", self.label);
        match &self.negated {
            Some(negated) => ConditionBuilder::new(StatConvertingCondition {
                label,
                converter: negated.clone(),
                negated: Some(self.converter.clone()),
            }),
            None => ConditionBuilder::new(UnsupportedNegation {
                label,
                original: self.label.clone(),
            }),
        }
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

struct UnsupportedNegation {
    label: String,
    original: String,
}

impl CoreConditionBuilder for UnsupportedNegation {
    fn resolve(&self, _: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        Ok(None)
    }

    fn build(&self, _: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        Err(CompileError::UnsupportedNegation(self.original.clone()))
    }

    fn not(&self) -> ConditionBuilder {
        ConditionBuilder::stat_converting(self.original.clone(), identity_converter(), None)
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

struct KeywordCondition {
    keyword: KeywordBuilder,
    negated: bool,
}

impl CoreConditionBuilder for KeywordCondition {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        if self.keyword.is_resolved() {
            return Ok(None);
        }
        Ok(Some(ConditionBuilder::new(KeywordCondition {
            keyword: self.keyword.resolve(context)?,
            negated: self.negated,
        })))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        let keyword = *self.keyword.get()?;
        let stat = Stat::active_skill_has_keyword(parameters.modifier_source_entity, keyword);
        Ok(ConditionBuildResult::from_value(truth_value(
            Arc::new(StatValue::total(stat)),
            self.negated,
        )))
    }

    fn not(&self) -> ConditionBuilder {
        ConditionBuilder::new(KeywordCondition {
            keyword: self.keyword.clone(),
            negated: !self.negated,
        })
    }

    fn label(&self) -> String {
        negated_label(self.negated, format!("With({})", self.keyword.label()))
    }
}

struct SkillCondition {
    skill: SkillBuilder,
    negated: bool,
}

impl CoreConditionBuilder for SkillCondition {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        if self.skill.is_resolved() {
            return Ok(None);
        }
        Ok(Some(ConditionBuilder::new(SkillCondition {
            skill: self.skill.resolve(context)?,
            negated: self.negated,
        })))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        let skill = self.skill.get()?;
        let id = f64::from(skill.numeric_id);
        let active = StatValue::total(Stat::active_skill_id(parameters.modifier_source_entity));
        let negated = self.negated;
        Ok(ConditionBuildResult::from_value(Arc::new(ConditionalValue::new(
            vec![Arc::new(active)],
            move |vs| vs[0].map_or(false, |v| v == id) != negated,
            self.label(),
        ))))
    }

    fn not(&self) -> ConditionBuilder {
        ConditionBuilder::new(SkillCondition {
            skill: self.skill.clone(),
            negated: !self.negated,
        })
    }

    fn label(&self) -> String {
        let skill = match &self.skill {
            crate::builders::references::Resolvable::Known(s) => s.id.clone(),
            crate::builders::references::Resolvable::Reference { label, .. } => label.clone(),
        };
        negated_label(self.negated, format!("WithSkill({})", skill))
    }
}

struct ActionCondition {
    action: ActionBuilder,
    negated: bool,
}

impl CoreConditionBuilder for ActionCondition {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        if self.action.is_resolved() {
            return Ok(None);
        }
        Ok(Some(ConditionBuilder::new(ActionCondition {
            action: self.action.resolve(context)?,
            negated: self.negated,
        })))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        let action = self.action.get()?;
        let stat = Stat::new(
            format!("{}.RecentOccurrences", action),
            parameters.modifier_source_entity,
        );
        Ok(ConditionBuildResult::from_value(truth_value(
            Arc::new(StatValue::total(stat)),
            self.negated,
        )))
    }

    fn not(&self) -> ConditionBuilder {
        ConditionBuilder::new(ActionCondition {
            action: self.action.clone(),
            negated: !self.negated,
        })
    }

    fn label(&self) -> String {
        negated_label(self.negated, format!("Recently({})", self.action.label()))
    }
}

struct CompositeCondition {
    kind: CompositeKind,
    conditions: Vec<ConditionBuilder>,
}

impl CoreConditionBuilder for CompositeCondition {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ConditionBuilder>, CompileError> {
        let resolved = self
            .conditions
            .iter()
            .map(|c| c.resolve(context))
            .collect::<Result<Vec<_>, _>>()?;
        if resolved.iter().zip(&self.conditions).all(|(r, c)| r.ptr_eq(c)) {
            return Ok(None);
        }
        Ok(Some(ConditionBuilder::composite_of(self.kind, resolved)))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ConditionBuildResult, CompileError> {
        let results = self
            .conditions
            .iter()
            .map(|c| c.build(parameters))
            .collect::<Result<Vec<_>, _>>()?;
        let converters: Vec<StatConverter> =
            results.iter().map(|r| r.stat_converter.clone()).collect();
        let values: Vec<Option<ValueRef>> = results.into_iter().map(|r| r.value).collect();
        let label = self.label();
        Ok(match self.kind {
            CompositeKind::And => ConditionBuildResult {
                stat_converter: compose_converters(converters),
                value: all_of(values, label),
            },
            CompositeKind::Or => ConditionBuildResult {
                stat_converter: union_converters(converters),
                value: any_of(values, label),
            },
        })
    }

    fn not(&self) -> ConditionBuilder {
        ConditionBuilder::composite_of(
            self.kind.opposite(),
            self.conditions.iter().map(ConditionBuilder::not),
        )
    }

    fn label(&self) -> String {
        let parts: Vec<String> = self.conditions.iter().map(|c| c.label()).collect();
        format!("({})", parts.join(self.kind.symbol()))
    }

    fn composite(&self) -> Option<(CompositeKind, &[ConditionBuilder])> {
        Some((self.kind, &self.conditions))
    }
}

/// Apply converters one after another.
pub fn compose_converters(converters: Vec<StatConverter>) -> StatConverter {
    Arc::new(move |stat: StatBuilder| {
        converters.iter().try_fold(stat, |stat, convert| convert(stat))
    })
}

/// Apply each converter to the original and combine the results.
///
/// Converters that left the stat untouched don't contribute if any other
/// converter changed it, so the original isn't counted twice.
pub fn union_converters(converters: Vec<StatConverter>) -> StatConverter {
    Arc::new(move |stat: StatBuilder| -> Result<StatBuilder, CompileError> {
        let converted = converters
            .iter()
            .map(|convert| convert(stat.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let changed: Vec<StatBuilder> = converted
            .iter()
            .filter(|s| !s.ptr_eq(&stat))
            .cloned()
            .collect();
        if changed.is_empty() {
            return Ok(stat);
        }
        Ok(StatBuilder::combine(changed))
    })
}

/// Conjunction that stops at the first false operand.
struct AllValue {
    values: Vec<ValueRef>,
    label: String,
}

impl Value for AllValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue> {
        Some(NodeValue::from(
            self.values.iter().all(|v| v.calculate(context).is_true()),
        ))
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn stats(&self) -> Vec<Stat> {
        self.values.iter().flat_map(|v| v.stats()).collect()
    }
}

/// Disjunction that stops at the first true operand.
struct AnyValue {
    values: Vec<ValueRef>,
    label: String,
}

impl Value for AnyValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue> {
        Some(NodeValue::from(
            self.values.iter().any(|v| v.calculate(context).is_true()),
        ))
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn stats(&self) -> Vec<Stat> {
        self.values.iter().flat_map(|v| v.stats()).collect()
    }
}

/// `None` entries are always true and drop out.
fn all_of(values: Vec<Option<ValueRef>>, label: String) -> Option<ValueRef> {
    let values: Vec<ValueRef> = values.into_iter().flatten().collect();
    if values.is_empty() {
        return None;
    }
    Some(Arc::new(AllValue { values, label }))
}

/// A `None` entry is always true and makes the whole disjunction true.
fn any_of(values: Vec<Option<ValueRef>>, label: String) -> Option<ValueRef> {
    let values: Option<Vec<ValueRef>> = values.into_iter().collect();
    match values {
        None => None,
        Some(values) if values.is_empty() => Some(Arc::new(ConditionalValue::constant(false))),
        Some(values) => Some(Arc::new(AnyValue { values, label })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EmptyContext, StatContext};
    use crate::game::Entity;
    use rstest::rstest;

    fn flag(name: &str) -> Stat {
        Stat::new(name, Entity::Character)
    }

    fn flag_condition(name: &str) -> ConditionBuilder {
        ConditionBuilder::from_value(StatBuilder::from_stat(flag(name)).value())
    }

    fn truth(condition: &ConditionBuilder, context: &StatContext) -> bool {
        condition
            .build(&BuildParameters::default())
            .unwrap()
            .is_true(context)
    }

    #[rstest]
    #[case(false, false)]
    #[case(false, true)]
    #[case(true, false)]
    #[case(true, true)]
    fn test_de_morgan(#[case] a: bool, #[case] b: bool) {
        let context = StatContext::new().with(flag("a"), a).with(flag("b"), b);
        let ca = flag_condition("a");
        let cb = flag_condition("b");

        let not_and = ca.and(&cb).not();
        let or_not = ca.not().or(&cb.not());
        assert_eq!(truth(&not_and, &context), truth(&or_not, &context));
        assert_eq!(truth(&not_and, &context), !(a && b));

        let not_or = ca.or(&cb).not();
        assert_eq!(truth(&not_or, &context), !(a || b));
    }

    #[test]
    fn test_not_flips_composite_kind() {
        let and = flag_condition("a").and(&flag_condition("b"));
        let negated = and.not();
        let (kind, children) = negated.composite().unwrap();
        assert_eq!(kind, CompositeKind::Or);
        assert_eq!(children.len(), 2);
        assert_eq!(negated.label(), "(!a (Character) || !b (Character))");
    }

    #[test]
    fn test_nested_composites_flatten() {
        let a = flag_condition("a");
        let b = flag_condition("b");
        let c = flag_condition("c");
        let nested = a.and(&b).and(&c);
        let (kind, children) = nested.composite().unwrap();
        assert_eq!(kind, CompositeKind::And);
        assert_eq!(children.len(), 3);

        let mixed = a.or(&b).and(&c);
        assert_eq!(mixed.composite().unwrap().1.len(), 2);
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_and_with_true_is_identity(#[case] x: bool) {
        let context = StatContext::new().with(flag("x"), x);
        let condition = ConditionBuilder::all([
            ConditionBuilder::constant(true),
            flag_condition("x"),
            ConditionBuilder::constant(true),
        ]);
        assert_eq!(truth(&condition, &context), x);
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_or_with_not_true_is_identity(#[case] x: bool) {
        let context = StatContext::new().with(flag("x"), x);
        let condition = ConditionBuilder::any([
            ConditionBuilder::constant(true).not(),
            flag_condition("x"),
            ConditionBuilder::constant(true).not(),
        ]);
        assert_eq!(truth(&condition, &context), x);
    }

    #[test]
    fn test_or_with_unconditional_is_true() {
        let condition = ConditionBuilder::constant(true).or(&flag_condition("x"));
        let built = condition.build(&BuildParameters::default()).unwrap();
        assert!(built.value.is_none());
        assert!(built.is_true(&EmptyContext));
    }

    #[test]
    fn test_and_composes_converters_sequentially() {
        let condition = ConditionBuilder::for_entity(EntityBuilder::from(Entity::Enemy))
            .and(&ConditionBuilder::attack_with(AttackDamageHand::OffHand));
        let built = condition.build(&BuildParameters::default()).unwrap();
        let stat = StatBuilder::damage(crate::game::DamageType::Physical);
        let converted = (built.stat_converter)(stat).unwrap();
        let results = converted.build(&BuildParameters::default()).unwrap();
        assert_eq!(results[0].stats.len(), 1);
        assert_eq!(
            results[0].stats[0].identity.as_str(),
            "Physical.Damage.Attack.OffHand"
        );
        assert_eq!(results[0].stats[0].entity, Entity::Enemy);
    }

    #[test]
    fn test_or_unions_converted_stats() {
        let condition = ConditionBuilder::for_entity(EntityBuilder::from(Entity::Enemy))
            .or(&ConditionBuilder::for_entity(EntityBuilder::from(Entity::Minion)))
            .or(&ConditionBuilder::constant(true));
        let built = condition.build(&BuildParameters::default()).unwrap();
        let converted = (built.stat_converter)(StatBuilder::from_identity("Life")).unwrap();
        let results = converted.build(&BuildParameters::default()).unwrap();
        let entities: Vec<Entity> = results
            .iter()
            .flat_map(|r| r.stats.iter().map(|s| s.entity))
            .collect();
        assert_eq!(entities, vec![Entity::Enemy, Entity::Minion]);
    }

    #[test]
    fn test_attack_with_on_non_damage_stat_fails() {
        let built = ConditionBuilder::attack_with(AttackDamageHand::MainHand)
            .build(&BuildParameters::default())
            .unwrap();
        let err = (built.stat_converter)(StatBuilder::from_identity("Life")).err();
        assert_eq!(
            err,
            Some(CompileError::TypeMismatch {
                combinator: "AttackWith(MainHand)".into(),
                stat: "Life".into(),
            })
        );
    }

    #[test]
    fn test_negating_for_entity_fails_at_build() {
        let negated = ConditionBuilder::for_entity(EntityBuilder::from(Entity::Enemy)).not();
        assert!(matches!(
            negated.build(&BuildParameters::default()),
            Err(CompileError::UnsupportedNegation(_))
        ));
    }

    #[test]
    fn test_keyword_condition_resolves_reference() {
        use crate::builders::references::{Reference, Resolvable};
        use crate::game::Keyword;

        let condition = ConditionBuilder::with_keyword(Resolvable::keyword(0)).not();
        let context = ResolveContext::new(vec![], vec![Reference::Keyword(Keyword::Melee)]);
        let resolved = condition.resolve(&context).unwrap();
        assert_eq!(resolved.label(), "!With(Melee)");

        let melee = Stat::active_skill_has_keyword(Entity::Character, Keyword::Melee);
        let using_melee = StatContext::new().with(melee, true);
        assert!(!truth(&resolved, &using_melee));
        assert!(truth(&resolved, &StatContext::new()));
    }
}
