//! Stat builders.
//!
//! A [`StatBuilder`] describes which stats a modifier applies to. Building it
//! can yield several stats, one per entity or damage type, together with the
//! condition and value conversion that apply to them. Damage-only
//! combinators (hand, damage source, skills) check at call time that the
//! builder describes damage and fail with [`CompileError::TypeMismatch`]
//! otherwise.

use crate::builders::conditions::ConditionBuilder;
use crate::builders::entities::EntityBuilder;
use crate::builders::references::{
    AilmentBuilder, ChargeTypeBuilder, DamageTypeBuilder, ResolveContext, Resolvable,
};
use crate::builders::values::{
    compose_value_converters, identity_value_converter, CoreValueBuilder, ValueBuilder,
    ValueConverter,
};
use crate::error::CompileError;
use crate::formula::{ConditionalValue, FunctionalValue, StatValue, ValueRef};
use crate::game::{AttackDamageHand, DamageSource, DamageType, Entity};
use crate::modifier::BuildParameters;
use crate::source::ModifierSource;
use crate::stat::{Stat, StatKind};
use crate::value::{sum, NodeValueExt};
use std::fmt;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Stats produced by one branch of a stat builder.
#[derive(Clone)]
pub struct StatBuilderResult {
    pub stats: Vec<Stat>,
    pub source: ModifierSource,
    /// Applied to the modifier's value before it is built.
    pub value_converter: ValueConverter,
    pub condition: Option<ValueRef>,
}

impl fmt::Debug for StatBuilderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatBuilderResult")
            .field("stats", &self.stats)
            .field("source", &self.source)
            .field("condition", &self.condition)
            .finish()
    }
}

/// Core behaviour behind a [`StatBuilder`].
pub trait CoreStatBuilder: Send + Sync {
    /// Bind placeholders; `None` if there are none.
    fn resolve(&self, context: &ResolveContext) -> Result<Option<StatBuilder>, CompileError>;

    /// The same stats, owned by `entity`.
    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder;

    fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError>;

    fn label(&self) -> String;

    fn is_damage_related(&self) -> bool {
        false
    }

    /// Children, if this is a composite.
    fn children(&self) -> Option<&[StatBuilder]> {
        None
    }
}

/// A shareable, immutable stat builder.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::StatBuilder;
/// use zzmod::game::{AttackDamageHand, DamageType, Entity};
/// use zzmod::BuildParameters;
///
/// let damage = StatBuilder::damage(DamageType::Fire)
///     .with_hand(AttackDamageHand::MainHand, "AttackWith(MainHand)")
///     .unwrap();
/// let results = damage.build(&BuildParameters::default()).unwrap();
/// assert_eq!(results[0].stats[0].identity.as_str(), "Fire.Damage.MainHand");
///
/// let life = StatBuilder::from_identity("Life");
/// assert!(life.with_hand(AttackDamageHand::MainHand, "AttackWith(MainHand)").is_err());
/// ```
#[derive(Clone)]
pub struct StatBuilder(Arc<dyn CoreStatBuilder>);

impl StatBuilder {
    pub fn new(core: impl CoreStatBuilder + 'static) -> Self {
        Self(Arc::new(core))
    }

    /// A stat owned by the modifier source's entity.
    pub fn from_identity(identity: impl Into<String>) -> Self {
        Self::new(LeafStatBuilder {
            identity: Resolvable::Known(identity.into()),
            entity: EntityBuilder::ModifierSourceEntity,
            kind: None,
            damage: false,
        })
    }

    /// Exactly `stat`.
    pub fn from_stat(stat: Stat) -> Self {
        Self::new(LeafStatBuilder {
            identity: Resolvable::Known(stat.identity.as_str().to_string()),
            entity: EntityBuilder::from(stat.entity),
            kind: stat.kind,
            damage: false,
        })
    }

    /// Stats computed from the build parameters, one set per entity.
    pub fn from_parameters(
        label: impl Into<String>,
        entity: EntityBuilder,
        stats: impl Fn(&BuildParameters, Entity) -> Vec<Stat> + Send + Sync + 'static,
    ) -> Self {
        Self::new(ParameterStatBuilder {
            label: label.into(),
            entity,
            stats: Arc::new(stats),
        })
    }

    /// `{type}.Damage`.
    pub fn damage(damage_type: impl Into<DamageTypeBuilder>) -> Self {
        Self::new(LeafStatBuilder {
            identity: damage_type.into().map(|t| format!("{}.Damage", t)),
            entity: EntityBuilder::ModifierSourceEntity,
            kind: None,
            damage: true,
        })
    }

    /// One builder per damage type, combined.
    pub fn for_each_damage_type(build: impl Fn(DamageType) -> StatBuilder) -> Self {
        Self::combine(DamageType::iter().map(build).collect())
    }

    /// Damage of every type.
    pub fn all_damage() -> Self {
        Self::for_each_damage_type(StatBuilder::damage)
    }

    /// `{ailment}.Chance`.
    pub fn ailment_chance(ailment: impl Into<AilmentBuilder>) -> Self {
        Self::new(LeafStatBuilder {
            identity: ailment.into().map(|a| format!("{}.Chance", a)),
            entity: EntityBuilder::ModifierSourceEntity,
            kind: Some(StatKind::Float),
            damage: false,
        })
    }

    /// `{charge}.Charge.Maximum`.
    pub fn charge_maximum(charge_type: impl Into<ChargeTypeBuilder>) -> Self {
        Self::new(LeafStatBuilder {
            identity: charge_type.into().map(|c| format!("{}.Charge.Maximum", c)),
            entity: EntityBuilder::ModifierSourceEntity,
            kind: Some(StatKind::Integer),
            damage: false,
        })
    }

    /// Placeholder for the stat reference at `index`.
    pub fn reference(index: usize) -> Self {
        Self::new(ReferenceStatBuilder {
            index,
            entity: None,
        })
    }

    /// Several builders as one.
    pub fn combine(builders: Vec<StatBuilder>) -> Self {
        let mut flattened = Vec::with_capacity(builders.len());
        for builder in builders {
            match builder.0.children() {
                Some(children) => flattened.extend(children.iter().cloned()),
                None => flattened.push(builder),
            }
        }
        if flattened.len() == 1 {
            if let Some(single) = flattened.pop() {
                return single;
            }
        }
        Self::new(CompositeStatBuilder(flattened))
    }

    pub fn combine_with(&self, other: &StatBuilder) -> Self {
        Self::combine(vec![self.clone(), other.clone()])
    }

    pub fn for_entity(&self, entity: impl Into<EntityBuilder>) -> Self {
        self.0.with_entity(&entity.into())
    }

    /// Attach `condition` to every stat this builds.
    pub fn with_condition(&self, condition: ConditionBuilder) -> Self {
        Self::new(ConditionalStatBuilder {
            inner: self.clone(),
            condition,
        })
    }

    /// Convert modifier values applied to these stats.
    pub fn with_value_converter(&self, converter: ValueConverter) -> Self {
        Self::new(ValueConvertingStatBuilder {
            inner: self.clone(),
            converter,
        })
    }

    fn require_damage(&self, combinator: &str) -> Result<(), CompileError> {
        if self.is_damage_related() {
            Ok(())
        } else {
            Err(CompileError::TypeMismatch {
                combinator: combinator.to_string(),
                stat: self.label(),
            })
        }
    }

    fn suffixed(&self, suffix: String, kind: Option<StatKind>, damage: bool) -> Self {
        Self::new(SuffixStatBuilder {
            inner: self.clone(),
            suffix,
            kind,
            damage,
        })
    }

    /// Damage dealt with `hand`.
    pub fn with_hand(&self, hand: AttackDamageHand, combinator: &str) -> Result<Self, CompileError> {
        self.require_damage(combinator)?;
        Ok(self.suffixed(hand.to_string(), None, true))
    }

    /// Damage from `source`.
    pub fn with_damage_source(
        &self,
        source: DamageSource,
        combinator: &str,
    ) -> Result<Self, CompileError> {
        self.require_damage(combinator)?;
        Ok(self.suffixed(source.to_string(), None, true))
    }

    /// Damage dealt by skills.
    pub fn with_skills(&self, combinator: &str) -> Result<Self, CompileError> {
        self.require_damage(combinator)?;
        Ok(self.suffixed("Skill".to_string(), None, true))
    }

    /// Chance to deal double of this damage.
    pub fn chance_to_double(&self) -> Result<Self, CompileError> {
        self.require_damage("ChanceToDouble")?;
        Ok(self.suffixed(
            "ChanceToDouble".to_string(),
            Some(StatKind::Float),
            false,
        ))
    }

    /// The summed totals of the built stats.
    pub fn value(&self) -> ValueBuilder {
        ValueBuilder::new(StatValueBuilder { stat: self.clone() })
    }

    pub fn resolve(&self, context: &ResolveContext) -> Result<StatBuilder, CompileError> {
        Ok(self.0.resolve(context)?.unwrap_or_else(|| self.clone()))
    }

    pub fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        self.0.build(parameters)
    }

    pub fn label(&self) -> String {
        self.0.label()
    }

    pub fn is_damage_related(&self) -> bool {
        self.0.is_damage_related()
    }

    pub fn ptr_eq(&self, other: &StatBuilder) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StatBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatBuilder({})", self.label())
    }
}

impl From<Stat> for StatBuilder {
    fn from(stat: Stat) -> Self {
        StatBuilder::from_stat(stat)
    }
}

fn single_result(stats: Vec<Stat>, parameters: &BuildParameters) -> StatBuilderResult {
    StatBuilderResult {
        stats,
        source: parameters.modifier_source.clone(),
        value_converter: identity_value_converter(),
        condition: None,
    }
}

struct LeafStatBuilder {
    identity: Resolvable<String>,
    entity: EntityBuilder,
    kind: Option<StatKind>,
    damage: bool,
}

impl CoreStatBuilder for LeafStatBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<StatBuilder>, CompileError> {
        if self.identity.is_resolved() {
            return Ok(None);
        }
        Ok(Some(StatBuilder::new(LeafStatBuilder {
            identity: self.identity.resolve(context)?,
            entity: self.entity.clone(),
            kind: self.kind,
            damage: self.damage,
        })))
    }

    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder {
        StatBuilder::new(LeafStatBuilder {
            identity: self.identity.clone(),
            entity: entity.clone(),
            kind: self.kind,
            damage: self.damage,
        })
    }

    fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        let identity = self.identity.get()?;
        let stats = self
            .entity
            .build(parameters)
            .into_iter()
            .map(|entity| {
                let stat = Stat::new(identity.as_str(), entity);
                match self.kind {
                    Some(kind) => stat.with_kind(kind),
                    None => stat,
                }
            })
            .collect();
        Ok(vec![single_result(stats, parameters)])
    }

    fn label(&self) -> String {
        match &self.entity {
            EntityBuilder::ModifierSourceEntity => self.identity.label(),
            entity => format!("{} ({})", self.identity.label(), entity.label()),
        }
    }

    fn is_damage_related(&self) -> bool {
        self.damage
    }
}

type StatsFn = dyn Fn(&BuildParameters, Entity) -> Vec<Stat> + Send + Sync;

struct ParameterStatBuilder {
    label: String,
    entity: EntityBuilder,
    stats: Arc<StatsFn>,
}

impl CoreStatBuilder for ParameterStatBuilder {
    fn resolve(&self, _: &ResolveContext) -> Result<Option<StatBuilder>, CompileError> {
        Ok(None)
    }

    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder {
        StatBuilder::new(ParameterStatBuilder {
            label: self.label.clone(),
            entity: entity.clone(),
            stats: self.stats.clone(),
        })
    }

    fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        let stats = self
            .entity
            .build(parameters)
            .into_iter()
            .flat_map(|entity| (self.stats)(parameters, entity))
            .collect();
        Ok(vec![single_result(stats, parameters)])
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

struct ReferenceStatBuilder {
    index: usize,
    /// Entity requested before the reference was bound.
    entity: Option<EntityBuilder>,
}

impl CoreStatBuilder for ReferenceStatBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<StatBuilder>, CompileError> {
        let stat = context.reference(self.index)?.as_stat()?;
        Ok(Some(match &self.entity {
            Some(entity) => stat.for_entity(entity.clone()),
            None => stat,
        }))
    }

    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder {
        StatBuilder::new(ReferenceStatBuilder {
            index: self.index,
            entity: Some(entity.clone()),
        })
    }

    fn build(&self, _: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        Err(CompileError::UnresolvedPlaceholder(self.label()))
    }

    fn label(&self) -> String {
        format!("Stat#{}", self.index)
    }
}

/// Conjunction of two optional conditions; `None` is always true.
fn and_conditions(left: Option<ValueRef>, right: Option<ValueRef>) -> Option<ValueRef> {
    match (left, right) {
        (Some(l), Some(r)) => {
            let label = format!("{} && {}", l.label(), r.label());
            Some(Arc::new(ConditionalValue::new(
                vec![l, r],
                |vs| vs[0].is_true() && vs[1].is_true(),
                label,
            )))
        }
        (l, r) => l.or(r),
    }
}

struct ConditionalStatBuilder {
    inner: StatBuilder,
    condition: ConditionBuilder,
}

impl CoreStatBuilder for ConditionalStatBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<StatBuilder>, CompileError> {
        let inner = self.inner.resolve(context)?;
        let condition = self.condition.resolve(context)?;
        if inner.ptr_eq(&self.inner) && condition.ptr_eq(&self.condition) {
            return Ok(None);
        }
        Ok(Some(inner.with_condition(condition)))
    }

    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder {
        self.inner
            .for_entity(entity.clone())
            .with_condition(self.condition.clone())
    }

    fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        let condition = self.condition.build(parameters)?;
        let converted = (condition.stat_converter)(self.inner.clone())?;
        Ok(converted
            .build(parameters)?
            .into_iter()
            .map(|mut result| {
                result.condition = and_conditions(result.condition, condition.value.clone());
                result
            })
            .collect())
    }

    fn label(&self) -> String {
        format!("{} if {}", self.inner.label(), self.condition.label())
    }

    fn is_damage_related(&self) -> bool {
        self.inner.is_damage_related()
    }
}

struct CompositeStatBuilder(Vec<StatBuilder>);

impl CoreStatBuilder for CompositeStatBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<StatBuilder>, CompileError> {
        let resolved = self
            .0
            .iter()
            .map(|b| b.resolve(context))
            .collect::<Result<Vec<_>, _>>()?;
        if resolved.iter().zip(&self.0).all(|(r, b)| r.ptr_eq(b)) {
            return Ok(None);
        }
        Ok(Some(StatBuilder::combine(resolved)))
    }

    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder {
        StatBuilder::combine(self.0.iter().map(|b| b.for_entity(entity.clone())).collect())
    }

    fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        let mut results = Vec::new();
        for builder in &self.0 {
            results.extend(builder.build(parameters)?);
        }
        Ok(results)
    }

    fn label(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(|b| b.label()).collect();
        format!("[{}]", parts.join(", "))
    }

    fn is_damage_related(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|b| b.is_damage_related())
    }

    fn children(&self) -> Option<&[StatBuilder]> {
        Some(&self.0)
    }
}

struct ValueConvertingStatBuilder {
    inner: StatBuilder,
    converter: ValueConverter,
}

impl CoreStatBuilder for ValueConvertingStatBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<StatBuilder>, CompileError> {
        let inner = self.inner.resolve(context)?;
        if inner.ptr_eq(&self.inner) {
            return Ok(None);
        }
        Ok(Some(inner.with_value_converter(self.converter.clone())))
    }

    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder {
        self.inner
            .for_entity(entity.clone())
            .with_value_converter(self.converter.clone())
    }

    fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        Ok(self
            .inner
            .build(parameters)?
            .into_iter()
            .map(|mut result| {
                result.value_converter =
                    compose_value_converters(result.value_converter, self.converter.clone());
                result
            })
            .collect())
    }

    fn label(&self) -> String {
        self.inner.label()
    }

    fn is_damage_related(&self) -> bool {
        self.inner.is_damage_related()
    }
}

struct SuffixStatBuilder {
    inner: StatBuilder,
    suffix: String,
    kind: Option<StatKind>,
    damage: bool,
}

impl CoreStatBuilder for SuffixStatBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<StatBuilder>, CompileError> {
        let inner = self.inner.resolve(context)?;
        if inner.ptr_eq(&self.inner) {
            return Ok(None);
        }
        Ok(Some(inner.suffixed(self.suffix.clone(), self.kind, self.damage)))
    }

    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder {
        self.inner
            .for_entity(entity.clone())
            .suffixed(self.suffix.clone(), self.kind, self.damage)
    }

    fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        Ok(self
            .inner
            .build(parameters)?
            .into_iter()
            .map(|mut result| {
                result.stats = result
                    .stats
                    .iter()
                    .map(|s| s.with_suffix(&self.suffix, self.kind.or(s.kind)))
                    .collect();
                result
            })
            .collect())
    }

    fn label(&self) -> String {
        format!("{}.{}", self.inner.label(), self.suffix)
    }

    fn is_damage_related(&self) -> bool {
        self.damage
    }
}

/// Lookup of the totals of the stats a builder produces.
struct StatValueBuilder {
    stat: StatBuilder,
}

impl CoreValueBuilder for StatValueBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        let stat = self.stat.resolve(context)?;
        if stat.ptr_eq(&self.stat) {
            return Ok(None);
        }
        Ok(Some(stat.value()))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError> {
        let mut values: Vec<ValueRef> = Vec::new();
        for result in self.stat.build(parameters)? {
            for stat in result.stats {
                let lookup: ValueRef = Arc::new(StatValue::total(stat));
                values.push(match &result.condition {
                    None => lookup,
                    Some(condition) => {
                        let label = format!("({} if {})", lookup.label(), condition.label());
                        Arc::new(FunctionalValue::new(
                            vec![lookup, condition.clone()],
                            |vs| if vs[1].is_true() { vs[0] } else { None },
                            label,
                        ))
                    }
                });
            }
        }
        if values.len() == 1 {
            if let Some(single) = values.pop() {
                return Ok(single);
            }
        }
        Ok(Arc::new(FunctionalValue::new(
            values,
            |vs| sum(vs.iter().copied()),
            self.label(),
        )))
    }

    fn label(&self) -> String {
        self.stat.label()
    }
}
