//! Buff builders.
//!
//! A buff is a named effect one entity (the source) applies to others (the
//! targets). Whether it is active, who applied it and how strong it is are
//! all plain stats:
//!
//! - `{buff}.Active` on the target
//! - `{buff}.ActiveSourceIs({source})` on the target
//! - `{buff}.EffectOn({target})` on the source
//!
//! [`BuffBuilderCollection`] selects buffs by keyword. The selection is
//! evaluated every time the collection is built, so a collection built
//! against a resolved keyword reference sees the resolved keyword.

use crate::builders::conditions::ConditionBuilder;
use crate::builders::entities::EntityBuilder;
use crate::builders::references::{KeywordBuilder, ResolveContext};
use crate::builders::stats::{CoreStatBuilder, StatBuilder, StatBuilderResult};
use crate::builders::values::{identity_value_converter, CoreValueBuilder, ValueBuilder};
use crate::error::CompileError;
use crate::formula::{ConditionalValue, CountingValue, StatValue, ValueRef};
use crate::game::{Entity, Keyword, SkillDefinition};
use crate::modifier::BuildParameters;
use crate::stat::Stat;
use crate::value::NodeValueExt;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Buffs every build knows about, independent of skills.
const BUILT_IN_BUFFS: &[&str] = &[
    "Fortify",
    "Maim",
    "Intimidate",
    "Blind",
    "Onslaught",
    "UnholyMight",
    "Tailwind",
    "CoveredInAsh",
    "ArcaneSurge",
    "Elusive",
    "Hinder",
    "Withered",
];

/// One buff, identified by name.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::BuffBuilder;
/// use zzmod::game::Entity;
/// use zzmod::BuildParameters;
///
/// let blind = BuffBuilder::new("Blind");
/// let results = blind.on(Entity::Enemy).build(&BuildParameters::default()).unwrap();
/// assert_eq!(results[0].stats[0].identity.as_str(), "Blind.Active");
/// assert_eq!(results[0].stats[0].entity, Entity::Enemy);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuffBuilder {
    identity: Arc<str>,
}

impl BuffBuilder {
    pub fn new(identity: impl AsRef<str>) -> Self {
        Self {
            identity: Arc::from(identity.as_ref()),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The flag stat saying this buff is active on `target`.
    pub fn on(&self, target: impl Into<EntityBuilder>) -> StatBuilder {
        let identity = self.identity.clone();
        StatBuilder::from_parameters(
            format!("{}.Active", self.identity),
            target.into(),
            move |_, target| vec![Stat::buff_is_active(target, &identity)],
        )
    }

    /// Holds while the buff is active on the modifier source's entity.
    pub fn is_active(&self) -> ConditionBuilder {
        ConditionBuilder::from_value(self.on(EntityBuilder::ModifierSourceEntity).value())
    }

    /// Effect of this buff applied by the modifier source on `target`.
    pub fn effect_on(&self, target: impl Into<EntityBuilder>) -> StatBuilder {
        let identity = self.identity.clone();
        let target = target.into();
        StatBuilder::from_parameters(
            format!("{}.EffectOn({})", self.identity, target.label()),
            EntityBuilder::ModifierSourceEntity,
            move |parameters, source| {
                target
                    .build(parameters)
                    .into_iter()
                    .map(|t| Stat::buff_effect(source, t, &identity))
                    .collect()
            },
        )
    }

    /// Holds if the buff on `target` was applied by `source`.
    pub fn source_is(&self, target: Entity, source: Entity) -> ConditionBuilder {
        let stat = Stat::buff_source_is(target, &self.identity, source);
        ConditionBuilder::from_value(StatBuilder::from_stat(stat).value())
    }

    /// `stat`, but only while this buff is active.
    pub fn add_stat(&self, stat: StatBuilder) -> StatBuilder {
        stat.with_condition(self.is_active())
    }

    fn counted_on(&self, target: Entity, sources: &[Entity]) -> ValueRef {
        let active: ValueRef = Arc::new(StatValue::total(Stat::buff_is_active(
            target,
            &self.identity,
        )));
        let mut operands = vec![active];
        operands.extend(sources.iter().map(|source| -> ValueRef {
            Arc::new(StatValue::total(Stat::buff_source_is(
                target,
                &self.identity,
                *source,
            )))
        }));
        let label = format!("{}.ActiveOn({}) from [{}]", self.identity, target, join(sources));
        Arc::new(ConditionalValue::new(
            operands,
            |vs| vs[0].is_true() && vs[1..].iter().any(|v| v.is_true()),
            label,
        ))
    }
}

impl fmt::Display for BuffBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

fn join(entities: &[Entity]) -> String {
    entities
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A buff together with the keywords used to select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuffBuilderWithKeywords {
    pub buff: BuffBuilder,
    pub keywords: Vec<Keyword>,
}

impl BuffBuilderWithKeywords {
    pub fn new(buff: BuffBuilder, keywords: Vec<Keyword>) -> Self {
        Self { buff, keywords }
    }
}

#[derive(Clone, Default)]
struct Restrictions {
    with: Vec<KeywordBuilder>,
    without: Vec<KeywordBuilder>,
}

impl Restrictions {
    fn resolve(&self, context: &ResolveContext) -> Result<Self, CompileError> {
        let resolve_all = |keywords: &[KeywordBuilder]| {
            keywords
                .iter()
                .map(|k| k.resolve(context))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            with: resolve_all(&self.with)?,
            without: resolve_all(&self.without)?,
        })
    }

    fn is_resolved(&self) -> bool {
        self.with.iter().chain(&self.without).all(|k| k.is_resolved())
    }

    /// Superset of every `with` keyword, disjoint from every `without`.
    fn allows(&self, keywords: &[Keyword]) -> Result<bool, CompileError> {
        for required in &self.with {
            if !keywords.contains(required.get()?) {
                return Ok(false);
            }
        }
        for excluded in &self.without {
            if keywords.contains(excluded.get()?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn label(&self) -> String {
        let mut parts = Vec::new();
        parts.extend(self.with.iter().map(|k| format!("With({})", k.label())));
        parts.extend(self.without.iter().map(|k| format!("Without({})", k.label())));
        parts.join(".")
    }
}

/// Buffs from `source` entities on `target` entities, filtered by keyword.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::{BuffBuilder, BuffBuilderCollection, BuffBuilderWithKeywords};
/// use zzmod::game::{Entity, Keyword};
///
/// let buffs = vec![
///     BuffBuilderWithKeywords::new(BuffBuilder::new("Wrath"), vec![Keyword::Aura]),
///     BuffBuilderWithKeywords::new(BuffBuilder::new("Fortify"), vec![]),
/// ];
/// let auras = BuffBuilderCollection::new(buffs, Entity::Character.into(), Entity::Character.into())
///     .with(Keyword::Aura);
/// assert_eq!(auras.buffs().unwrap(), vec![BuffBuilder::new("Wrath")]);
/// ```
#[derive(Clone)]
pub struct BuffBuilderCollection {
    buffs: Arc<Vec<BuffBuilderWithKeywords>>,
    source: EntityBuilder,
    target: EntityBuilder,
    restrictions: Restrictions,
}

impl BuffBuilderCollection {
    pub fn new(
        buffs: Vec<BuffBuilderWithKeywords>,
        source: EntityBuilder,
        target: EntityBuilder,
    ) -> Self {
        Self {
            buffs: Arc::new(buffs),
            source,
            target,
            restrictions: Restrictions::default(),
        }
    }

    /// Only buffs that have `keyword`.
    pub fn with(&self, keyword: impl Into<KeywordBuilder>) -> Self {
        let mut restricted = self.clone();
        restricted.restrictions.with.push(keyword.into());
        restricted
    }

    /// Only buffs that don't have `keyword`.
    pub fn without(&self, keyword: impl Into<KeywordBuilder>) -> Self {
        let mut restricted = self.clone();
        restricted.restrictions.without.push(keyword.into());
        restricted
    }

    pub fn resolve(&self, context: &ResolveContext) -> Result<Self, CompileError> {
        if self.restrictions.is_resolved() {
            return Ok(self.clone());
        }
        let mut resolved = self.clone();
        resolved.restrictions = self.restrictions.resolve(context)?;
        Ok(resolved)
    }

    /// The buffs passing the keyword restrictions, in declaration order.
    pub fn buffs(&self) -> Result<Vec<BuffBuilder>, CompileError> {
        let mut selected = Vec::new();
        for candidate in self.buffs.iter() {
            if self.restrictions.allows(&candidate.keywords)? {
                selected.push(candidate.buff.clone());
            }
        }
        debug!(
            restrictions = %self.restrictions.label(),
            selected = selected.len(),
            "filtered buff collection"
        );
        Ok(selected)
    }

    /// Effect stats of the selected buffs on the targets.
    pub fn effect(&self) -> StatBuilder {
        StatBuilder::new(BuffEffectStatBuilder {
            collection: self.clone(),
        })
    }

    /// Number of selected buffs active on each target with an accepted source.
    pub fn count(&self) -> ValueBuilder {
        ValueBuilder::new(BuffCountValueBuilder {
            collection: self.clone(),
        })
    }

    /// Holds if at least one selected buff is counted.
    pub fn any(&self) -> ConditionBuilder {
        self.count().greater_than(0.0)
    }

    pub fn label(&self) -> String {
        let restrictions = self.restrictions.label();
        let base = format!("Buffs({} -> {})", self.source.label(), self.target.label());
        if restrictions.is_empty() {
            base
        } else {
            format!("{}.{}", base, restrictions)
        }
    }
}

impl fmt::Debug for BuffBuilderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuffBuilderCollection({})", self.label())
    }
}

struct BuffEffectStatBuilder {
    collection: BuffBuilderCollection,
}

impl CoreStatBuilder for BuffEffectStatBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<StatBuilder>, CompileError> {
        if self.collection.restrictions.is_resolved() {
            return Ok(None);
        }
        Ok(Some(self.collection.resolve(context)?.effect()))
    }

    fn with_entity(&self, entity: &EntityBuilder) -> StatBuilder {
        let mut collection = self.collection.clone();
        collection.source = entity.clone();
        collection.effect()
    }

    fn build(&self, parameters: &BuildParameters) -> Result<Vec<StatBuilderResult>, CompileError> {
        let sources = self.collection.source.build(parameters);
        let targets = self.collection.target.build(parameters);
        let mut stats = Vec::new();
        for buff in self.collection.buffs()? {
            for source in &sources {
                for target in &targets {
                    stats.push(Stat::buff_effect(*source, *target, buff.identity()));
                }
            }
        }
        Ok(vec![StatBuilderResult {
            stats,
            source: parameters.modifier_source.clone(),
            value_converter: identity_value_converter(),
            condition: None,
        }])
    }

    fn label(&self) -> String {
        format!("{}.Effect", self.collection.label())
    }
}

struct BuffCountValueBuilder {
    collection: BuffBuilderCollection,
}

impl CoreValueBuilder for BuffCountValueBuilder {
    fn resolve(&self, context: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        if self.collection.restrictions.is_resolved() {
            return Ok(None);
        }
        Ok(Some(self.collection.resolve(context)?.count()))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError> {
        let sources = self.collection.source.build(parameters);
        let targets = self.collection.target.build(parameters);
        let buffs = self.collection.buffs()?;
        let mut operands = Vec::with_capacity(targets.len() * buffs.len());
        for target in &targets {
            for buff in &buffs {
                operands.push(buff.counted_on(*target, &sources));
            }
        }
        Ok(Arc::new(CountingValue(operands)))
    }

    fn label(&self) -> String {
        format!("{}.Count", self.collection.label())
    }
}

/// Factory for buff-related stats.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::{BuffBuilders, StatBuilder, ValueBuilder};
/// use zzmod::context::StatContext;
/// use zzmod::game::Entity;
/// use zzmod::stat::Stat;
/// use zzmod::{BuildParameters, NodeValue};
///
/// let buffs = BuffBuilders::new(&[]);
/// let granted = buffs.buff(StatBuilder::from_identity("Life"), Entity::Minion);
/// let results = granted.build(&BuildParameters::default()).unwrap();
/// assert_eq!(results[0].stats, vec![Stat::new("Life", Entity::Minion)]);
///
/// let value = (results[0].value_converter)(ValueBuilder::from(10.0))
///     .build(&BuildParameters::default())
///     .unwrap();
/// let context = StatContext::new().with(Stat::new("Buff.Effect", Entity::Character), 1.5);
/// assert_eq!(value.calculate(&context), Some(NodeValue::from(15.0)));
/// ```
#[derive(Debug, Clone)]
pub struct BuffBuilders {
    all: Arc<Vec<BuffBuilderWithKeywords>>,
}

impl BuffBuilders {
    /// Built-in buffs plus one buff per skill that provides one.
    pub fn new(skills: &[SkillDefinition]) -> Self {
        let mut all: Vec<BuffBuilderWithKeywords> = BUILT_IN_BUFFS
            .iter()
            .map(|name| BuffBuilderWithKeywords::new(BuffBuilder::new(name), Vec::new()))
            .collect();
        all.extend(
            skills
                .iter()
                .filter(|skill| skill.provides_buff)
                .map(|skill| {
                    BuffBuilderWithKeywords::new(BuffBuilder::new(&skill.id), skill.keywords.clone())
                }),
        );
        Self::from_buffs(all)
    }

    /// Exactly the given buffs.
    pub fn from_buffs(buffs: Vec<BuffBuilderWithKeywords>) -> Self {
        Self {
            all: Arc::new(buffs),
        }
    }

    pub fn all(&self) -> &[BuffBuilderWithKeywords] {
        &self.all
    }

    /// Look up a buff by name.
    pub fn named(&self, identity: &str) -> Option<BuffBuilder> {
        self.all
            .iter()
            .find(|b| b.buff.identity().eq_ignore_ascii_case(identity))
            .map(|b| b.buff.clone())
    }

    /// `gained` granted to `targets`, scaled by the source's `Buff.Effect`.
    pub fn buff(&self, gained: StatBuilder, targets: impl Into<EntityBuilder>) -> StatBuilder {
        scaled(gained, targets.into(), "Buff.Effect", Stat::buff_effect_modifier)
    }

    /// `gained` granted to `targets`, scaled by the source's `Aura.Effect`.
    pub fn aura(&self, gained: StatBuilder, targets: impl Into<EntityBuilder>) -> StatBuilder {
        scaled(gained, targets.into(), "Aura.Effect", Stat::aura_effect_modifier)
    }

    /// `gained` while the modifier source's temporary effect is active,
    /// scaled by `Buff.Effect`.
    pub fn temporary(&self, gained: StatBuilder) -> StatBuilder {
        let active = ValueBuilder::from_parameters("TemporaryActive", |parameters| {
            let stat = Stat::temporary_is_active(
                parameters.modifier_source_entity,
                &parameters.modifier_source.name(),
            );
            Ok(Arc::new(StatValue::total(stat)) as ValueRef)
        });
        let effect = effect_multiplier("Buff.Effect", Stat::buff_effect_modifier);
        gained.with_value_converter(Arc::new(move |value: ValueBuilder| {
            value.multiply(effect.clone()).gated_by(active.clone())
        }))
    }

    /// All known buffs from `source` on `target`.
    pub fn buffs(
        &self,
        source: impl Into<EntityBuilder>,
        target: impl Into<EntityBuilder>,
    ) -> BuffBuilderCollection {
        BuffBuilderCollection {
            buffs: self.all.clone(),
            source: source.into(),
            target: target.into(),
            restrictions: Restrictions::default(),
        }
    }
}

fn effect_multiplier(label: &'static str, stat: fn(Entity) -> Stat) -> ValueBuilder {
    ValueBuilder::from_parameters(label, move |parameters| {
        Ok(Arc::new(StatValue::total(stat(parameters.modifier_source_entity))) as ValueRef)
    })
}

fn scaled(
    gained: StatBuilder,
    targets: EntityBuilder,
    label: &'static str,
    stat: fn(Entity) -> Stat,
) -> StatBuilder {
    let effect = effect_multiplier(label, stat);
    gained
        .for_entity(targets)
        .with_value_converter(Arc::new(move |value: ValueBuilder| value.multiply(effect.clone())))
}
