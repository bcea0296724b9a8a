//! Positional placeholders and what they resolve to.
//!
//! After a regex matched, its captured values and references are numbered
//! by position. Builders refer to them through [`Resolvable::Reference`] or
//! value placeholders; [`ResolveContext`] holds what those positions bound to.

use crate::builders::buffs::BuffBuilder;
use crate::builders::stats::StatBuilder;
use crate::builders::values::ValueBuilder;
use crate::error::CompileError;
use crate::game::{Ailment, ChargeType, DamageType, ItemSlot, Keyword, SkillDefinition};
use std::fmt;
use std::sync::Arc;

/// What a captured reference resolved to.
#[derive(Clone)]
pub enum Reference {
    Keyword(Keyword),
    Skill(SkillDefinition),
    Ailment(Ailment),
    ChargeType(ChargeType),
    DamageType(DamageType),
    ItemSlot(ItemSlot),
    Action(String),
    /// A full stat matcher, resolved to its stat builder.
    Stat(StatBuilder),
    Buff(BuffBuilder),
}

macro_rules! reference_accessor {
    ($name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        pub fn $name(&self) -> Result<$ty, CompileError> {
            match self {
                Reference::$variant(inner) => Ok(inner.clone()),
                other => Err(CompileError::ReferenceKind {
                    expected: $expected,
                    actual: other.kind_name(),
                }),
            }
        }
    };
}

impl Reference {
    /// Category name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Reference::Keyword(_) => "keyword",
            Reference::Skill(_) => "skill",
            Reference::Ailment(_) => "ailment",
            Reference::ChargeType(_) => "charge type",
            Reference::DamageType(_) => "damage type",
            Reference::ItemSlot(_) => "item slot",
            Reference::Action(_) => "action",
            Reference::Stat(_) => "stat",
            Reference::Buff(_) => "buff",
        }
    }

    reference_accessor!(as_keyword, Keyword, Keyword, "keyword");
    reference_accessor!(as_skill, Skill, SkillDefinition, "skill");
    reference_accessor!(as_ailment, Ailment, Ailment, "ailment");
    reference_accessor!(as_charge_type, ChargeType, ChargeType, "charge type");
    reference_accessor!(as_damage_type, DamageType, DamageType, "damage type");
    reference_accessor!(as_item_slot, ItemSlot, ItemSlot, "item slot");
    reference_accessor!(as_action, Action, String, "action");
    reference_accessor!(as_stat, Stat, StatBuilder, "stat");
    reference_accessor!(as_buff, Buff, BuffBuilder, "buff");
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Keyword(k) => write!(f, "Keyword({})", k),
            Reference::Skill(s) => write!(f, "Skill({})", s.id),
            Reference::Ailment(a) => write!(f, "Ailment({})", a),
            Reference::ChargeType(c) => write!(f, "ChargeType({})", c),
            Reference::DamageType(d) => write!(f, "DamageType({})", d),
            Reference::ItemSlot(i) => write!(f, "ItemSlot({})", i),
            Reference::Action(a) => write!(f, "Action({})", a),
            Reference::Stat(s) => write!(f, "Stat({})", s.label()),
            Reference::Buff(b) => write!(f, "Buff({})", b.identity()),
        }
    }
}

/// Positional bindings for one match.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::{Reference, ResolveContext, ValueBuilder};
/// use zzmod::game::Keyword;
///
/// let context = ResolveContext::new(
///     vec![ValueBuilder::from(42.0)],
///     vec![Reference::Keyword(Keyword::Aura)],
/// );
/// assert_eq!(context.reference(0).unwrap().as_keyword().unwrap(), Keyword::Aura);
/// assert!(context.value(1).is_err());
/// ```
#[derive(Clone, Default, Debug)]
pub struct ResolveContext {
    values: Arc<Vec<ValueBuilder>>,
    references: Arc<Vec<Reference>>,
}

impl ResolveContext {
    pub fn new(values: Vec<ValueBuilder>, references: Vec<Reference>) -> Self {
        Self {
            values: Arc::new(values),
            references: Arc::new(references),
        }
    }

    pub fn value(&self, index: usize) -> Result<&ValueBuilder, CompileError> {
        self.values.get(index).ok_or(CompileError::ValueIndex {
            index,
            available: self.values.len(),
        })
    }

    pub fn reference(&self, index: usize) -> Result<&Reference, CompileError> {
        self.references.get(index).ok_or(CompileError::ReferenceIndex {
            index,
            available: self.references.len(),
        })
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }
}

type Extract<T> = dyn Fn(&Reference) -> Result<T, CompileError> + Send + Sync;

/// A value that is either known or bound to a reference position.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::{Reference, ResolveContext, Resolvable};
/// use zzmod::game::Keyword;
///
/// let keyword = Resolvable::keyword(0);
/// assert!(keyword.get().is_err());
///
/// let context = ResolveContext::new(vec![], vec![Reference::Keyword(Keyword::Curse)]);
/// let resolved = keyword.resolve(&context).unwrap();
/// assert_eq!(resolved.get().unwrap(), &Keyword::Curse);
/// ```
#[derive(Clone)]
pub enum Resolvable<T> {
    Known(T),
    Reference {
        index: usize,
        extract: Arc<Extract<T>>,
        label: String,
    },
}

impl<T: Clone + Send + Sync + 'static> Resolvable<T> {
    /// Placeholder for reference `index`, read through `extract`.
    pub fn reference(
        index: usize,
        label: impl Into<String>,
        extract: impl Fn(&Reference) -> Result<T, CompileError> + Send + Sync + 'static,
    ) -> Self {
        Resolvable::Reference {
            index,
            extract: Arc::new(extract),
            label: label.into(),
        }
    }

    /// Bind against `context`. Known values return themselves.
    pub fn resolve(&self, context: &ResolveContext) -> Result<Self, CompileError> {
        match self {
            Resolvable::Known(_) => Ok(self.clone()),
            Resolvable::Reference { index, extract, .. } => {
                let reference = context.reference(*index)?;
                Ok(Resolvable::Known(extract(reference)?))
            }
        }
    }

    /// The known value; a reference still unbound is an error.
    pub fn get(&self) -> Result<&T, CompileError> {
        match self {
            Resolvable::Known(value) => Ok(value),
            Resolvable::Reference { label, .. } => {
                Err(CompileError::UnresolvedPlaceholder(label.clone()))
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolvable::Known(_))
    }

    /// Transform the eventual value.
    pub fn map<U: Clone + Send + Sync + 'static>(
        &self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Resolvable<U> {
        match self {
            Resolvable::Known(value) => Resolvable::Known(f(value.clone())),
            Resolvable::Reference {
                index,
                extract,
                label,
            } => {
                let extract = extract.clone();
                Resolvable::reference(*index, label.clone(), move |r| extract(r).map(&f))
            }
        }
    }
}

impl<T: fmt::Display> Resolvable<T> {
    pub fn label(&self) -> String {
        match self {
            Resolvable::Known(value) => value.to_string(),
            Resolvable::Reference { label, .. } => label.clone(),
        }
    }
}

impl Resolvable<Keyword> {
    pub fn keyword(index: usize) -> Self {
        Self::reference(index, format!("Keyword#{}", index), Reference::as_keyword)
    }
}

impl Resolvable<SkillDefinition> {
    pub fn skill(index: usize) -> Self {
        Self::reference(index, format!("Skill#{}", index), Reference::as_skill)
    }
}

impl Resolvable<Ailment> {
    pub fn ailment(index: usize) -> Self {
        Self::reference(index, format!("Ailment#{}", index), Reference::as_ailment)
    }
}

impl Resolvable<ChargeType> {
    pub fn charge_type(index: usize) -> Self {
        Self::reference(index, format!("ChargeType#{}", index), Reference::as_charge_type)
    }
}

impl Resolvable<DamageType> {
    pub fn damage_type(index: usize) -> Self {
        Self::reference(index, format!("DamageType#{}", index), Reference::as_damage_type)
    }
}

impl Resolvable<ItemSlot> {
    pub fn item_slot(index: usize) -> Self {
        Self::reference(index, format!("ItemSlot#{}", index), Reference::as_item_slot)
    }
}

impl Resolvable<String> {
    pub fn action(index: usize) -> Self {
        Self::reference(index, format!("Action#{}", index), Reference::as_action)
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Resolvable::Known(value)
    }
}

pub type KeywordBuilder = Resolvable<Keyword>;
pub type SkillBuilder = Resolvable<SkillDefinition>;
pub type AilmentBuilder = Resolvable<Ailment>;
pub type ChargeTypeBuilder = Resolvable<ChargeType>;
pub type DamageTypeBuilder = Resolvable<DamageType>;
pub type ItemSlotBuilder = Resolvable<ItemSlot>;
pub type ActionBuilder = Resolvable<String>;
