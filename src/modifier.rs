//! Compiled modifiers.
//!
//! A `Modifier` is the output of the build phase: one contribution of a
//! value formula to one stat in one form, optionally gated by a condition.

use crate::context::ValueCalculationContext;
use crate::form::Form;
use crate::formula::ValueRef;
use crate::game::Entity;
use crate::path::PathDefinition;
use crate::source::ModifierSource;
use crate::stat::Stat;
use crate::value::{NodeValue, NodeValueExt};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Context under which a builder tree becomes concrete modifiers.
///
/// # Examples
///
/// ```rust
/// use zzmod::BuildParameters;
/// use zzmod::game::Entity;
/// use zzmod::source::ModifierSource;
///
/// let params = BuildParameters::new(ModifierSource::Global, Entity::Character);
/// assert!(params.path.is_main_path());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BuildParameters {
    pub modifier_source: ModifierSource,
    pub modifier_source_entity: Entity,
    pub path: PathDefinition,
}

impl BuildParameters {
    /// Parameters on the main path.
    pub fn new(modifier_source: ModifierSource, modifier_source_entity: Entity) -> Self {
        Self {
            modifier_source,
            modifier_source_entity,
            path: PathDefinition::MainPath,
        }
    }

    pub fn with_path(mut self, path: PathDefinition) -> Self {
        self.path = path;
        self
    }
}

/// One compiled contribution to a stat.
///
/// Two modifiers are equal when they target the same stat with the same form
/// and source and share the same formula instances. Formulas are compared by
/// identity, not structure.
#[derive(Debug, Clone)]
pub struct Modifier {
    pub stat: Stat,
    pub form: Form,
    pub value: ValueRef,
    pub condition: Option<ValueRef>,
    pub source: ModifierSource,
}

impl Modifier {
    pub fn new(stat: Stat, form: Form, value: ValueRef, source: ModifierSource) -> Self {
        Self {
            stat,
            form,
            value,
            condition: None,
            source,
        }
    }

    pub fn with_condition(mut self, condition: ValueRef) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Evaluate the modifier.
    ///
    /// If the condition is false the result is absent, not zero.
    pub fn evaluate(&self, context: &dyn ValueCalculationContext) -> Option<NodeValue> {
        if let Some(condition) = &self.condition {
            if !condition.calculate(context).is_true() {
                return None;
            }
        }
        self.value.calculate(context)
    }

    /// Stats the value and condition read.
    pub fn dependencies(&self) -> Vec<Stat> {
        let mut stats = self.value.stats();
        if let Some(condition) = &self.condition {
            stats.extend(condition.stats());
        }
        stats
    }
}

fn formula_address(value: &ValueRef) -> *const () {
    Arc::as_ptr(value) as *const ()
}

impl PartialEq for Modifier {
    fn eq(&self, other: &Self) -> bool {
        self.stat == other.stat
            && self.form == other.form
            && self.source == other.source
            && formula_address(&self.value) == formula_address(&other.value)
            && self.condition.as_ref().map(formula_address)
                == other.condition.as_ref().map(formula_address)
    }
}

impl Eq for Modifier {}

impl Hash for Modifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.stat.hash(state);
        self.form.hash(state);
        self.source.hash(state);
        formula_address(&self.value).hash(state);
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.stat, self.form, self.value.label())?;
        if let Some(condition) = &self.condition {
            write!(f, " if {}", condition.label())?;
        }
        Ok(())
    }
}
