//! Intermediate modifiers.
//!
//! A matched line rarely describes a whole modifier in one go. The form
//! ("increased"), the stat ("maximum Life") and the condition ("while
//! moving") come from separate parsing steps, each producing a partial
//! [`ModifierBuilder`]. Those partials are merged, resolved against the
//! captures of their match, and finally built into [`Modifier`]s.
//!
//! Every entry field can be set at most once across the merge; a second
//! value is an [`CompileError::InvalidEntry`].

use crate::builders::conditions::{
    compose_converters, identity_converter, ConditionBuilder, StatConverter,
};
use crate::builders::forms::FormBuilder;
use crate::builders::references::ResolveContext;
use crate::builders::stats::StatBuilder;
use crate::builders::values::{
    compose_value_converters, identity_value_converter, CoreValueBuilder, ValueBuilder,
    ValueConverter,
};
use crate::error::CompileError;
use crate::formula::ValueRef;
use crate::modifier::{BuildParameters, Modifier};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One partial modifier.
#[derive(Clone, Default)]
pub struct ModifierBuilderEntry {
    pub form: Option<FormBuilder>,
    pub stat: Option<StatBuilder>,
    pub value: Option<ValueBuilder>,
    pub condition: Option<ConditionBuilder>,
}

impl ModifierBuilderEntry {
    fn merge(&self, other: &ModifierBuilderEntry) -> Result<Self, CompileError> {
        Ok(Self {
            form: set_once(&self.form, &other.form, "form")?,
            stat: set_once(&self.stat, &other.stat, "stat")?,
            value: set_once(&self.value, &other.value, "value")?,
            condition: match (&self.condition, &other.condition) {
                (Some(l), Some(r)) => Some(l.and(r)),
                (l, r) => l.clone().or_else(|| r.clone()),
            },
        })
    }

    fn resolve(&self, context: &ResolveContext) -> Result<Self, CompileError> {
        Ok(Self {
            form: self.form.clone(),
            stat: self.stat.as_ref().map(|s| s.resolve(context)).transpose()?,
            value: self.value.as_ref().map(|v| v.resolve(context)).transpose()?,
            condition: self
                .condition
                .as_ref()
                .map(|c| c.resolve(context))
                .transpose()?,
        })
    }
}

impl fmt::Debug for ModifierBuilderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("form", &self.form)
            .field("stat", &self.stat)
            .field("value", &self.value)
            .field("condition", &self.condition)
            .finish()
    }
}

fn set_once<T: Clone>(
    left: &Option<T>,
    right: &Option<T>,
    field: &'static str,
) -> Result<Option<T>, CompileError> {
    match (left, right) {
        (Some(_), Some(_)) => Err(CompileError::InvalidEntry(format!(
            "{} set on both sides of a merge",
            field
        ))),
        (l, r) => Ok(l.clone().or_else(|| r.clone())),
    }
}

type Slot<T> = fn(&mut ModifierBuilderEntry) -> &mut Option<T>;

/// A partial modifier: entries plus converters applied at build.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::{FormBuilder, ModifierBuilder, StatBuilder, ValueBuilder};
/// use zzmod::context::EmptyContext;
/// use zzmod::{BuildParameters, Form, NodeValue};
///
/// let form_part = ModifierBuilder::new().with_form(FormBuilder::base_add()).unwrap();
/// let stat_part = ModifierBuilder::new()
///     .with_stat(StatBuilder::from_identity("Life"))
///     .unwrap()
///     .with_value(ValueBuilder::from(42.0))
///     .unwrap();
///
/// let modifiers = form_part
///     .merge_with(&stat_part)
///     .unwrap()
///     .build(&BuildParameters::default())
///     .unwrap();
/// assert_eq!(modifiers.len(), 1);
/// assert_eq!(modifiers[0].form, Form::BaseAdd);
/// assert_eq!(modifiers[0].value.calculate(&EmptyContext), Some(NodeValue::from(42.0)));
/// ```
#[derive(Clone)]
pub struct ModifierBuilder {
    entries: Vec<ModifierBuilderEntry>,
    stat_converter: StatConverter,
    value_converter: ValueConverter,
}

impl ModifierBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            stat_converter: identity_converter(),
            value_converter: identity_value_converter(),
        }
    }

    pub fn entries(&self) -> &[ModifierBuilderEntry] {
        &self.entries
    }

    fn with_entries(&self, entries: Vec<ModifierBuilderEntry>) -> Self {
        Self {
            entries,
            stat_converter: self.stat_converter.clone(),
            value_converter: self.value_converter.clone(),
        }
    }

    /// Set a field on every entry, creating one if there are none.
    fn with_single<T: Clone>(
        &self,
        value: T,
        field: &'static str,
        slot: Slot<T>,
    ) -> Result<Self, CompileError> {
        let mut entries = if self.entries.is_empty() {
            vec![ModifierBuilderEntry::default()]
        } else {
            self.entries.clone()
        };
        for entry in &mut entries {
            let target = slot(entry);
            if target.is_some() {
                return Err(CompileError::InvalidEntry(format!("{} already set", field)));
            }
            *target = Some(value.clone());
        }
        Ok(self.with_entries(entries))
    }

    /// Set a field from a list, one value per entry.
    ///
    /// Without entries, one is created per value. A single entry is
    /// duplicated per value. Otherwise the counts must match.
    fn with_many<T: Clone>(
        &self,
        values: Vec<T>,
        field: &'static str,
        slot: Slot<T>,
    ) -> Result<Self, CompileError> {
        let mut entries = match self.entries.len() {
            0 => vec![ModifierBuilderEntry::default(); values.len()],
            1 => vec![self.entries[0].clone(); values.len()],
            n if n == values.len() => self.entries.clone(),
            n => {
                return Err(CompileError::InvalidEntry(format!(
                    "{} {}s for {} entries",
                    values.len(),
                    field,
                    n
                )))
            }
        };
        for (entry, value) in entries.iter_mut().zip(values) {
            let target = slot(entry);
            if target.is_some() {
                return Err(CompileError::InvalidEntry(format!("{} already set", field)));
            }
            *target = Some(value);
        }
        Ok(self.with_entries(entries))
    }

    pub fn with_form(&self, form: FormBuilder) -> Result<Self, CompileError> {
        self.with_single(form, "form", |e| &mut e.form)
    }

    pub fn with_forms(&self, forms: Vec<FormBuilder>) -> Result<Self, CompileError> {
        self.with_many(forms, "form", |e| &mut e.form)
    }

    pub fn with_stat(&self, stat: StatBuilder) -> Result<Self, CompileError> {
        self.with_single(stat, "stat", |e| &mut e.stat)
    }

    pub fn with_stats(&self, stats: Vec<StatBuilder>) -> Result<Self, CompileError> {
        self.with_many(stats, "stat", |e| &mut e.stat)
    }

    pub fn with_value(&self, value: ValueBuilder) -> Result<Self, CompileError> {
        self.with_single(value, "value", |e| &mut e.value)
    }

    pub fn with_values(&self, values: Vec<ValueBuilder>) -> Result<Self, CompileError> {
        self.with_many(values, "value", |e| &mut e.value)
    }

    pub fn with_condition(&self, condition: ConditionBuilder) -> Result<Self, CompileError> {
        self.with_single(condition, "condition", |e| &mut e.condition)
    }

    pub fn with_conditions(&self, conditions: Vec<ConditionBuilder>) -> Result<Self, CompileError> {
        self.with_many(conditions, "condition", |e| &mut e.condition)
    }

    /// Apply `converter` to stats after the current converter.
    pub fn with_stat_converter(&self, converter: StatConverter) -> Self {
        let mut builder = self.clone();
        builder.stat_converter = compose_converters(vec![self.stat_converter.clone(), converter]);
        builder
    }

    /// Apply `converter` to values after the current converter.
    pub fn with_value_converter(&self, converter: ValueConverter) -> Self {
        let mut builder = self.clone();
        builder.value_converter = compose_value_converters(self.value_converter.clone(), converter);
        builder
    }

    /// Merge two partial modifiers.
    ///
    /// At most one side may have several entries; the single entry of the
    /// other side is merged into each of them.
    pub fn merge_with(&self, other: &ModifierBuilder) -> Result<Self, CompileError> {
        let entries = match (self.entries.len(), other.entries.len()) {
            (0, _) => other.entries.clone(),
            (_, 0) => self.entries.clone(),
            (1, _) => other
                .entries
                .iter()
                .map(|e| self.entries[0].merge(e))
                .collect::<Result<Vec<_>, _>>()?,
            (_, 1) => self
                .entries
                .iter()
                .map(|e| e.merge(&other.entries[0]))
                .collect::<Result<Vec<_>, _>>()?,
            (l, r) => {
                return Err(CompileError::InvalidEntry(format!(
                    "can't merge {} entries with {} entries",
                    l, r
                )))
            }
        };
        Ok(Self {
            entries,
            stat_converter: compose_converters(vec![
                self.stat_converter.clone(),
                other.stat_converter.clone(),
            ]),
            value_converter: compose_value_converters(
                self.value_converter.clone(),
                other.value_converter.clone(),
            ),
        })
    }

    /// Merge all `builders` in order.
    pub fn aggregate(
        builders: impl IntoIterator<Item = ModifierBuilder>,
    ) -> Result<Self, CompileError> {
        builders
            .into_iter()
            .try_fold(ModifierBuilder::new(), |acc, b| acc.merge_with(&b))
    }

    /// Bind every placeholder of the entries and converters to `context`.
    pub fn resolve(&self, context: &ResolveContext) -> Result<Self, CompileError> {
        let entries = self
            .entries
            .iter()
            .map(|e| e.resolve(context))
            .collect::<Result<Vec<_>, _>>()?;

        let stat_converter = self.stat_converter.clone();
        let stat_context = context.clone();
        let value_converter = self.value_converter.clone();
        let value_context = context.clone();
        Ok(Self {
            entries,
            stat_converter: Arc::new(move |stat: StatBuilder| -> Result<StatBuilder, CompileError> {
                stat_converter(stat)?.resolve(&stat_context)
            }),
            value_converter: Arc::new(move |value: ValueBuilder| {
                ValueBuilder::new(ResolvingValueBuilder {
                    inner: value_converter(value),
                    context: value_context.clone(),
                })
            }),
        })
    }

    /// The stat this modifier describes, for use as a stat reference.
    ///
    /// Only a single entry with a stat and neither form nor value can stand
    /// in for a stat.
    pub fn resolve_to_referenced_builder(
        &self,
        context: &ResolveContext,
    ) -> Result<StatBuilder, CompileError> {
        let resolved = self.resolve(context)?;
        let entry = match resolved.entries.as_slice() {
            [entry] => entry,
            entries => {
                return Err(CompileError::InvalidEntry(format!(
                    "stat reference needs exactly one entry, found {}",
                    entries.len()
                )))
            }
        };
        if entry.form.is_some() || entry.value.is_some() {
            return Err(CompileError::InvalidEntry(
                "stat reference can't have a form or value".to_string(),
            ));
        }
        let stat = entry.stat.clone().ok_or_else(|| {
            CompileError::InvalidEntry("stat reference without a stat".to_string())
        })?;
        let stat = (resolved.stat_converter)(stat)?;
        Ok(match &entry.condition {
            Some(condition) => stat.with_condition(condition.clone()),
            None => stat,
        })
    }

    /// Build every complete entry into modifiers.
    ///
    /// Entries missing a form, stat or value produce nothing.
    pub fn build(&self, parameters: &BuildParameters) -> Result<Vec<Modifier>, CompileError> {
        let mut modifiers = Vec::new();
        for entry in &self.entries {
            let (form, stat, value) = match (&entry.form, &entry.stat, &entry.value) {
                (Some(form), Some(stat), Some(value)) => (form, stat, value),
                _ => {
                    debug!(entry = ?entry, "skipping incomplete modifier entry");
                    continue;
                }
            };
            let stat = match &entry.condition {
                Some(condition) => stat.with_condition(condition.clone()),
                None => stat.clone(),
            };
            let stat = (self.stat_converter)(stat)?;
            let (form, form_converter) = form.build();
            for result in stat.build(parameters)? {
                let converted =
                    form_converter((result.value_converter)((self.value_converter)(value.clone())));
                let built: ValueRef = converted.build(parameters)?;
                for stat in result.stats {
                    modifiers.push(Modifier {
                        stat,
                        form,
                        value: built.clone(),
                        condition: result.condition.clone(),
                        source: result.source.clone(),
                    });
                }
            }
        }
        debug!(count = modifiers.len(), "built modifiers");
        Ok(modifiers)
    }
}

impl Default for ModifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModifierBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierBuilder")
            .field("entries", &self.entries)
            .finish()
    }
}

/// A converted value whose placeholders bind to a captured context.
struct ResolvingValueBuilder {
    inner: ValueBuilder,
    context: ResolveContext,
}

impl CoreValueBuilder for ResolvingValueBuilder {
    fn resolve(&self, _: &ResolveContext) -> Result<Option<ValueBuilder>, CompileError> {
        Ok(Some(self.inner.resolve(&self.context)?))
    }

    fn build(&self, parameters: &BuildParameters) -> Result<ValueRef, CompileError> {
        self.inner.resolve(&self.context)?.build(parameters)
    }

    fn label(&self) -> String {
        self.inner.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::references::Reference;
    use crate::context::{EmptyContext, StatContext};
    use crate::form::Form;
    use crate::game::{Entity, Keyword};
    use crate::stat::Stat;
    use crate::value::NodeValue;

    fn params() -> BuildParameters {
        BuildParameters::default()
    }

    #[test]
    fn test_single_field_set_twice_fails() {
        let builder = ModifierBuilder::new()
            .with_form(FormBuilder::increase())
            .unwrap();
        assert!(matches!(
            builder.with_form(FormBuilder::more()),
            Err(CompileError::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_many_multiplies_single_entry() {
        let builder = ModifierBuilder::new()
            .with_form(FormBuilder::base_add())
            .unwrap()
            .with_stats(vec![
                StatBuilder::from_identity("Strength"),
                StatBuilder::from_identity("Dexterity"),
            ])
            .unwrap()
            .with_value(ValueBuilder::from(10.0))
            .unwrap();
        assert_eq!(builder.entries().len(), 2);
        let modifiers = builder.build(&params()).unwrap();
        let names: Vec<&str> = modifiers.iter().map(|m| m.stat.identity.as_str()).collect();
        assert_eq!(names, vec!["Strength", "Dexterity"]);
    }

    #[test]
    fn test_many_with_mismatched_counts_fails() {
        let builder = ModifierBuilder::new()
            .with_values(vec![1.0.into(), 2.0.into()])
            .unwrap();
        let err = builder.with_stats(vec![
            StatBuilder::from_identity("A"),
            StatBuilder::from_identity("B"),
            StatBuilder::from_identity("C"),
        ]);
        assert!(matches!(err, Err(CompileError::InvalidEntry(_))));
    }

    #[test]
    fn test_merge_ands_conditions() {
        let a = Stat::new("A", Entity::Character);
        let b = Stat::new("B", Entity::Character);
        let left = ModifierBuilder::new()
            .with_condition(ConditionBuilder::from_value(StatBuilder::from_stat(a.clone()).value()))
            .unwrap()
            .with_form(FormBuilder::base_add())
            .unwrap();
        let right = ModifierBuilder::new()
            .with_condition(ConditionBuilder::from_value(StatBuilder::from_stat(b.clone()).value()))
            .unwrap()
            .with_stat(StatBuilder::from_identity("Life"))
            .unwrap()
            .with_value(ValueBuilder::from(5.0))
            .unwrap();
        let modifiers = left.merge_with(&right).unwrap().build(&params()).unwrap();
        let modifier = &modifiers[0];

        let only_a = StatContext::new().with(a.clone(), true);
        let both = StatContext::new().with(a, true).with(b, true);
        assert_eq!(modifier.evaluate(&only_a), None);
        assert_eq!(modifier.evaluate(&both), Some(NodeValue::from(5.0)));
    }

    #[test]
    fn test_merge_with_both_sides_multiple_fails() {
        let two = ModifierBuilder::new()
            .with_values(vec![1.0.into(), 2.0.into()])
            .unwrap();
        assert!(two.merge_with(&two).is_err());
    }

    #[test]
    fn test_incomplete_entries_build_nothing() {
        let builder = ModifierBuilder::new()
            .with_stat(StatBuilder::from_identity("Life"))
            .unwrap();
        assert!(builder.build(&params()).unwrap().is_empty());
    }

    #[test]
    fn test_expansion_shares_value_formula() {
        let modifiers = ModifierBuilder::new()
            .with_form(FormBuilder::increase())
            .unwrap()
            .with_stat(StatBuilder::all_damage())
            .unwrap()
            .with_value(ValueBuilder::from(12.0))
            .unwrap()
            .build(&params())
            .unwrap();
        assert_eq!(modifiers.len(), 5);
        assert!(modifiers.iter().all(|m| m.form == Form::Increase));
        for m in &modifiers {
            assert_eq!(m.value.calculate(&EmptyContext), Some(NodeValue::from(12.0)));
        }
    }

    #[test]
    fn test_resolve_binds_converter_placeholders() {
        let builder = ModifierBuilder::new()
            .with_form(FormBuilder::base_add())
            .unwrap()
            .with_stat(StatBuilder::from_identity("Life"))
            .unwrap()
            .with_value(ValueBuilder::placeholder(0))
            .unwrap()
            .with_value_converter(Arc::new(|v: ValueBuilder| v.multiply(ValueBuilder::placeholder(1))));
        assert!(builder.build(&params()).is_err());

        let context = ResolveContext::new(vec![3.0.into(), 4.0.into()], vec![]);
        let modifiers = builder.resolve(&context).unwrap().build(&params()).unwrap();
        assert_eq!(
            modifiers[0].value.calculate(&EmptyContext),
            Some(NodeValue::from(12.0))
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let builder = ModifierBuilder::new()
            .with_form(FormBuilder::more())
            .unwrap()
            .with_stat(StatBuilder::from_identity("Damage"))
            .unwrap()
            .with_value(ValueBuilder::from(20.0))
            .unwrap();
        let context = ResolveContext::default();
        let once = builder.resolve(&context).unwrap().build(&params()).unwrap();
        let twice = builder
            .resolve(&context)
            .unwrap()
            .resolve(&context)
            .unwrap()
            .build(&params())
            .unwrap();
        let render = |ms: &[Modifier]| ms.iter().map(|m| m.to_string()).collect::<Vec<_>>();
        assert_eq!(render(&once), render(&twice));
    }

    #[test]
    fn test_referenced_builder_requires_plain_stat() {
        let stat_only = ModifierBuilder::new()
            .with_stat(StatBuilder::from_identity("Life"))
            .unwrap()
            .with_condition(ConditionBuilder::with_keyword(
                crate::builders::references::Resolvable::keyword(0),
            ))
            .unwrap();
        let context = ResolveContext::new(vec![], vec![Reference::Keyword(Keyword::Attack)]);
        let stat = stat_only.resolve_to_referenced_builder(&context).unwrap();
        let results = stat.build(&params()).unwrap();
        assert_eq!(results[0].stats, vec![Stat::new("Life", Entity::Character)]);
        assert!(results[0].condition.is_some());

        let with_value = stat_only.with_value(ValueBuilder::from(1.0)).unwrap();
        assert!(with_value.resolve_to_referenced_builder(&context).is_err());
    }
}
