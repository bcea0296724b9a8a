//! Form builders.
//!
//! Game text has more words for forms than [`Form`] has variants: "reduced"
//! is a negated increase and "less" a negated more. A `FormBuilder` carries
//! the form together with the value conversion the word implies.

use crate::builders::values::{identity_value_converter, ValueBuilder, ValueConverter};
use crate::form::Form;
use std::fmt;
use std::sync::Arc;

/// A form plus the conversion applied to the modifier's value.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::{FormBuilder, ValueBuilder};
/// use zzmod::context::EmptyContext;
/// use zzmod::{BuildParameters, Form, NodeValue};
///
/// let (form, convert) = FormBuilder::reduce().build();
/// assert_eq!(form, Form::Increase);
/// let value = convert(ValueBuilder::from(10.0)).build(&BuildParameters::default()).unwrap();
/// assert_eq!(value.calculate(&EmptyContext), Some(NodeValue::from(-10.0)));
/// ```
#[derive(Clone)]
pub struct FormBuilder {
    form: Form,
    value_converter: ValueConverter,
    label: &'static str,
}

impl FormBuilder {
    fn plain(form: Form, label: &'static str) -> Self {
        Self {
            form,
            value_converter: identity_value_converter(),
            label,
        }
    }

    fn negated(form: Form, label: &'static str) -> Self {
        Self {
            form,
            value_converter: Arc::new(|value: ValueBuilder| value.negate()),
            label,
        }
    }

    pub fn base_override() -> Self {
        Self::plain(Form::BaseOverride, "BaseOverride")
    }

    pub fn base_set() -> Self {
        Self::plain(Form::BaseSet, "BaseSet")
    }

    pub fn base_add() -> Self {
        Self::plain(Form::BaseAdd, "BaseAdd")
    }

    /// "-x to", a negated base add.
    pub fn base_subtract() -> Self {
        Self::negated(Form::BaseAdd, "BaseSubtract")
    }

    pub fn increase() -> Self {
        Self::plain(Form::Increase, "PercentIncrease")
    }

    /// "reduced", a negated increase.
    pub fn reduce() -> Self {
        Self::negated(Form::Increase, "PercentReduce")
    }

    pub fn more() -> Self {
        Self::plain(Form::More, "PercentMore")
    }

    /// "less", a negated more.
    pub fn less() -> Self {
        Self::negated(Form::More, "PercentLess")
    }

    pub fn total_override() -> Self {
        Self::plain(Form::TotalOverride, "TotalOverride")
    }

    pub fn form(&self) -> Form {
        self.form
    }

    pub fn build(&self) -> (Form, ValueConverter) {
        (self.form, self.value_converter.clone())
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl fmt::Debug for FormBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormBuilder({})", self.label)
    }
}
