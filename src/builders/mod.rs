//! The builder DSL.
//!
//! Matcher tables describe what a line means with builders: stats, values,
//! conditions, forms and buffs. Builders are immutable and cheap to clone;
//! every combinator returns a new builder sharing its operands.
//!
//! A builder tree taken from a table may contain placeholders. After a regex
//! matched, [`ModifierBuilder::resolve`] binds them to the captured values
//! and references, and [`ModifierBuilder::build`] turns the result into
//! [`Modifier`](crate::Modifier)s.

pub mod buffs;
pub mod conditions;
pub mod entities;
pub mod forms;
pub mod intermediate;
pub mod references;
pub mod stats;
pub mod values;

pub use buffs::{BuffBuilder, BuffBuilderCollection, BuffBuilderWithKeywords, BuffBuilders};
pub use conditions::{ConditionBuildResult, ConditionBuilder, CompositeKind, StatConverter};
pub use entities::EntityBuilder;
pub use forms::FormBuilder;
pub use intermediate::{ModifierBuilder, ModifierBuilderEntry};
pub use references::{
    ActionBuilder, AilmentBuilder, ChargeTypeBuilder, DamageTypeBuilder, ItemSlotBuilder,
    KeywordBuilder, Reference, ResolveContext, Resolvable, SkillBuilder,
};
pub use stats::{StatBuilder, StatBuilderResult};
pub use values::{ValueBuilder, ValueConverter};
