//! # zzmod - Stat Modifier Compilation and Evaluation
//!
//! The engine of a game build planner: it turns modifier text such as
//! `"+42 to maximum Life"` into executable formulas and keeps track of which
//! formulas currently apply to which stat.
//!
//! ## Core Concepts
//!
//! ### Pipeline
//!
//! ```text
//! line → [matcher tables] → builders → [resolve] → [build] → Modifier
//!      → [StatDependencyGraph] → evaluation on demand
//! ```
//!
//! 1. **Matchers** pick the longest regex match of a table and hand back
//!    a builder template plus the captured groups.
//! 2. **Builders** describe stats, values, conditions, forms and buffs.
//!    They are immutable; placeholders in them are bound to the captures
//!    during resolution.
//! 3. **Build** turns resolved builders into [`Modifier`]s for a given
//!    source: stat, form, value formula and optional condition.
//! 4. **The dependency graph** holds registered modifiers per stat node
//!    and notifies observers, coalescing bulk changes into one refresh.
//! 5. **Formulas** are evaluated lazily against a
//!    [`ValueCalculationContext`]. Absent values propagate instead of
//!    turning into zero.
//!
//! ## Example
//!
//! ```rust
//! use zzmod::builders::{FormBuilder, ModifierBuilder, StatBuilder, ValueBuilder};
//! use zzmod::dependency::StatDependencyGraph;
//! use zzmod::game::Entity;
//! use zzmod::parsing::{CoreParser, MatcherData, ParsingData, ParsingStep, StatMatchers};
//! use zzmod::path::{NodeType, PathDefinition};
//! use zzmod::source::ModifierSource;
//! use zzmod::stat::Stat;
//! use zzmod::NodeValue;
//!
//! let placeholder_form = |form: FormBuilder| {
//!     ModifierBuilder::new()
//!         .with_form(form).unwrap()
//!         .with_stat(StatBuilder::from_identity("Life")).unwrap()
//!         .with_value(ValueBuilder::placeholder(0)).unwrap()
//! };
//! let mut data = ParsingData::default();
//! data.stat_matchers.insert(
//!     ParsingStep::FormAndStat,
//!     StatMatchers::new(vec![
//!         MatcherData::new("# to maximum life", placeholder_form(FormBuilder::base_add())),
//!         MatcherData::new("#% increased maximum life", placeholder_form(FormBuilder::increase())),
//!     ]),
//! );
//! let parser = CoreParser::new(data).unwrap();
//!
//! let mut graph = StatDependencyGraph::new();
//! for line in ["+40 to maximum Life", "+60 to maximum Life", "50% increased maximum Life"] {
//!     let result = parser.parse(line, ModifierSource::Global, Entity::Character);
//!     graph.register_all(result.modifiers().to_vec());
//! }
//!
//! let life = Stat::new("Life", Entity::Character);
//! let total = graph.value(&life, NodeType::Total, &PathDefinition::MainPath).unwrap();
//! assert_eq!(total, Some(NodeValue::from(150.0)));
//! ```
//!
//! ## Modules
//!
//! - [`builders`] - The builder DSL and placeholder resolution
//! - [`parsing`] - Matcher tables, regex expansion and the parser stack
//! - [`modifier`] - Built modifiers and build parameters
//! - [`formula`] - Value formulas and their evaluation
//! - [`dependency`] - Registered modifiers per stat node and totals
//! - [`collections`] - Counted node collections and event coalescing
//! - [`graph`] - Dependency graph with cycle detection
//! - [`data`] - Loading lookup tables and stat replacers from JSON
//! - [`error`] - Error types

pub mod builders;
pub mod collections;
pub mod context;
pub mod data;
pub mod dependency;
pub mod error;
pub mod form;
pub mod formula;
pub mod game;
pub mod graph;
pub mod modifier;
pub mod parsing;
pub mod path;
pub mod source;
pub mod stat;
pub mod stat_id;
pub mod value;

pub use context::{StatContext, ValueCalculationContext};
pub use error::CompileError;
pub use form::Form;
pub use modifier::{BuildParameters, Modifier};
pub use stat::Stat;
pub use stat_id::StatId;
pub use value::NodeValue;
