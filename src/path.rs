//! Aggregation paths and node types.
//!
//! A stat's value is assembled from several nodes (base, increase, more,
//! total, ...). A `PathDefinition` selects which aggregation path those
//! nodes belong to: the main path, or a conversion path whose values
//! originate from another source.

use crate::source::ModifierSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter};

/// One aggregation path through the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PathDefinition {
    /// The path every modifier lands on unless stated otherwise.
    #[default]
    MainPath,
    /// Values converted from another source.
    Conversion(ModifierSource),
}

impl PathDefinition {
    pub fn is_main_path(&self) -> bool {
        matches!(self, PathDefinition::MainPath)
    }
}

impl fmt::Display for PathDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathDefinition::MainPath => write!(f, "MainPath"),
            PathDefinition::Conversion(source) => write!(f, "Conversion({})", source),
        }
    }
}

/// Kind of value asked of a stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum NodeType {
    /// Final value after overrides and caps.
    Total,
    /// Value before the total override.
    Subtotal,
    /// Subtotal before caps are applied.
    UncappedSubtotal,
    TotalOverride,
    /// Base value: override, or set plus added.
    Base,
    BaseOverride,
    BaseSet,
    BaseAdd,
    /// Sum of percentage increases.
    Increase,
    /// Product of percentage "more" multipliers.
    More,
}
