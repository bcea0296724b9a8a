//! Modifier forms.

use crate::path::NodeType;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a modifier's value contributes to its stat.
///
/// # Examples
///
/// ```rust
/// use zzmod::Form;
/// use zzmod::path::NodeType;
///
/// assert_eq!(Form::Increase.node_type(), NodeType::Increase);
/// assert_eq!("baseadd".parse::<Form>().unwrap(), Form::BaseAdd);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Form {
    /// Replaces the base value.
    BaseOverride,
    /// Sets the base value; multiple sets are summed.
    BaseSet,
    /// Adds to the base value ("+42 to maximum Life").
    BaseAdd,
    /// Percentage increase, summed with other increases.
    Increase,
    /// Percentage multiplier, multiplied with other mores.
    More,
    /// Replaces the total value.
    TotalOverride,
}

impl Form {
    /// The node type this form's modifiers aggregate into.
    pub fn node_type(self) -> NodeType {
        match self {
            Form::BaseOverride => NodeType::BaseOverride,
            Form::BaseSet => NodeType::BaseSet,
            Form::BaseAdd => NodeType::BaseAdd,
            Form::Increase => NodeType::Increase,
            Form::More => NodeType::More,
            Form::TotalOverride => NodeType::TotalOverride,
        }
    }
}
