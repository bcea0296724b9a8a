//! Modifier sources.
//!
//! Every modifier remembers where it came from: a passive node, an item in
//! some slot, a skill, or simply "given". The canonical source is the
//! source with its local detail stripped, which is what conversion paths
//! are keyed by.

use crate::game::ItemSlot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a modifier comes from.
///
/// # Examples
///
/// ```rust
/// use zzmod::source::{LocalSource, ModifierSource};
/// use zzmod::game::ItemSlot;
///
/// let source = ModifierSource::Local(LocalSource::Item(ItemSlot::Helm));
/// assert_eq!(source.to_string(), "Local:Item(Helm)");
/// assert_eq!(source.canonical(), ModifierSource::Global);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModifierSource {
    /// Applies regardless of origin.
    #[default]
    Global,
    /// Comes from a specific part of the build.
    Local(LocalSource),
}

/// The local part of a modifier source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalSource {
    /// Granted by the character itself (level, class).
    Given,
    /// A skilled passive tree node.
    PassiveNode(String),
    /// An equipped item.
    Item(ItemSlot),
    /// A jewel socketed into the tree.
    Jewel(String),
    /// An active or support skill.
    Skill(String),
}

impl ModifierSource {
    /// Canonical form of this source.
    pub fn canonical(&self) -> ModifierSource {
        ModifierSource::Global
    }

    /// Sources whose modifiers also affect stats from this source.
    ///
    /// Local sources are influenced by themselves and by global modifiers.
    pub fn influencing_sources(&self) -> Vec<ModifierSource> {
        match self {
            ModifierSource::Global => vec![ModifierSource::Global],
            local => vec![local.clone(), ModifierSource::Global],
        }
    }

    /// A short name usable inside stat identities.
    pub fn name(&self) -> String {
        match self {
            ModifierSource::Global => "Global".to_string(),
            ModifierSource::Local(local) => local.to_string(),
        }
    }
}

impl fmt::Display for ModifierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierSource::Global => write!(f, "Global"),
            ModifierSource::Local(local) => write!(f, "Local:{}", local),
        }
    }
}

impl fmt::Display for LocalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSource::Given => write!(f, "Given"),
            LocalSource::PassiveNode(id) => write!(f, "PassiveNode({})", id),
            LocalSource::Item(slot) => write!(f, "Item({})", slot),
            LocalSource::Jewel(id) => write!(f, "Jewel({})", id),
            LocalSource::Skill(name) => write!(f, "Skill({})", name),
        }
    }
}
