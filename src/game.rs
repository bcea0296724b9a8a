//! Closed game-model enums.
//!
//! These are the value sets that builders and referenced matchers work with:
//! the entities that own stats, skill keywords, damage types and so on.
//! All of them render and parse through `strum` so stat identities and data
//! tables can use their plain names.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// An entity that owns stats.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Entity {
    /// The player character.
    #[default]
    Character,
    /// Enemies of the character.
    Enemy,
    /// Minions summoned by the character.
    Minion,
    /// Totems placed by the character.
    Totem,
}

/// Skill keyword used to filter buffs and skills.
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
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Keyword {
    Attack,
    Spell,
    Projectile,
    AreaOfEffect,
    Melee,
    Totem,
    Curse,
    Trap,
    Movement,
    Mine,
    Vaal,
    Aura,
    Golem,
    Minion,
    Warcry,
    Herald,
    Offering,
    CounterAttack,
    Physical,
    Lightning,
    Cold,
    Fire,
    Chaos,
}

/// Damage type.
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
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum DamageType {
    Physical,
    Lightning,
    Cold,
    Fire,
    Chaos,
}

/// Where damage originates.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum DamageSource {
    Attack,
    Spell,
    Secondary,
    OverTime,
}

/// The hand an attack is performed with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum AttackDamageHand {
    MainHand,
    OffHand,
}

/// Ailment inflicted by hits.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Ailment {
    Ignite,
    Shock,
    Chill,
    Freeze,
    Bleed,
    Poison,
}

/// Charge type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ChargeType {
    Endurance,
    Frenzy,
    Power,
}

/// Equipment slot an item modifier comes from.
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
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ItemSlot {
    MainHand,
    OffHand,
    Helm,
    BodyArmour,
    Gloves,
    Boots,
    Belt,
    Ring,
    Ring2,
    Amulet,
}

/// Static description of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Textual id, also used as the buff identity for buff skills.
    pub id: String,
    /// Numeric id compared against the active skill stat.
    pub numeric_id: u32,
    pub keywords: Vec<Keyword>,
    /// Whether using the skill grants a buff.
    #[serde(default)]
    pub provides_buff: bool,
}

impl SkillDefinition {
    pub fn new(id: impl Into<String>, numeric_id: u32, keywords: Vec<Keyword>) -> Self {
        Self {
            id: id.into(),
            numeric_id,
            keywords,
            provides_buff: false,
        }
    }

    pub fn providing_buff(mut self) -> Self {
        self.provides_buff = true;
        self
    }
}
