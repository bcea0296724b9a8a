//! Concrete stats.
//!
//! A `Stat` is one node key in the dependency graph: an identity plus the
//! entity that owns it. The associated constructors at the bottom of this
//! file produce the well-known stats that buffs and skills are wired to.

use crate::game::{Entity, Keyword};
use crate::stat_id::StatId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Numeric kind of the values a stat holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// Fractional values.
    Float,
    /// Whole numbers.
    Integer,
    /// `0` or `1`.
    Boolean,
}

/// A derived statistic owned by an entity.
///
/// Equality and hashing only look at identity and entity. The kind is a tag
/// and two stats that differ only in kind refer to the same graph node.
///
/// # Examples
///
/// ```rust
/// use zzmod::game::Entity;
/// use zzmod::stat::{Stat, StatKind};
///
/// let life = Stat::new("Life", Entity::Character);
/// let tagged = Stat::new("Life", Entity::Character).with_kind(StatKind::Integer);
/// assert_eq!(life, tagged);
/// assert_ne!(life, Stat::new("Life", Entity::Enemy));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stat {
    pub identity: StatId,
    pub entity: Entity,
    pub kind: Option<StatKind>,
}

impl Stat {
    /// Create a stat without a kind tag.
    pub fn new(identity: impl Into<StatId>, entity: Entity) -> Self {
        Self {
            identity: identity.into(),
            entity,
            kind: None,
        }
    }

    /// Return a copy tagged with `kind`.
    pub fn with_kind(mut self, kind: StatKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Derive a stat on the same entity with a suffixed identity.
    pub fn with_suffix(&self, suffix: &str, kind: Option<StatKind>) -> Self {
        Self {
            identity: self.identity.with_suffix(suffix),
            entity: self.entity,
            kind,
        }
    }

    /// `{buff}.Active` on the buff's target.
    pub fn buff_is_active(target: Entity, buff: &str) -> Self {
        Self::new(format!("{}.Active", buff), target).with_kind(StatKind::Boolean)
    }

    /// `{buff}.ActiveSourceIs({source})` on the buff's target.
    pub fn buff_source_is(target: Entity, buff: &str, source: Entity) -> Self {
        Self::new(format!("{}.ActiveSourceIs({})", buff, source), target)
            .with_kind(StatKind::Boolean)
    }

    /// `{buff}.EffectOn({target})` on the buff's source.
    pub fn buff_effect(source: Entity, target: Entity, buff: &str) -> Self {
        Self::new(format!("{}.EffectOn({})", buff, target), source)
    }

    /// The generic `Buff.Effect` multiplier.
    pub fn buff_effect_modifier(entity: Entity) -> Self {
        Self::new("Buff.Effect", entity)
    }

    /// The generic `Aura.Effect` multiplier.
    pub fn aura_effect_modifier(entity: Entity) -> Self {
        Self::new("Aura.Effect", entity)
    }

    /// Whether a temporary effect granted by `source` is currently active.
    pub fn temporary_is_active(entity: Entity, source: &str) -> Self {
        Self::new(format!("Is {} active?", source), entity).with_kind(StatKind::Boolean)
    }

    /// Id of the main skill.
    pub fn active_skill_id(entity: Entity) -> Self {
        Self::new("ActiveSkill.Id", entity).with_kind(StatKind::Integer)
    }

    /// Whether the active skill part has `keyword`.
    pub fn active_skill_has_keyword(entity: Entity, keyword: Keyword) -> Self {
        Self::new(format!("ActiveSkillPart.Has.{}", keyword), entity).with_kind(StatKind::Boolean)
    }
}

impl PartialEq for Stat {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity && self.entity == other.entity
    }
}

impl Eq for Stat {}

impl Hash for Stat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
        self.entity.hash(state);
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identity, self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_kind_does_not_affect_identity() {
        let mut set = HashSet::new();
        set.insert(Stat::new("Mana", Entity::Character));
        set.insert(Stat::new("Mana", Entity::Character).with_kind(StatKind::Float));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_suffix_keeps_entity() {
        let stat = Stat::new("Fire.Damage", Entity::Minion);
        let derived = stat.with_suffix("Spell", None);
        assert_eq!(derived.identity.as_str(), "Fire.Damage.Spell");
        assert_eq!(derived.entity, Entity::Minion);
    }

    #[test]
    fn test_buff_stat_identities() {
        assert_eq!(
            Stat::buff_is_active(Entity::Enemy, "Blind").identity.as_str(),
            "Blind.Active"
        );
        assert_eq!(
            Stat::buff_source_is(Entity::Enemy, "Blind", Entity::Character)
                .identity
                .as_str(),
            "Blind.ActiveSourceIs(Character)"
        );
        let effect = Stat::buff_effect(Entity::Character, Entity::Enemy, "Blind");
        assert_eq!(effect.identity.as_str(), "Blind.EffectOn(Enemy)");
        assert_eq!(effect.entity, Entity::Character);
    }

    #[test]
    fn test_display() {
        assert_eq!(Stat::new("Life", Entity::Totem).to_string(), "Life (Totem)");
    }
}
