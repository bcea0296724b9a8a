//! Stat identity module.
//!
//! Provides `StatId`, the interned identity string of a derived statistic
//! such as `"Life"` or `"Fire.Damage.Attack.MainHand"`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Interned identity of a stat.
///
/// Cloning is a reference count bump, so identities can be handed around
/// freely while building modifiers.
///
/// # Examples
///
/// ```rust
/// use zzmod::StatId;
///
/// let life = StatId::from_str("Life");
/// let life2: StatId = "Life".into();
/// let life3: StatId = String::from("Life").into();
///
/// assert_eq!(life, life2);
/// assert_eq!(life, life3);
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatId(Arc<str>);

impl Serialize for StatId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StatId::from(s))
    }
}

impl StatId {
    /// Create a new `StatId` from a string slice.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a new identity by appending a `.`-separated suffix.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzmod::StatId;
    ///
    /// let damage = StatId::from_str("Fire.Damage");
    /// assert_eq!(damage.with_suffix("Attack").as_str(), "Fire.Damage.Attack");
    /// ```
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self::from(format!("{}.{}", self.0, suffix))
    }
}

impl From<&str> for StatId {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for StatId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for StatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_id_equality() {
        let id1 = StatId::from_str("Life");
        let id2 = StatId::from(String::from("Life"));
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str(), "Life");
    }

    #[test]
    fn test_stat_id_suffix_chain() {
        let id = StatId::from_str("Physical.Damage")
            .with_suffix("Attack")
            .with_suffix("OffHand");
        assert_eq!(id.as_str(), "Physical.Damage.Attack.OffHand");
    }

    #[test]
    fn test_stat_id_serde_as_plain_string() {
        let id = StatId::from_str("Mana");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Mana\"");
        let back: StatId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
