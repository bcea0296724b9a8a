//! Loading static parser data from JSON.
//!
//! Stat matcher tables carry builder templates and are assembled in code.
//! Plain lookup tables and stat replacers are data and can be kept in JSON
//! files.

use crate::builders::Reference;
use crate::error::CompileError;
use crate::game::{Ailment, ChargeType, DamageType, ItemSlot, Keyword, SkillDefinition};
use crate::parsing::{ReferencedMatcherData, ReferencedMatchers, StatReplacerData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// What a lookup table entry stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceValue {
    Keyword(Keyword),
    Skill(SkillDefinition),
    Ailment(Ailment),
    ChargeType(ChargeType),
    DamageType(DamageType),
    ItemSlot(ItemSlot),
    Action(String),
}

impl From<ReferenceValue> for Reference {
    fn from(value: ReferenceValue) -> Self {
        match value {
            ReferenceValue::Keyword(k) => Reference::Keyword(k),
            ReferenceValue::Skill(s) => Reference::Skill(s),
            ReferenceValue::Ailment(a) => Reference::Ailment(a),
            ReferenceValue::ChargeType(c) => Reference::ChargeType(c),
            ReferenceValue::DamageType(d) => Reference::DamageType(d),
            ReferenceValue::ItemSlot(i) => Reference::ItemSlot(i),
            ReferenceValue::Action(a) => Reference::Action(a),
        }
    }
}

/// One entry of a lookup table as stored in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub regex: String,
    #[serde(flatten)]
    pub value: ReferenceValue,
}

/// Load lookup tables from a JSON object of table name to entries.
///
/// Tables come back sorted by name; entries keep their order, since an
/// entry's position is the index its reference groups are named with.
///
/// # Examples
///
/// ```rust
/// use zzmod::data::load_referenced_matchers;
///
/// let tables = load_referenced_matchers(r#"{
///     "Keyword": [
///         { "regex": "aura", "keyword": "Aura" },
///         { "regex": "melee", "keyword": "Melee" }
///     ],
///     "Action": [{ "regex": "kill(ed)?", "action": "Kill" }]
/// }"#).unwrap();
///
/// assert_eq!(tables.len(), 2);
/// assert_eq!(tables[0].name, "Action");
/// assert_eq!(tables[1].data.len(), 2);
/// ```
pub fn load_referenced_matchers(json: &str) -> Result<Vec<ReferencedMatchers>, CompileError> {
    let tables: BTreeMap<String, Vec<ReferenceEntry>> = serde_json::from_str(json)?;
    debug!(tables = tables.len(), "Loaded referenced matcher tables");
    Ok(tables
        .into_iter()
        .map(|(name, entries)| {
            let data = entries
                .into_iter()
                .map(|entry| ReferencedMatcherData::new(entry.regex, entry.value.into()))
                .collect();
            ReferencedMatchers::new(name, data)
        })
        .collect())
}

/// Load stat replacers from a JSON array.
pub fn load_stat_replacers(json: &str) -> Result<Vec<StatReplacerData>, CompileError> {
    let replacers: Vec<StatReplacerData> = serde_json::from_str(json)?;
    debug!(replacers = replacers.len(), "Loaded stat replacers");
    Ok(replacers)
}
