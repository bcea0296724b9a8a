//! Naming scheme of the regex groups produced by expansion.
//!
//! A value capture is named `value{prefix}{suffix}`. A reference capture is
//! named `reference{prefix}{k}_{name}_{index}` where `k` numbers the
//! references on one nesting level, `name` is the referenced table and
//! `index` the entry of that table that matched. Captures nested inside a
//! reference carry `{prefix}{k}_{index}_` as their prefix, so alternatives
//! referring to the same table never share a group name.

use crate::builders::ValueBuilder;
use crate::error::CompileError;
use regex::{Captures, Regex};

const VALUE_GROUP: &str = "value";
const REFERENCE_GROUP: &str = "reference";

/// Regex that matches one numeric value.
pub const VALUE_REGEX: &str = r"[+-]?\d+(?:\.\d+)?";

/// Named captures of one match, in group order.
///
/// Only groups that participated in the match are present.
///
/// # Examples
///
/// ```rust
/// use zzmod::parsing::RegexGroups;
///
/// let regex = regex::Regex::new(r"(?P<value0>\d+) (?P<other>x)?").unwrap();
/// let captures = regex.captures("42 ").unwrap();
/// let groups = RegexGroups::from_captures(&regex, &captures);
/// assert_eq!(groups.get("value0"), Some("42"));
/// assert_eq!(groups.get("other"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegexGroups(Vec<(String, String)>);

impl RegexGroups {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_captures(regex: &Regex, captures: &Captures<'_>) -> Self {
        regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect()
    }

    /// Set `name`, replacing an earlier capture of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for RegexGroups {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut groups = RegexGroups::new();
        for (name, value) in iter {
            groups.insert(name, value);
        }
        groups
    }
}

/// A reference capture decoded from its group name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub name: String,
    pub matcher_index: usize,
    /// Prefix of the captures nested inside this reference.
    pub nested_prefix: String,
}

/// Creates and decodes capture group names.
///
/// # Examples
///
/// ```rust
/// use zzmod::parsing::{RegexGroupService, RegexGroups};
///
/// let mut groups = RegexGroups::new();
/// groups.insert("reference0_Keyword_3", "melee");
/// groups.insert("reference0_0_Keyword_1", "nested");
///
/// let references = RegexGroupService::parse_references(groups.names(), "");
/// assert_eq!(references.len(), 1);
/// assert_eq!(references[0].name, "Keyword");
/// assert_eq!(references[0].matcher_index, 3);
/// assert_eq!(references[0].nested_prefix, "0_3_");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexGroupService;

impl RegexGroupService {
    pub fn value_group_name(prefix: &str, suffix: &str) -> String {
        format!("{VALUE_GROUP}{prefix}{suffix}")
    }

    /// Group name of entry `matcher_index` of table `name`.
    ///
    /// `group_prefix` is the enclosing prefix followed by the reference's
    /// position on its level.
    pub fn reference_group_name(group_prefix: &str, name: &str, matcher_index: usize) -> String {
        format!("{REFERENCE_GROUP}{group_prefix}_{name}_{matcher_index}")
    }

    /// Values captured directly at `prefix`, in group order.
    pub fn parse_values(
        groups: &RegexGroups,
        prefix: &str,
    ) -> Result<Vec<ValueBuilder>, CompileError> {
        groups
            .iter()
            .filter(|(name, _)| Self::is_value_group(name, prefix))
            .map(|(_, text)| {
                text.trim()
                    .parse::<f64>()
                    .map(ValueBuilder::constant)
                    .map_err(|_| CompileError::InvalidValue(text.to_string()))
            })
            .collect()
    }

    /// References captured directly at `prefix`, in group order.
    ///
    /// Names that don't follow the reference scheme at this prefix are
    /// skipped, which includes references nested deeper.
    pub fn parse_references<'a>(
        group_names: impl IntoIterator<Item = &'a str>,
        prefix: &str,
    ) -> Vec<ParsedReference> {
        group_names
            .into_iter()
            .filter_map(|name| Self::parse_reference(name, prefix))
            .collect()
    }

    fn is_value_group(name: &str, prefix: &str) -> bool {
        name.strip_prefix(VALUE_GROUP)
            .and_then(|rest| rest.strip_prefix(prefix))
            .is_some_and(|suffix| !suffix.is_empty() && !suffix.contains('_'))
    }

    fn parse_reference(name: &str, prefix: &str) -> Option<ParsedReference> {
        let rest = name.strip_prefix(REFERENCE_GROUP)?.strip_prefix(prefix)?;
        let parts: Vec<&str> = rest.split('_').collect();
        match parts.as_slice() {
            [position, referenced, index] => {
                let matcher_index = index.parse().ok()?;
                Some(ParsedReference {
                    name: referenced.to_string(),
                    matcher_index,
                    nested_prefix: format!("{prefix}{position}_{matcher_index}_"),
                })
            }
            _ => None,
        }
    }

    /// Whether a hand-written group name stays clear of the generated
    /// scheme or follows it exactly.
    pub fn is_valid_group_name(name: &str) -> bool {
        if name.starts_with(REFERENCE_GROUP) {
            Self::parse_reference(name, "").is_some()
        } else if name.starts_with(VALUE_GROUP) {
            Self::is_value_group(name, "")
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmptyContext;
    use crate::modifier::BuildParameters;
    use crate::value::NodeValue;
    use rstest::rstest;

    fn groups(names: &[&str]) -> RegexGroups {
        names
            .iter()
            .map(|n| (n.to_string(), "1".to_string()))
            .collect()
    }

    #[rstest]
    #[case("valueSuffix", "", true)]
    #[case("valuePrefixSuffix", "Prefix", true)]
    #[case("value_Suffix", "", false)]
    #[case("value", "", false)]
    #[case("valueOther", "Prefix", false)]
    fn test_value_group_prefixes(#[case] name: &str, #[case] prefix: &str, #[case] expected: bool) {
        let values = RegexGroupService::parse_values(&groups(&[name]), prefix).unwrap();
        assert_eq!(values.len(), usize::from(expected));
    }

    #[test]
    fn test_parse_values_reads_numbers_in_group_order() {
        let groups: RegexGroups = vec![
            ("value0".to_string(), "+12".to_string()),
            ("value1".to_string(), "-1.5".to_string()),
        ]
        .into_iter()
        .collect();
        let values = RegexGroupService::parse_values(&groups, "").unwrap();
        let built: Vec<_> = values
            .iter()
            .map(|v| {
                v.build(&BuildParameters::default())
                    .unwrap()
                    .calculate(&EmptyContext)
            })
            .collect();
        assert_eq!(built, vec![Some(NodeValue::from(12.0)), Some(NodeValue::from(-1.5))]);
    }

    #[test]
    fn test_parse_values_rejects_non_numbers() {
        let mut groups = RegexGroups::new();
        groups.insert("value0", "many");
        assert_eq!(
            RegexGroupService::parse_values(&groups, "").unwrap_err(),
            CompileError::InvalidValue("many".to_string())
        );
    }

    #[rstest]
    #[case("xyz", 100, "prefix", "")]
    #[case("name0", 0, "nestedPrefix", "prefix")]
    fn test_parse_single_reference(
        #[case] name: &str,
        #[case] index: usize,
        #[case] position: &str,
        #[case] prefix: &str,
    ) {
        let group = RegexGroupService::reference_group_name(
            &format!("{prefix}{position}"),
            name,
            index,
        );
        let references = RegexGroupService::parse_references([group.as_str()], prefix);
        assert_eq!(
            references,
            vec![ParsedReference {
                name: name.to_string(),
                matcher_index: index,
                nested_prefix: format!("{prefix}{position}_{index}_"),
            }]
        );
    }

    #[rstest]
    #[case("reference0_0_name0_0", "")]
    #[case("reference0_0_name0_0", "1")]
    #[case("reference0_name0_0", "0_")]
    #[case("reference0_name_x", "")]
    fn test_parse_references_ignores_other_levels(#[case] group: &str, #[case] prefix: &str) {
        assert!(RegexGroupService::parse_references([group], prefix).is_empty());
    }

    #[test]
    fn test_parse_references_keeps_order() {
        let groups = groups(&["reference1_b_0", "value0", "reference0_a_2"]);
        let names: Vec<_> = RegexGroupService::parse_references(groups.names(), "")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[rstest]
    #[case("value", false)]
    #[case("value5_xyz", false)]
    #[case("reference", false)]
    #[case("reference_groupNameX", false)]
    #[case("value3", true)]
    #[case("reference0_Keyword_1", true)]
    #[case("anything", true)]
    fn test_hand_written_group_names(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(RegexGroupService::is_valid_group_name(name), valid);
    }
}
