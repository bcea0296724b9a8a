//! Lookup and validation of the tables regexes refer to.
//!
//! A `({Name})` in a regex refers either to a referenced table of plain
//! matchers or to every stat matcher table listing `Name` among its
//! reference names. Entries are numbered across all tables of a name, in
//! table order.

use crate::error::CompileError;
use crate::graph::DependencyGraph;
use crate::parsing::matchers::{MatcherData, ReferencedMatcherData, ReferencedMatchers, StatMatchers};
use crate::parsing::regex_groups::RegexGroupService;
use crate::stat_id::StatId;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(\{(\w+)\}\)").expect("reference pattern is valid"))
}

fn group_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(\?P?<(\w+)>").expect("group name pattern is valid"))
}

/// Names of all tables `regex` refers to, in order of appearance.
pub fn referenced_names(regex: &str) -> Vec<String> {
    reference_pattern()
        .captures_iter(regex)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Replace every `({Name})` in `regex` with `replace(name)`.
pub(crate) fn replace_references(
    regex: &str,
    mut replace: impl FnMut(&str) -> Result<String, CompileError>,
) -> Result<String, CompileError> {
    let mut expanded = String::with_capacity(regex.len());
    let mut last = 0;
    for captures in reference_pattern().captures_iter(regex) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        expanded.push_str(&regex[last..whole.start()]);
        expanded.push_str(&replace(name.as_str())?);
        last = whole.end();
    }
    expanded.push_str(&regex[last..]);
    Ok(expanded)
}

/// Read access to referenced and stat matcher tables by name.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::Reference;
/// use zzmod::game::Keyword;
/// use zzmod::parsing::{ReferenceService, ReferencedMatcherData, ReferencedMatchers};
///
/// let service = ReferenceService::new(
///     vec![ReferencedMatchers::new(
///         "Keyword",
///         vec![
///             ReferencedMatcherData::new("aura", Reference::Keyword(Keyword::Aura)),
///             ReferencedMatcherData::new("melee", Reference::Keyword(Keyword::Melee)),
///         ],
///     )],
///     vec![],
/// );
///
/// assert_eq!(service.get_regexes("Keyword").unwrap(), vec!["aura", "melee"]);
/// assert!(service.get_referenced_matcher_data("Keyword", 1).is_some());
/// assert!(service.get_regexes("Unknown").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReferenceService {
    referenced: HashMap<String, Vec<ReferencedMatcherData>>,
    stat: HashMap<String, Vec<MatcherData>>,
}

impl ReferenceService {
    pub fn new(referenced: Vec<ReferencedMatchers>, stat: Vec<StatMatchers>) -> Self {
        let mut service = Self::default();
        for table in referenced {
            service
                .referenced
                .entry(table.name)
                .or_default()
                .extend(table.data);
        }
        for table in stat {
            for name in &table.reference_names {
                service
                    .stat
                    .entry(name.clone())
                    .or_default()
                    .extend(table.data.iter().cloned());
            }
        }
        service
    }

    /// Unexpanded regexes of every entry named `name`, by matcher index.
    pub fn get_regexes(&self, name: &str) -> Option<Vec<String>> {
        if let Some(data) = self.referenced.get(name) {
            return Some(data.iter().map(|d| d.regex.clone()).collect());
        }
        self.stat
            .get(name)
            .map(|data| data.iter().map(|d| d.regex.clone()).collect())
    }

    pub fn get_referenced_matcher_data(
        &self,
        name: &str,
        matcher_index: usize,
    ) -> Option<&ReferencedMatcherData> {
        self.referenced.get(name)?.get(matcher_index)
    }

    pub fn get_matcher_data(&self, name: &str, matcher_index: usize) -> Option<&MatcherData> {
        self.stat.get(name)?.get(matcher_index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.referenced.contains_key(name) || self.stat.contains_key(name)
    }
}

/// Checks matcher tables for consistent references.
pub struct ReferenceValidator;

impl ReferenceValidator {
    /// Validate all tables.
    ///
    /// Rejects:
    /// - referenced tables containing values, references or hand-written
    ///   groups that clash with generated names,
    /// - duplicate referenced table names,
    /// - names used by both a referenced and a stat matcher table,
    /// - values in stat matcher tables that can be referenced,
    /// - references to unknown names,
    /// - cycles between referenceable stat matcher tables.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzmod::builders::ModifierBuilder;
    /// use zzmod::parsing::{MatcherData, ReferenceValidator, StatMatchers};
    ///
    /// let cyclic = vec![
    ///     StatMatchers::new(vec![MatcherData::new("({B})", ModifierBuilder::new())])
    ///         .with_reference_names(&["A"]),
    ///     StatMatchers::new(vec![MatcherData::new("({A})", ModifierBuilder::new())])
    ///         .with_reference_names(&["B"]),
    /// ];
    /// assert!(ReferenceValidator::validate(&[], &cyclic).is_err());
    /// ```
    pub fn validate(
        referenced: &[ReferencedMatchers],
        stat: &[StatMatchers],
    ) -> Result<(), CompileError> {
        let mut table_names = HashSet::new();
        for table in referenced {
            if !table_names.insert(table.name.as_str()) {
                return Err(invalid(format!(
                    "referenced matchers name {} is not unique",
                    table.name
                )));
            }
            for data in &table.data {
                if data.regex.contains('#') {
                    return Err(invalid(format!(
                        "referenced matcher {} contains a value: {}",
                        table.name, data.regex
                    )));
                }
                if data.regex.contains("({") {
                    return Err(invalid(format!(
                        "referenced matcher {} contains a reference: {}",
                        table.name, data.regex
                    )));
                }
                check_group_names(&data.regex)?;
            }
        }

        let stat_names: HashSet<&str> = stat
            .iter()
            .flat_map(|t| t.reference_names.iter().map(String::as_str))
            .collect();
        if let Some(name) = stat_names.iter().find(|n| table_names.contains(*n)) {
            return Err(invalid(format!(
                "{name} is used by referenced matchers and stat matchers"
            )));
        }

        let mut graph = DependencyGraph::new();
        for table in stat {
            for data in &table.data {
                if !table.reference_names.is_empty() && data.regex.contains('#') {
                    return Err(invalid(format!(
                        "referenceable stat matcher contains a value: {}",
                        data.regex
                    )));
                }
                check_group_names(&data.regex)?;
                for name in referenced_names(&data.regex) {
                    if !table_names.contains(name.as_str())
                        && !stat_names.contains(name.as_str())
                    {
                        return Err(invalid(format!("unknown reference {name} in {}", data.regex)));
                    }
                    if stat_names.contains(name.as_str()) {
                        for own in &table.reference_names {
                            graph.add_edge(StatId::from(own.as_str()), StatId::from(name.as_str()));
                        }
                    }
                }
            }
        }
        graph
            .detect_cycles()
            .map_err(|e| invalid(format!("cyclical stat matcher references: {e}")))
    }
}

fn check_group_names(regex: &str) -> Result<(), CompileError> {
    for captures in group_name_pattern().captures_iter(regex) {
        if let Some(name) = captures.get(1) {
            if !RegexGroupService::is_valid_group_name(name.as_str()) {
                return Err(invalid(format!(
                    "invalid group name {} in {}",
                    name.as_str(),
                    regex
                )));
            }
        }
    }
    Ok(())
}

fn invalid(message: String) -> CompileError {
    CompileError::InvalidReference(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{ModifierBuilder, Reference};
    use crate::game::Keyword;
    use rstest::rstest;

    fn referenced_table(name: &str, regexes: &[&str]) -> ReferencedMatchers {
        ReferencedMatchers::new(
            name,
            regexes
                .iter()
                .map(|r| ReferencedMatcherData::new(*r, Reference::Keyword(Keyword::Aura)))
                .collect(),
        )
    }

    fn stat_table(names: &[&str], regexes: &[&str]) -> StatMatchers {
        StatMatchers::new(
            regexes
                .iter()
                .map(|r| MatcherData::new(*r, ModifierBuilder::new()))
                .collect(),
        )
        .with_reference_names(names)
    }

    fn default_referenced() -> Vec<ReferencedMatchers> {
        vec![referenced_table("Matchers1", &["a"]), referenced_table("Matchers2", &["b"])]
    }

    #[test]
    fn test_referenced_matchers_reject_values() {
        let referenced = vec![referenced_table("Matchers1", &["text # stuff"])];
        assert!(ReferenceValidator::validate(&referenced, &[]).is_err());
    }

    #[test]
    fn test_referenced_matchers_reject_references() {
        let referenced = vec![
            referenced_table("Matchers1", &["text ({Matchers2}) stuff"]),
            referenced_table("Matchers2", &["a"]),
        ];
        assert!(ReferenceValidator::validate(&referenced, &[]).is_err());
    }

    #[test]
    fn test_referenced_names_must_be_unique() {
        let referenced = vec![referenced_table("Matchers1", &["b"]), referenced_table("Matchers1", &["a"])];
        assert!(ReferenceValidator::validate(&referenced, &[]).is_err());
    }

    #[test]
    fn test_name_shared_between_kinds_is_rejected() {
        let referenced = vec![referenced_table("SMatchers1", &["b"])];
        let stat = vec![stat_table(&["SMatchers1"], &["c"])];
        assert!(ReferenceValidator::validate(&referenced, &stat).is_err());
    }

    #[test]
    fn test_stat_matcher_names_may_repeat() {
        let stat = vec![stat_table(&["SMatchers1"], &["c"]), stat_table(&["SMatchers1"], &["d"])];
        assert!(ReferenceValidator::validate(&default_referenced(), &stat).is_ok());
    }

    #[test]
    fn test_values_only_in_unreferenced_stat_matchers() {
        assert!(ReferenceValidator::validate(&[], &[stat_table(&["SMatchers1"], &["#"])]).is_err());
        assert!(ReferenceValidator::validate(&[], &[stat_table(&[], &["#"])]).is_ok());
    }

    #[test]
    fn test_stat_matchers_may_reference_each_other() {
        let stat = vec![
            stat_table(&["SMatchers1"], &["({SMatchers2})"]),
            stat_table(&["SMatchers2"], &["({Matchers1})"]),
        ];
        assert!(ReferenceValidator::validate(&default_referenced(), &stat).is_ok());
    }

    #[test]
    fn test_cyclical_references_are_rejected() {
        let stat = vec![
            stat_table(&["SMatchers1"], &["({SMatchers2})"]),
            stat_table(&["SMatchers2"], &["({SMatchers1})"]),
        ];
        assert!(ReferenceValidator::validate(&default_referenced(), &stat).is_err());
    }

    #[test]
    fn test_complex_cycle_is_rejected() {
        let stat = vec![
            stat_table(&["SMatchers1"], &["({SMatchers2}) ({SMatchers2})"]),
            stat_table(&["SMatchers2"], &["({SMatchers5})"]),
            stat_table(&["SMatchers2"], &["({SMatchers3}) ({SMatchers4}) ({Matchers2})"]),
            stat_table(&["SMatchers3", "SMatchers4"], &["({Matchers2})"]),
            stat_table(&["SMatchers4"], &["({Matchers1}) ({SMatchers1})"]),
            stat_table(&["SMatchers5"], &["({Matchers1})"]),
        ];
        let err = ReferenceValidator::validate(&default_referenced(), &stat).unwrap_err();
        assert!(matches!(err, CompileError::InvalidReference(_)));
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let stat = vec![stat_table(&["SMatchers1"], &["x ({SMatchers1})"])];
        assert!(ReferenceValidator::validate(&[], &stat).is_err());
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let stat = vec![stat_table(&["SMatchers1"], &["({SMatchers2})"])];
        assert!(ReferenceValidator::validate(&default_referenced(), &stat).is_err());
    }

    #[rstest]
    #[case("value")]
    #[case("value5_xyz")]
    #[case("reference")]
    #[case("reference_groupNameX")]
    fn test_invalid_group_names_are_rejected(#[case] group: &str) {
        let regex = format!("text (?<{group}>stuff)");
        let stat = vec![stat_table(&[], &[regex.as_str()])];
        assert!(ReferenceValidator::validate(&[], &stat).is_err());
        let referenced = vec![referenced_table("Matchers1", &[regex.as_str()])];
        assert!(ReferenceValidator::validate(&referenced, &[]).is_err());
    }

    #[test]
    fn test_service_concatenates_stat_tables_by_name() {
        let service = ReferenceService::new(
            vec![],
            vec![stat_table(&["S"], &["a", "b"]), stat_table(&["S", "T"], &["c"])],
        );
        assert_eq!(service.get_regexes("S").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(service.get_regexes("T").unwrap(), vec!["c"]);
        assert_eq!(service.get_matcher_data("S", 2).unwrap().regex, "c");
        assert!(service.get_matcher_data("S", 3).is_none());
        assert!(service.get_referenced_matcher_data("S", 0).is_none());
    }

    #[test]
    fn test_replace_references_keeps_surrounding_text() {
        let replaced =
            replace_references("a ({X}) b ({Y})", |name| Ok(name.to_lowercase())).unwrap();
        assert_eq!(replaced, "a x b y");
        assert_eq!(referenced_names("({X}) and ({Y})"), vec!["X", "Y"]);
    }
}
