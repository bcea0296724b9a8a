//! Expansion of matcher regexes into plain regexes with named groups.

use crate::error::CompileError;
use crate::parsing::matchers::{MatcherData, StatMatchers};
use crate::parsing::references::{replace_references, ReferenceService};
use crate::parsing::regex_groups::{RegexGroupService, VALUE_REGEX};
use std::sync::Arc;

const LEFT_DELIMITER: &str = r"(?:^|\s)";
const RIGHT_DELIMITER: &str = r"(?:$|\s)";

/// Expands `#` and `({Name})` placeholders of stat matcher regexes.
///
/// Each `#` becomes a numbered value group. Each `({Name})` becomes an
/// alternation over every regex of `Name`, longest first, with one
/// reference group per alternative; referenced regexes are expanded
/// recursively. The result is anchored at word boundaries, or at both ends
/// of the line for whole-line tables.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use zzmod::builders::Reference;
/// use zzmod::game::Keyword;
/// use zzmod::parsing::{ReferenceService, ReferencedMatcherData, ReferencedMatchers, RegexExpander};
///
/// let service = ReferenceService::new(
///     vec![ReferencedMatchers::new(
///         "Keyword",
///         vec![ReferencedMatcherData::new("aura", Reference::Keyword(Keyword::Aura))],
///     )],
///     vec![],
/// );
/// let expander = RegexExpander::new(Arc::new(service));
///
/// assert_eq!(
///     expander.expand_regex("# to ({Keyword})", true).unwrap(),
///     r"^(?P<value0>[+-]?\d+(?:\.\d+)?) to ((?P<reference0_Keyword_0>aura))$"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RegexExpander {
    references: Arc<ReferenceService>,
}

impl RegexExpander {
    pub fn new(references: Arc<ReferenceService>) -> Self {
        Self { references }
    }

    /// A copy of the table's entries with expanded regexes.
    pub fn expand(&self, matchers: &StatMatchers) -> Result<Vec<MatcherData>, CompileError> {
        matchers
            .data
            .iter()
            .map(|data| {
                Ok(MatcherData {
                    regex: self.expand_regex(&data.regex, matchers.matches_whole_line_only)?,
                    ..data.clone()
                })
            })
            .collect()
    }

    pub fn expand_regex(&self, regex: &str, whole_line: bool) -> Result<String, CompileError> {
        let expanded = expand_values(&self.expand_references(regex, "")?);
        Ok(if whole_line {
            format!("^{expanded}$")
        } else {
            format!("{LEFT_DELIMITER}{expanded}{RIGHT_DELIMITER}")
        })
    }

    fn expand_references(&self, regex: &str, prefix: &str) -> Result<String, CompileError> {
        let mut position = 0;
        replace_references(regex, |name| {
            let regexes = self.references.get_regexes(name).ok_or_else(|| {
                CompileError::InvalidReference(format!("unknown reference {name} in {regex}"))
            })?;
            let group_prefix = format!("{prefix}{position}");
            position += 1;

            let mut indexed: Vec<(usize, &String)> = regexes.iter().enumerate().collect();
            indexed.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
            let alternatives = indexed
                .into_iter()
                .map(|(index, alternative)| {
                    Ok(format!(
                        "(?P<{}>{})",
                        RegexGroupService::reference_group_name(&group_prefix, name, index),
                        self.expand_references(alternative, &format!("{group_prefix}_{index}_"))?
                    ))
                })
                .collect::<Result<Vec<_>, CompileError>>()?;
            Ok(format!("({})", alternatives.join("|")))
        })
    }
}

fn expand_values(regex: &str) -> String {
    let mut expanded = String::with_capacity(regex.len());
    let mut count = 0;
    for c in regex.chars() {
        if c == '#' {
            let group = RegexGroupService::value_group_name("", &count.to_string());
            expanded.push_str(&format!("(?P<{group}>{VALUE_REGEX})"));
            count += 1;
        } else {
            expanded.push(c);
        }
    }
    expanded
}
