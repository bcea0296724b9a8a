//! Matcher tables and the parser that picks the best entry of one table.

use crate::builders::{ModifierBuilder, Reference};
use crate::error::CompileError;
use crate::parsing::regex_groups::RegexGroups;
use crate::parsing::{StringParseResult, StringParser};
use regex::{Regex, RegexBuilder};

/// One entry of a stat matcher table.
///
/// `regex` may contain `#` for a numeric value and `({Name})` for a
/// reference to another table; both are expanded before matching. The
/// matched text is replaced by `match_substitution`, which may use `$1`
/// style group references.
#[derive(Debug, Clone)]
pub struct MatcherData {
    pub regex: String,
    pub modifier: ModifierBuilder,
    pub match_substitution: String,
}

impl MatcherData {
    pub fn new(regex: impl Into<String>, modifier: ModifierBuilder) -> Self {
        Self {
            regex: regex.into(),
            modifier,
            match_substitution: String::new(),
        }
    }

    pub fn with_substitution(mut self, substitution: impl Into<String>) -> Self {
        self.match_substitution = substitution.into();
        self
    }
}

/// An entry of a referenced table: a plain regex that stands for a value.
#[derive(Debug, Clone)]
pub struct ReferencedMatcherData {
    pub regex: String,
    pub reference: Reference,
}

impl ReferencedMatcherData {
    pub fn new(regex: impl Into<String>, reference: Reference) -> Self {
        Self {
            regex: regex.into(),
            reference,
        }
    }
}

/// A named table of plain matchers, e.g. all keywords.
#[derive(Debug, Clone)]
pub struct ReferencedMatchers {
    pub name: String,
    pub data: Vec<ReferencedMatcherData>,
}

impl ReferencedMatchers {
    pub fn new(name: impl Into<String>, data: Vec<ReferencedMatcherData>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A table of stat matchers.
///
/// A table listing `reference_names` can itself be referenced under each
/// of those names.
#[derive(Debug, Clone, Default)]
pub struct StatMatchers {
    pub data: Vec<MatcherData>,
    pub reference_names: Vec<String>,
    pub matches_whole_line_only: bool,
}

impl StatMatchers {
    pub fn new(data: Vec<MatcherData>) -> Self {
        Self {
            data,
            reference_names: Vec::new(),
            matches_whole_line_only: false,
        }
    }

    pub fn with_reference_names(mut self, names: &[&str]) -> Self {
        self.reference_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn whole_line_only(mut self) -> Self {
        self.matches_whole_line_only = true;
        self
    }
}

/// The selected entry's builder template and the captures of its match.
#[derive(Debug, Clone, Default)]
pub struct MatcherDataParseResult {
    pub modifier: ModifierBuilder,
    pub groups: RegexGroups,
}

struct CompiledMatcher {
    regex: Regex,
    data: MatcherData,
}

/// Finds the entry of a table with the longest match.
///
/// Expects already expanded regexes. Ties go to the earlier entry.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::ModifierBuilder;
/// use zzmod::parsing::{MatcherData, MatcherDataParser, StringParser};
///
/// let parser = MatcherDataParser::new(
///     vec![
///         MatcherData::new("life", ModifierBuilder::new()),
///         MatcherData::new("maximum life", ModifierBuilder::new()),
///     ],
///     true,
/// )
/// .unwrap();
///
/// let result = parser.parse("+10 to Maximum Life").unwrap();
/// assert!(result.success);
/// assert_eq!(result.remaining, "+10 to");
/// ```
pub struct MatcherDataParser {
    matchers: Vec<CompiledMatcher>,
}

impl MatcherDataParser {
    pub fn new(data: Vec<MatcherData>, case_insensitive: bool) -> Result<Self, CompileError> {
        let matchers = data
            .into_iter()
            .map(|data| {
                let regex = RegexBuilder::new(&data.regex)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| CompileError::InvalidRegex {
                        pattern: data.regex.clone(),
                        message: e.to_string(),
                    })?;
                Ok(CompiledMatcher { regex, data })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(Self { matchers })
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl StringParser<MatcherDataParseResult> for MatcherDataParser {
    fn parse(&self, text: &str) -> Result<StringParseResult<MatcherDataParseResult>, CompileError> {
        let mut best: Option<(&CompiledMatcher, regex::Captures<'_>, usize)> = None;
        for matcher in &self.matchers {
            let Some(captures) = matcher.regex.captures(text) else {
                continue;
            };
            let length = captures.get(0).map_or(0, |m| m.as_str().trim().len());
            if best.as_ref().map_or(true, |(_, _, l)| length > *l) {
                best = Some((matcher, captures, length));
            }
        }

        let Some((matcher, captures, _)) = best else {
            return Ok(StringParseResult::failure(text, MatcherDataParseResult::default()));
        };
        let Some(whole) = captures.get(0) else {
            return Ok(StringParseResult::failure(text, MatcherDataParseResult::default()));
        };

        let mut substitution = String::new();
        captures.expand(&matcher.data.match_substitution, &mut substitution);
        let remaining = [
            text[..whole.start()].trim(),
            substitution.trim(),
            text[whole.end()..].trim(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

        tracing::debug!(
            "Selected matcher '{}' for '{}' (remaining '{}')",
            matcher.regex.as_str(),
            whole.as_str().trim(),
            remaining
        );
        Ok(StringParseResult::success(
            remaining,
            MatcherDataParseResult {
                modifier: matcher.data.modifier.clone(),
                groups: RegexGroups::from_captures(&matcher.regex, &captures),
            },
        ))
    }
}
