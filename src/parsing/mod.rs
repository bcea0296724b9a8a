//! Turning modifier lines into intermediate modifiers.
//!
//! Parsing is a stack of small [`StringParser`]s. At the bottom a
//! [`MatcherDataParser`] finds the best regex of one matcher table; above it
//! sit resolution, normalization, caching, the step-driven
//! [`CompositeParser`] and finally [`CoreParser`], which builds the
//! resulting [`Modifier`](crate::Modifier)s.
//!
//! A line that doesn't match is not an error: every parser reports
//! `success: false` together with the text it couldn't consume.

pub mod composite;
pub mod decorators;
pub mod expander;
pub mod matchers;
pub mod pipeline;
pub mod references;
pub mod regex_groups;
pub mod resolving;

pub use composite::{CompositeParser, ParsingStep, StandardStepper, Stepper};
pub use decorators::{
    CachingParser, NormalizingParser, StatReplacerData, StatReplacingParser, ValidatingParser,
};
pub use expander::RegexExpander;
pub use matchers::{
    MatcherData, MatcherDataParseResult, MatcherDataParser, ReferencedMatcherData,
    ReferencedMatchers, StatMatchers,
};
pub use pipeline::{CoreParser, ParseResult, ParsingData};
pub use references::{ReferenceService, ReferenceValidator};
pub use regex_groups::{ParsedReference, RegexGroupService, RegexGroups};
pub use resolving::ResolvingParser;

use crate::error::CompileError;
use serde::{Deserialize, Serialize};

/// Outcome of one parser on one piece of text.
///
/// `remaining` is whatever the parser didn't consume. On failure `result`
/// holds whatever partial output the parser had, usually the default.
#[derive(Debug, Clone, PartialEq)]
pub struct StringParseResult<T> {
    pub success: bool,
    pub remaining: String,
    pub result: T,
}

impl<T> StringParseResult<T> {
    pub fn success(remaining: impl Into<String>, result: T) -> Self {
        Self {
            success: true,
            remaining: remaining.into(),
            result,
        }
    }

    pub fn failure(remaining: impl Into<String>, result: T) -> Self {
        Self {
            success: false,
            remaining: remaining.into(),
            result,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StringParseResult<U> {
        StringParseResult {
            success: self.success,
            remaining: self.remaining,
            result: f(self.result),
        }
    }
}

/// Parses a piece of text into `T`.
///
/// `Err` is reserved for inconsistent data found while parsing, such as a
/// reference to a table that doesn't exist.
pub trait StringParser<T>: Send + Sync {
    fn parse(&self, text: &str) -> Result<StringParseResult<T>, CompileError>;
}

impl<T, P: StringParser<T> + ?Sized> StringParser<T> for std::sync::Arc<P> {
    fn parse(&self, text: &str) -> Result<StringParseResult<T>, CompileError> {
        (**self).parse(text)
    }
}

impl<T, P: StringParser<T> + ?Sized> StringParser<T> for Box<P> {
    fn parse(&self, text: &str) -> Result<StringParseResult<T>, CompileError> {
        (**self).parse(text)
    }
}

/// Knobs of the parsing pipeline.
///
/// # Examples
///
/// ```rust
/// use zzmod::parsing::ParserConfig;
///
/// let config: ParserConfig = serde_json::from_str(r#"{ "cache": false }"#).unwrap();
/// assert!(!config.cache);
/// assert!(config.case_insensitive);
/// assert_eq!(config.hidden_suffix, "(Hidden)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Match regexes ignoring case.
    pub case_insensitive: bool,
    /// Marker that may trail a line without counting as unparsed text.
    pub hidden_suffix: String,
    /// Memoize results per distinct input.
    pub cache: bool,
    /// Collapse whitespace runs and trim before matching.
    pub normalize_whitespace: bool,
}

impl ParserConfig {
    pub fn new() -> Self {
        Self {
            case_insensitive: true,
            hidden_suffix: "(Hidden)".to_string(),
            cache: true,
            normalize_whitespace: true,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}
