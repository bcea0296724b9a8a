//! Parsers that wrap another parser.

use crate::error::CompileError;
use crate::parsing::{StringParseResult, StringParser};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Memoizes the inner parser's results per distinct input.
///
/// Errors are not cached.
pub struct CachingParser<T> {
    inner: Box<dyn StringParser<T>>,
    cache: RwLock<HashMap<String, StringParseResult<T>>>,
}

impl<T> CachingParser<T> {
    pub fn new(inner: Box<dyn StringParser<T>>) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T: Clone + Send + Sync> StringParser<T> for CachingParser<T> {
    fn parse(&self, text: &str) -> Result<StringParseResult<T>, CompileError> {
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
        {
            tracing::debug!("Cache hit for '{}'", text);
            return Ok(hit.clone());
        }
        let result = self.inner.parse(text)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(text.to_string(), result.clone());
        Ok(result)
    }
}

/// Collapses whitespace runs into single spaces and trims before parsing.
pub struct NormalizingParser<T> {
    inner: Box<dyn StringParser<T>>,
}

impl<T> NormalizingParser<T> {
    pub fn new(inner: Box<dyn StringParser<T>>) -> Self {
        Self { inner }
    }
}

/// `text` with whitespace runs collapsed and ends trimmed.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl<T> StringParser<T> for NormalizingParser<T> {
    fn parse(&self, text: &str) -> Result<StringParseResult<T>, CompileError> {
        self.inner.parse(&normalize_whitespace(text))
    }
}

/// Only succeeds if nothing but whitespace and the hidden suffix remains.
pub struct ValidatingParser<T> {
    inner: Box<dyn StringParser<T>>,
    hidden_suffix: String,
}

impl<T> ValidatingParser<T> {
    pub fn new(inner: Box<dyn StringParser<T>>, hidden_suffix: impl Into<String>) -> Self {
        Self {
            inner,
            hidden_suffix: hidden_suffix.into(),
        }
    }
}

impl<T> StringParser<T> for ValidatingParser<T> {
    fn parse(&self, text: &str) -> Result<StringParseResult<T>, CompileError> {
        let parsed = self.inner.parse(text)?;
        let remaining = if self.hidden_suffix.is_empty() {
            parsed.remaining.trim().to_string()
        } else {
            parsed.remaining.replace(&self.hidden_suffix, "").trim().to_string()
        };
        Ok(StringParseResult {
            success: parsed.success && remaining.is_empty(),
            remaining,
            result: parsed.result,
        })
    }
}

/// A line that is rewritten into other lines before parsing.
///
/// `regex` must match the whole line. Each replacement may refer to its
/// groups as `$0`, `$1`, ... An empty replacement list drops the line.
///
/// # Examples
///
/// ```rust
/// use zzmod::parsing::StatReplacerData;
///
/// let data: Vec<StatReplacerData> = serde_json::from_str(
///     r#"[{ "regex": "(.*) and (.*)", "replacements": ["$1", "$2"] }]"#,
/// )
/// .unwrap();
/// assert_eq!(data[0].replacements.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatReplacerData {
    pub regex: String,
    pub replacements: Vec<String>,
}

impl StatReplacerData {
    pub fn new(regex: impl Into<String>, replacements: &[&str]) -> Self {
        Self {
            regex: regex.into(),
            replacements: replacements.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Splits a line with the first matching replacer and parses every part.
///
/// Lines no replacer matches are parsed as a single part. The result
/// succeeds only if every part does. Remainders of the parts are joined
/// with newlines, leaving out blank ones.
pub struct StatReplacingParser<T> {
    inner: Box<dyn StringParser<T>>,
    replacers: Vec<(Regex, Vec<String>)>,
}

impl<T> StatReplacingParser<T> {
    pub fn new(
        inner: Box<dyn StringParser<T>>,
        replacers: Vec<StatReplacerData>,
        case_insensitive: bool,
    ) -> Result<Self, CompileError> {
        let replacers = replacers
            .into_iter()
            .map(|data| {
                let pattern = format!("^(?:{})$", data.regex);
                let regex = RegexBuilder::new(&pattern)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| CompileError::InvalidRegex {
                        pattern,
                        message: e.to_string(),
                    })?;
                Ok((regex, data.replacements))
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(Self { inner, replacers })
    }

    fn replace(&self, text: &str) -> Vec<String> {
        for (regex, replacements) in &self.replacers {
            if let Some(captures) = regex.captures(text) {
                return replacements
                    .iter()
                    .map(|replacement| {
                        let mut part = String::new();
                        captures.expand(replacement, &mut part);
                        part
                    })
                    .collect();
            }
        }
        vec![text.to_string()]
    }
}

impl<T> StringParser<Vec<T>> for StatReplacingParser<T> {
    fn parse(&self, text: &str) -> Result<StringParseResult<Vec<T>>, CompileError> {
        let mut success = true;
        let mut remaining = Vec::new();
        let mut results = Vec::new();
        for part in self.replace(text) {
            let parsed = self.inner.parse(&part)?;
            success &= parsed.success;
            if !parsed.remaining.trim().is_empty() {
                remaining.push(parsed.remaining);
            }
            results.push(parsed.result);
        }
        Ok(StringParseResult {
            success,
            remaining: remaining.join("\n"),
            result: results,
        })
    }
}
