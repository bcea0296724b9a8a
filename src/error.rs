//! Error types for modifier compilation.
//!
//! Lines that simply don't match anything are not errors; they come back as
//! unsuccessful parse results. `CompileError` covers the cases that point at
//! inconsistent static data or a misused builder combinator.

use crate::stat_id::StatId;
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[StatId]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors that can occur while resolving or building modifiers.
///
/// # Examples
///
/// ```rust
/// use zzmod::CompileError;
///
/// let err = CompileError::UnknownReference {
///     name: "Keyword".into(),
///     matcher_index: 7,
/// };
/// assert_eq!(err.to_string(), "Unknown reference: Keyword[7]");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    /// A regex group names a reference table or index that doesn't exist.
    #[error("Unknown reference: {name}[{matcher_index}]")]
    UnknownReference { name: String, matcher_index: usize },

    /// A placeholder asked for a reference position the match didn't capture.
    #[error("Reference index {index} out of range ({available} available)")]
    ReferenceIndex { index: usize, available: usize },

    /// A placeholder asked for a value position the match didn't capture.
    #[error("Value index {index} out of range ({available} available)")]
    ValueIndex { index: usize, available: usize },

    /// A placeholder survived until build.
    #[error("Unresolved placeholder reached build: {0}")]
    UnresolvedPlaceholder(String),

    /// A combinator was applied to a stat it can't handle.
    ///
    /// Carries the combinator's name so failures are diagnosable.
    #[error("{combinator} can only be applied to damage related stats, got {stat}")]
    TypeMismatch { combinator: String, stat: String },

    /// A reference resolved to a different category than requested.
    #[error("Expected a {expected} reference, found {actual}")]
    ReferenceKind {
        expected: &'static str,
        actual: &'static str,
    },

    /// A matcher regex failed to compile after expansion.
    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// A captured value could not be read as a number.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Intermediate modifier entries could not be combined.
    #[error("Invalid modifier entry: {0}")]
    InvalidEntry(String),

    /// `Not` was applied to a condition that has no negated form.
    #[error("Condition can't be negated: {0}")]
    UnsupportedNegation(String),

    /// Matcher tables reference each other inconsistently.
    #[error("Invalid reference table: {0}")]
    InvalidReference(String),

    /// A dependency cycle was detected between registered stats.
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<StatId> },

    /// Static data could not be loaded.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<serde_json::Error> for CompileError {
    fn from(err: serde_json::Error) -> Self {
        CompileError::InvalidData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_names_combinator() {
        let err = CompileError::TypeMismatch {
            combinator: "AttackWith(MainHand)".into(),
            stat: "Life".into(),
        };
        let display = err.to_string();
        assert!(display.contains("AttackWith(MainHand)"));
        assert!(display.contains("Life"));
    }

    #[test]
    fn test_cycle_error_display() {
        let a = StatId::from_str("A");
        let b = StatId::from_str("B");
        let err = CompileError::Cycle {
            path: vec![a.clone(), b, a],
        };
        assert_eq!(err.to_string(), "Cycle detected: A -> B -> A");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: CompileError = serde_json::from_str::<Vec<u32>>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, CompileError::InvalidData(_)));
    }
}
