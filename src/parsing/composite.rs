//! Parsing a line in steps.
//!
//! A line is rarely matched by one table. The [`CompositeParser`] runs the
//! parser of the current step on what is left of the line and lets a
//! [`Stepper`] pick the next step depending on whether that parser
//! succeeded.

use crate::error::CompileError;
use crate::parsing::{StringParseResult, StringParser};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use strum::{Display, EnumIter};

/// A state machine over parsing steps.
pub trait Stepper<S>: Send + Sync {
    fn initial_step(&self) -> S;
    fn next_on_success(&self, step: S) -> S;
    fn next_on_failure(&self, step: S) -> S;
    fn is_terminal(&self, step: S) -> bool;
    /// Whether ending in `step` means the line was parsed.
    fn is_success(&self, step: S) -> bool;
}

/// The steps of [`StandardStepper`], one per matcher table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
pub enum ParsingStep {
    /// Whole-line special cases.
    Special,
    StatManipulator,
    ValueConversion,
    FormAndStat,
    Form,
    GeneralStat,
    DamageStat,
    PoolStat,
    Condition,
    ActionCondition,
    Success,
    Failure,
}

/// The usual order: special lines, then form and stat, then conditions.
///
/// # Examples
///
/// ```rust
/// use zzmod::parsing::{ParsingStep, StandardStepper, Stepper};
///
/// let stepper = StandardStepper;
/// assert_eq!(stepper.initial_step(), ParsingStep::Special);
/// assert_eq!(stepper.next_on_success(ParsingStep::Special), ParsingStep::Success);
/// assert_eq!(stepper.next_on_failure(ParsingStep::Form), ParsingStep::Failure);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardStepper;

impl Stepper<ParsingStep> for StandardStepper {
    fn initial_step(&self) -> ParsingStep {
        ParsingStep::Special
    }

    fn next_on_success(&self, step: ParsingStep) -> ParsingStep {
        use ParsingStep::*;
        match step {
            Special => Success,
            StatManipulator => ValueConversion,
            ValueConversion => FormAndStat,
            FormAndStat => Condition,
            Form => GeneralStat,
            GeneralStat | DamageStat | PoolStat => Condition,
            Condition => Condition,
            ActionCondition => Success,
            Success => Success,
            Failure => Failure,
        }
    }

    fn next_on_failure(&self, step: ParsingStep) -> ParsingStep {
        use ParsingStep::*;
        match step {
            Special => StatManipulator,
            StatManipulator => ValueConversion,
            ValueConversion => FormAndStat,
            FormAndStat => Form,
            Form => Failure,
            GeneralStat => DamageStat,
            DamageStat => PoolStat,
            PoolStat => Failure,
            Condition => ActionCondition,
            ActionCondition => Success,
            Success => Success,
            Failure => Failure,
        }
    }

    fn is_terminal(&self, step: ParsingStep) -> bool {
        matches!(step, ParsingStep::Success | ParsingStep::Failure)
    }

    fn is_success(&self, step: ParsingStep) -> bool {
        step == ParsingStep::Success
    }
}

/// Runs one parser per step until the stepper reaches a terminal step.
///
/// The remaining text is handed from step to step, whether the step
/// succeeded or not. Results of successful steps are collected in order.
/// Steps without a parser fail.
pub struct CompositeParser<S, T> {
    stepper: Box<dyn Stepper<S>>,
    parsers: HashMap<S, Arc<dyn StringParser<T>>>,
}

impl<S, T> CompositeParser<S, T>
where
    S: Copy + Eq + Hash + Debug + Send + Sync,
{
    pub fn new(
        stepper: impl Stepper<S> + 'static,
        parsers: HashMap<S, Arc<dyn StringParser<T>>>,
    ) -> Self {
        Self {
            stepper: Box::new(stepper),
            parsers,
        }
    }
}

impl<S, T> StringParser<Vec<T>> for CompositeParser<S, T>
where
    S: Copy + Eq + Hash + Debug + Send + Sync,
{
    fn parse(&self, text: &str) -> Result<StringParseResult<Vec<T>>, CompileError> {
        let mut step = self.stepper.initial_step();
        let mut remaining = text.to_string();
        let mut results = Vec::new();

        while !self.stepper.is_terminal(step) {
            let Some(parser) = self.parsers.get(&step) else {
                step = self.stepper.next_on_failure(step);
                continue;
            };
            let parsed = parser.parse(&remaining)?;
            tracing::debug!(
                "Step {:?} on '{}': success={}, remaining='{}'",
                step,
                remaining,
                parsed.success,
                parsed.remaining
            );
            let consumed = parsed.remaining != remaining;
            remaining = parsed.remaining;
            step = if parsed.success {
                results.push(parsed.result);
                let next = self.stepper.next_on_success(step);
                // A step repeating itself must make progress.
                if next == step && !consumed {
                    self.stepper.next_on_failure(step)
                } else {
                    next
                }
            } else {
                self.stepper.next_on_failure(step)
            };
        }

        Ok(StringParseResult {
            success: self.stepper.is_success(step),
            remaining,
            result: results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Strips `token` from the text; fails if it isn't there.
    struct TokenParser(&'static str);

    impl StringParser<&'static str> for TokenParser {
        fn parse(&self, text: &str) -> Result<StringParseResult<&'static str>, CompileError> {
            Ok(match text.find(self.0) {
                Some(_) => StringParseResult::success(
                    text.replacen(self.0, "", 1).trim().to_string(),
                    self.0,
                ),
                None => StringParseResult::failure(text, self.0),
            })
        }
    }

    fn parser(tokens: &[(ParsingStep, &'static str)]) -> CompositeParser<ParsingStep, &'static str> {
        let parsers = tokens
            .iter()
            .map(|(step, token)| {
                (*step, Arc::new(TokenParser(token)) as Arc<dyn StringParser<&'static str>>)
            })
            .collect();
        CompositeParser::new(StandardStepper, parsers)
    }

    #[rstest]
    #[case(ParsingStep::Special, ParsingStep::Success, ParsingStep::StatManipulator)]
    #[case(ParsingStep::FormAndStat, ParsingStep::Condition, ParsingStep::Form)]
    #[case(ParsingStep::Form, ParsingStep::GeneralStat, ParsingStep::Failure)]
    #[case(ParsingStep::GeneralStat, ParsingStep::Condition, ParsingStep::DamageStat)]
    #[case(ParsingStep::DamageStat, ParsingStep::Condition, ParsingStep::PoolStat)]
    #[case(ParsingStep::PoolStat, ParsingStep::Condition, ParsingStep::Failure)]
    #[case(ParsingStep::Condition, ParsingStep::Condition, ParsingStep::ActionCondition)]
    #[case(ParsingStep::ActionCondition, ParsingStep::Success, ParsingStep::Success)]
    fn test_standard_transitions(
        #[case] step: ParsingStep,
        #[case] on_success: ParsingStep,
        #[case] on_failure: ParsingStep,
    ) {
        assert_eq!(StandardStepper.next_on_success(step), on_success);
        assert_eq!(StandardStepper.next_on_failure(step), on_failure);
    }

    #[test]
    fn test_special_line_short_circuits() {
        let parser = parser(&[(ParsingStep::Special, "special"), (ParsingStep::Form, "form")]);
        let result = parser.parse("special").unwrap();
        assert!(result.success);
        assert_eq!(result.result, vec!["special"]);
    }

    #[test]
    fn test_form_stat_and_conditions() {
        let parser = parser(&[
            (ParsingStep::Form, "increased"),
            (ParsingStep::DamageStat, "fire damage"),
            (ParsingStep::Condition, "while"),
        ]);
        let result = parser.parse("increased fire damage while while").unwrap();
        assert!(result.success);
        assert_eq!(result.remaining, "");
        assert_eq!(result.result, vec!["increased", "fire damage", "while", "while"]);
    }

    #[test]
    fn test_missing_stat_fails_with_remaining() {
        let parser = parser(&[(ParsingStep::Form, "increased"), (ParsingStep::GeneralStat, "life")]);
        let result = parser.parse("increased mana").unwrap();
        assert!(!result.success);
        assert_eq!(result.remaining, "mana");
    }

    #[test]
    fn test_condition_loop_stops_without_progress() {
        struct Always;
        impl StringParser<&'static str> for Always {
            fn parse(&self, text: &str) -> Result<StringParseResult<&'static str>, CompileError> {
                Ok(StringParseResult::success(text, "noop"))
            }
        }
        let mut parsers: HashMap<ParsingStep, Arc<dyn StringParser<&'static str>>> = HashMap::new();
        parsers.insert(ParsingStep::FormAndStat, Arc::new(TokenParser("x")));
        parsers.insert(ParsingStep::Condition, Arc::new(Always));
        let parser = CompositeParser::new(StandardStepper, parsers);
        let result = parser.parse("x").unwrap();
        assert!(result.success);
        assert_eq!(result.result, vec!["x", "noop"]);
    }
}
