//! The full parser from modifier line to built modifiers.

use crate::builders::ModifierBuilder;
use crate::error::CompileError;
use crate::game::Entity;
use crate::modifier::{BuildParameters, Modifier};
use crate::parsing::composite::{CompositeParser, ParsingStep, StandardStepper};
use crate::parsing::decorators::{
    CachingParser, NormalizingParser, StatReplacerData, StatReplacingParser, ValidatingParser,
};
use crate::parsing::expander::RegexExpander;
use crate::parsing::matchers::{MatcherDataParser, ReferencedMatchers, StatMatchers};
use crate::parsing::references::{ReferenceService, ReferenceValidator};
use crate::parsing::resolving::ResolvingParser;
use crate::parsing::{ParserConfig, StringParser};
use crate::source::ModifierSource;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Everything the parser is built from.
#[derive(Debug, Clone, Default)]
pub struct ParsingData {
    pub referenced_matchers: Vec<ReferencedMatchers>,
    /// The table each step matches against.
    pub stat_matchers: BTreeMap<ParsingStep, StatMatchers>,
    pub stat_replacers: Vec<StatReplacerData>,
}

/// Outcome of parsing one line.
#[derive(Debug, Clone)]
pub enum ParseResult {
    Success(Vec<Modifier>),
    /// The line, or parts of it, could not be parsed.
    Failure { line: String, remaining: String },
}

impl ParseResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseResult::Success(_))
    }

    /// Modifiers of a successful parse; empty on failure.
    pub fn modifiers(&self) -> &[Modifier] {
        match self {
            ParseResult::Success(modifiers) => modifiers,
            ParseResult::Failure { .. } => &[],
        }
    }
}

type LineParser = Box<dyn StringParser<Vec<Vec<ModifierBuilder>>>>;
type CacheKey = (String, ModifierSource, Entity);

/// Parses modifier lines into modifiers.
///
/// The line is validated, normalized and split by the stat replacers; each
/// part runs through the step tables of a [`StandardStepper`]. The
/// intermediate modifiers of a part are aggregated, resolved and built for
/// the given source.
///
/// # Examples
///
/// ```rust
/// use zzmod::builders::{FormBuilder, ModifierBuilder, StatBuilder, ValueBuilder};
/// use zzmod::game::Entity;
/// use zzmod::parsing::{CoreParser, MatcherData, ParsingData, ParsingStep, StatMatchers};
/// use zzmod::source::ModifierSource;
///
/// let life = ModifierBuilder::new()
///     .with_form(FormBuilder::base_add()).unwrap()
///     .with_stat(StatBuilder::from_identity("Life")).unwrap()
///     .with_value(ValueBuilder::placeholder(0)).unwrap();
///
/// let mut data = ParsingData::default();
/// data.stat_matchers.insert(
///     ParsingStep::FormAndStat,
///     StatMatchers::new(vec![MatcherData::new("# to maximum life", life)]),
/// );
/// let parser = CoreParser::new(data).unwrap();
///
/// let result = parser.parse("+20 to maximum Life", ModifierSource::Global, Entity::Character);
/// assert!(result.is_success());
/// assert_eq!(result.modifiers()[0].to_string(), "Life (Character) BaseAdd: 20");
///
/// assert!(!parser.parse("+20 to maximum Mana", ModifierSource::Global, Entity::Character).is_success());
/// ```
pub struct CoreParser {
    parser: LineParser,
    cache: Option<RwLock<HashMap<CacheKey, ParseResult>>>,
}

impl CoreParser {
    pub fn new(data: ParsingData) -> Result<Self, CompileError> {
        Self::with_config(data, ParserConfig::default())
    }

    /// Validate the tables and assemble the parser stack.
    pub fn with_config(data: ParsingData, config: ParserConfig) -> Result<Self, CompileError> {
        let tables: Vec<StatMatchers> = data.stat_matchers.values().cloned().collect();
        ReferenceValidator::validate(&data.referenced_matchers, &tables)?;

        let references = Arc::new(ReferenceService::new(data.referenced_matchers, tables));
        let expander = RegexExpander::new(references.clone());

        let mut step_parsers: HashMap<ParsingStep, Arc<dyn StringParser<ModifierBuilder>>> =
            HashMap::new();
        for (step, table) in &data.stat_matchers {
            let matcher = MatcherDataParser::new(expander.expand(table)?, config.case_insensitive)?;
            tracing::debug!("Step {} matches against {} regexes", step, matcher.len());
            let resolving: Box<dyn StringParser<ModifierBuilder>> =
                Box::new(ResolvingParser::new(Box::new(matcher), references.clone()));
            step_parsers.insert(*step, Arc::from(decorate(resolving, &config)));
        }

        let composite = CompositeParser::new(StandardStepper, step_parsers);
        let replacing: LineParser = Box::new(StatReplacingParser::new(
            Box::new(composite),
            data.stat_replacers,
            config.case_insensitive,
        )?);
        let normalized: LineParser = if config.normalize_whitespace {
            Box::new(NormalizingParser::new(replacing))
        } else {
            replacing
        };
        let parser = Box::new(ValidatingParser::new(normalized, config.hidden_suffix));

        Ok(Self {
            parser,
            cache: config.cache.then(|| RwLock::new(HashMap::new())),
        })
    }

    /// Parse `line` for modifiers of `source`, owned by `entity`.
    ///
    /// Never fails: compile errors are logged and reported as failures.
    pub fn parse(&self, line: &str, source: ModifierSource, entity: Entity) -> ParseResult {
        let Some(cache) = &self.cache else {
            return self.parse_uncached(line, source, entity);
        };
        let key = (line.to_string(), source, entity);
        if let Some(hit) = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit.clone();
        }
        let result = self.parse_uncached(line, key.1.clone(), entity);
        cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, result.clone());
        result
    }

    fn parse_uncached(&self, line: &str, source: ModifierSource, entity: Entity) -> ParseResult {
        let parameters = BuildParameters::new(source, entity);
        match self.try_parse(line, &parameters) {
            Ok(result) => result,
            Err(err) => {
                tracing::error!("Failed to compile '{}': {}", line, err);
                ParseResult::Failure {
                    line: line.to_string(),
                    remaining: line.to_string(),
                }
            }
        }
    }

    fn try_parse(
        &self,
        line: &str,
        parameters: &BuildParameters,
    ) -> Result<ParseResult, CompileError> {
        let parsed = self.parser.parse(line)?;
        if !parsed.success {
            tracing::warn!("Could not parse '{}', remaining: '{}'", line, parsed.remaining);
            return Ok(ParseResult::Failure {
                line: line.to_string(),
                remaining: parsed.remaining,
            });
        }
        let mut modifiers = Vec::new();
        for part in parsed.result {
            modifiers.extend(ModifierBuilder::aggregate(part)?.build(parameters)?);
        }
        Ok(ParseResult::Success(modifiers))
    }
}

/// Wrap a step parser with whitespace normalization and caching.
fn decorate<T: Clone + Send + Sync + 'static>(
    parser: Box<dyn StringParser<T>>,
    config: &ParserConfig,
) -> Box<dyn StringParser<T>> {
    let parser: Box<dyn StringParser<T>> = if config.normalize_whitespace {
        Box::new(NormalizingParser::new(parser))
    } else {
        parser
    };
    if config.cache {
        Box::new(CachingParser::new(parser))
    } else {
        parser
    }
}
