//! Binding the placeholders of a matched template to what the regex captured.

use crate::builders::{ModifierBuilder, Reference, ResolveContext};
use crate::error::CompileError;
use crate::parsing::matchers::MatcherDataParseResult;
use crate::parsing::references::ReferenceService;
use crate::parsing::regex_groups::{ParsedReference, RegexGroupService, RegexGroups};
use crate::parsing::{StringParseResult, StringParser};
use std::sync::Arc;

/// Resolves the modifier template of a successful match.
///
/// Values are read from the captured text. References resolve to the
/// entry of a referenced table, or, for stat matcher tables, to the stat
/// builder of that entry's template, resolved against the captures nested
/// inside the reference.
pub struct ResolvingParser {
    inner: Box<dyn StringParser<MatcherDataParseResult>>,
    references: Arc<ReferenceService>,
}

impl ResolvingParser {
    pub fn new(
        inner: Box<dyn StringParser<MatcherDataParseResult>>,
        references: Arc<ReferenceService>,
    ) -> Self {
        Self { inner, references }
    }

    fn create_context(
        &self,
        groups: &RegexGroups,
        prefix: &str,
    ) -> Result<ResolveContext, CompileError> {
        let values = RegexGroupService::parse_values(groups, prefix)?;
        let references = RegexGroupService::parse_references(groups.names(), prefix)
            .iter()
            .map(|reference| self.resolve_nested(groups, reference))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolveContext::new(values, references))
    }

    fn resolve_nested(
        &self,
        groups: &RegexGroups,
        reference: &ParsedReference,
    ) -> Result<Reference, CompileError> {
        let ParsedReference {
            name,
            matcher_index,
            nested_prefix,
        } = reference;
        if let Some(data) = self
            .references
            .get_referenced_matcher_data(name, *matcher_index)
        {
            return Ok(data.reference.clone());
        }
        if let Some(data) = self.references.get_matcher_data(name, *matcher_index) {
            let context = self.create_context(groups, nested_prefix)?;
            return data
                .modifier
                .resolve_to_referenced_builder(&context)
                .map(Reference::Stat);
        }
        Err(CompileError::UnknownReference {
            name: name.clone(),
            matcher_index: *matcher_index,
        })
    }
}

impl StringParser<ModifierBuilder> for ResolvingParser {
    fn parse(&self, text: &str) -> Result<StringParseResult<ModifierBuilder>, CompileError> {
        let parsed = self.inner.parse(text)?;
        if !parsed.success {
            return Ok(parsed.map(|r| r.modifier));
        }
        let context = self.create_context(&parsed.result.groups, "")?;
        let modifier = parsed.result.modifier.resolve(&context)?;
        Ok(StringParseResult::success(parsed.remaining, modifier))
    }
}
