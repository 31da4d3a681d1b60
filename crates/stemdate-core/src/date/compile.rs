use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use unicode_normalization::UnicodeNormalization;

use super::catalog::Template;
use super::normalize::RawFields;
use super::token::{Field, Grammar, Piece};
use crate::error::CompileError;

/// Executable matcher derived from one template.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    template: Template,
    rank: usize,
    regex: Regex,
    fields: Vec<Field>,
}

impl CompiledMatcher {
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Position of the template in its source list.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The assembled regular expression.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Fields bound by this matcher, in template order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Captures of the first match anywhere in `stem`.
    pub fn captures(&self, stem: &str) -> Option<RawFields> {
        let caps = self.regex.captures(stem)?;
        let mut raw = RawFields::default();
        for &field in &self.fields {
            if let Some(m) = caps.name(field.group_name()) {
                raw.set(field, m.as_str());
            }
        }
        Some(raw)
    }
}

/// Compile one template against `grammar`.
///
/// Every token becomes a named capture group, every literal an escaped exact
/// match; the whole matcher is case-insensitive and unanchored.
pub fn compile(
    template: &Template,
    rank: usize,
    grammar: &Grammar,
) -> Result<CompiledMatcher, CompileError> {
    let source: String = template.format_string.nfc().collect();
    if source.is_empty() {
        return Err(CompileError::Empty);
    }

    let mut pattern = String::with_capacity(source.len() * 4);
    let mut fields = Vec::new();
    let mut bound = HashSet::new();

    for piece in grammar.tokenize(&source)? {
        match piece {
            Piece::Token { token, field } => {
                if !bound.insert(field) {
                    return Err(CompileError::DuplicateField(field.group_name()));
                }
                pattern.push_str(&format!("(?P<{}>{})", field.group_name(), token.fragment));
                fields.push(field);
            }
            Piece::Literal(text) => pattern.push_str(&regex::escape(&text)),
        }
    }

    if !bound.contains(&Field::Year) && !bound.contains(&Field::ShortYear) {
        return Err(CompileError::MissingYear);
    }
    let has_month_day = bound.contains(&Field::Month) && bound.contains(&Field::Day);
    if !has_month_day && !bound.contains(&Field::DayOfYear) {
        return Err(CompileError::MissingDay);
    }

    let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;

    Ok(CompiledMatcher {
        template: template.clone(),
        rank,
        regex,
        fields,
    })
}
