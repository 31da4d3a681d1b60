use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::compile::{compile, CompiledMatcher};
use super::token::Grammar;
use crate::error::{CatalogError, CompileError};

fn default_kind() -> String {
    "N/A".to_string()
}

/// A date-format template record, e.g. `{"format_string": "YYYYMMDD", "type": "compact"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub format_string: String,
    /// Free-form label, only used in diagnostics and reports.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

impl Template {
    pub fn new(format_string: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            format_string: format_string.into(),
            kind: kind.into(),
        }
    }
}

/// A template that failed to compile.
#[derive(Debug, Clone)]
pub struct Rejected {
    pub rank: usize,
    pub template: Template,
    pub error: CompileError,
}

/// Outcome of compiling a template list.
#[derive(Debug, Clone, Default)]
pub struct CatalogBuild {
    pub catalog: Catalog,
    pub rejected: Vec<Rejected>,
}

/// Ordered compiled matchers. Order is precedence; immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    matchers: Vec<CompiledMatcher>,
}

impl Catalog {
    /// Compile every template independently, keeping the failures for review.
    pub fn build(templates: &[Template], grammar: &Grammar) -> CatalogBuild {
        let mut matchers = Vec::with_capacity(templates.len());
        let mut rejected = Vec::new();

        for (rank, template) in templates.iter().enumerate() {
            match compile(template, rank, grammar) {
                Ok(matcher) => {
                    debug!("Compiled '{}' -> {}", template.format_string, matcher.pattern());
                    matchers.push(matcher);
                }
                Err(error) => {
                    warn!(
                        "Skipping date template '{}' ({}): {}",
                        template.format_string, template.kind, error
                    );
                    rejected.push(Rejected {
                        rank,
                        template: template.clone(),
                        error,
                    });
                }
            }
        }

        CatalogBuild {
            catalog: Catalog { matchers },
            rejected,
        }
    }

    /// Compile with the standard grammar, logging and dropping failures.
    pub fn load(templates: &[Template]) -> Catalog {
        Self::build(templates, &Grammar::standard()).catalog
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Matchers in precedence order.
    pub fn iter(&self) -> std::slice::Iter<'_, CompiledMatcher> {
        self.matchers.iter()
    }

    /// Fails with [`CatalogError::Empty`] when nothing could ever match.
    pub fn require_patterns(&self) -> Result<(), CatalogError> {
        if self.is_empty() {
            Err(CatalogError::Empty)
        } else {
            Ok(())
        }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CompiledMatcher;
    type IntoIter = std::slice::Iter<'a, CompiledMatcher>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
