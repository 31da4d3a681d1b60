use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::date::catalog::{Catalog, CatalogBuild, Template};
use crate::date::token::Grammar;
use crate::error::CatalogError;

/// Default template list compiled into the binary.
pub const EMBEDDED_TEMPLATES: &str = include_str!("../templates/date_formats.json");

/// Where a template list was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    Embedded,
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::File(path) => write!(f, "{}", path.display()),
            TemplateSource::Embedded => write!(f, "<embedded>"),
        }
    }
}

/// Template records in file order.
#[derive(Debug, Clone)]
pub struct LoadedTemplates {
    pub source: TemplateSource,
    pub templates: Vec<Template>,
}

/// Parse a JSON array of `{"format_string", "type"}` records.
pub fn parse_templates(json: &str, origin: &str) -> Result<Vec<Template>, CatalogError> {
    serde_json::from_str(json).map_err(|source| CatalogError::Json {
        origin: origin.to_string(),
        source,
    })
}

pub fn embedded_templates() -> Result<Vec<Template>, CatalogError> {
    parse_templates(EMBEDDED_TEMPLATES, "<embedded>")
}

/// Read templates from the first existing candidate file.
///
/// With no candidates the embedded list is used. Candidates that all miss
/// yield [`CatalogError::Empty`]; an existing but unreadable or malformed
/// file is reported as such.
pub fn load_templates(candidates: &[PathBuf]) -> Result<LoadedTemplates, CatalogError> {
    if candidates.is_empty() {
        return Ok(LoadedTemplates {
            source: TemplateSource::Embedded,
            templates: embedded_templates()?,
        });
    }

    for path in candidates {
        if !path.is_file() {
            continue;
        }
        let templates = read_template_file(path)?;
        info!("Loading date patterns from: {}", path.display());
        return Ok(LoadedTemplates {
            source: TemplateSource::File(path.clone()),
            templates,
        });
    }

    let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    warn!("Date formats file not found at expected locations: {}", tried.join(", "));
    Err(CatalogError::Empty)
}

fn read_template_file(path: &Path) -> Result<Vec<Template>, CatalogError> {
    let origin = path.display().to_string();
    let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: origin.clone(),
        source,
    })?;
    parse_templates(&json, &origin)
}

/// Load and compile templates, keeping the rejected ones for review.
pub fn build_catalog(
    candidates: &[PathBuf],
) -> Result<(TemplateSource, CatalogBuild), CatalogError> {
    let loaded = load_templates(candidates)?;
    let build = Catalog::build(&loaded.templates, &Grammar::standard());
    info!(
        "Loaded {} date patterns from {} ({} rejected)",
        build.catalog.len(),
        loaded.source,
        build.rejected.len()
    );
    Ok((loaded.source, build))
}

/// Load and compile templates; an empty result is [`CatalogError::Empty`].
pub fn load_catalog(candidates: &[PathBuf]) -> Result<Catalog, CatalogError> {
    let (_, build) = build_catalog(candidates)?;
    build.catalog.require_patterns()?;
    Ok(build.catalog)
}
