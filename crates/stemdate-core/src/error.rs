use thiserror::Error;

/// Why a single template could not be turned into a matcher.
///
/// Always recoverable: the catalog drops the template and keeps loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("template is empty")]
    Empty,

    #[error("unterminated quoted literal")]
    UnterminatedQuote,

    #[error("field `{0}` is bound more than once")]
    DuplicateField(&'static str),

    #[error("template binds no year")]
    MissingYear,

    #[error("template binds neither month and day nor day of year")]
    MissingDay,

    #[error("assembled matcher is invalid: {0}")]
    Regex(#[from] regex::Error),
}

/// Problems with the template source or the resulting catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("no date patterns available")]
    Empty,

    #[error("failed to read template file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse templates from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}
