use std::path::Path;

use chrono::NaiveTime;
use log::debug;
use unicode_normalization::UnicodeNormalization;

use super::catalog::Catalog;
use super::normalize::{normalize, NormalizedTimestamp};

/// Time of day (`HH:MM:SS`) used when a template carries a date but no hour.
pub const DEFAULT_TIME_OF_DAY: &str = "20:00:00";

/// [`DEFAULT_TIME_OF_DAY`] as a time value.
pub fn default_time_of_day() -> NaiveTime {
    DEFAULT_TIME_OF_DAY.parse().unwrap_or(NaiveTime::MIN)
}

/// Applies a catalog to filename stems.
///
/// Holds no mutable state; one guesser can serve any number of threads.
#[derive(Debug, Clone)]
pub struct DateGuesser {
    catalog: Catalog,
    default_time: NaiveTime,
}

impl DateGuesser {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            default_time: default_time_of_day(),
        }
    }

    pub fn with_default_time(mut self, default_time: NaiveTime) -> Self {
        self.default_time = default_time;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn default_time(&self) -> NaiveTime {
        self.default_time
    }

    /// First valid timestamp in `stem`, or `None`.
    ///
    /// Templates are tried in catalog order and each looks for its first
    /// match anywhere in the stem. The winner is the first template whose
    /// match also normalizes to a real date and time; a match describing an
    /// impossible date does not stop the search, the next template is tried.
    pub fn guess(&self, stem: &str) -> Option<NormalizedTimestamp> {
        let stem: String = stem.nfc().collect();
        for matcher in &self.catalog {
            let Some(raw) = matcher.captures(&stem) else {
                continue;
            };
            match normalize(&raw, self.default_time, matcher.template()) {
                Ok(ts) => {
                    debug!("{}: matched '{}'", stem, matcher.template().format_string);
                    return Some(ts);
                }
                Err(e) => {
                    debug!(
                        "{}: '{}' matched but was rejected: {}",
                        stem,
                        matcher.template().format_string,
                        e
                    );
                }
            }
        }
        None
    }

    /// Like [`guess`](Self::guess) on a file name, dropping directory and extension.
    pub fn guess_filename(&self, filename: &str) -> Option<NormalizedTimestamp> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        self.guess(stem)
    }
}
