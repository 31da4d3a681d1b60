pub mod catalog;
pub mod compile;
pub mod exif;
pub mod guess;
pub mod normalize;
pub mod token;

use std::io::{BufRead, Seek};

use chrono::NaiveDateTime;

use guess::DateGuesser;
use normalize::NormalizedTimestamp;

/// Where a file's capture date comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateResult {
    /// The file already carries an EXIF capture date; nothing to backfill.
    Exif(NaiveDateTime),
    /// Inferred from the filename.
    Filename(NormalizedTimestamp),
}

/// Resolve a capture date using all sources in priority order.
///
/// `media` is only consulted when given, so callers that do not care
/// about existing metadata skip the EXIF read entirely.
pub fn extract_date<R: BufRead + Seek>(
    media: Option<&mut R>,
    stem: &str,
    guesser: &DateGuesser,
) -> Option<DateResult> {
    // 1. Existing EXIF
    if let Some(reader) = media {
        if let Some(date) = exif::extract_exif_date(reader) {
            return Some(DateResult::Exif(date));
        }
    }

    // 2. Filename
    guesser.guess(stem).map(DateResult::Filename)
}
