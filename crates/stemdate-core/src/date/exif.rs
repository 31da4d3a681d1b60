use chrono::NaiveDateTime;
use exif::{In, Reader, Tag};
use serde::Serialize;
use std::io::{BufRead, Seek};

/// Capture-date tags a backfill writes, under their exiftool names.
pub const CAPTURE_TAGS: [(Tag, &str); 3] = [
    (Tag::DateTimeOriginal, "DateTimeOriginal"),
    (Tag::DateTimeDigitized, "CreateDate"),
    (Tag::DateTime, "ModifyDate"),
];

/// Which capture-date tags a file already carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureTags {
    pub present: Vec<&'static str>,
    pub missing: Vec<&'static str>,
}

impl CaptureTags {
    pub fn all_missing() -> Self {
        Self {
            present: Vec::new(),
            missing: CAPTURE_TAGS.iter().map(|(_, name)| *name).collect(),
        }
    }

    pub fn found_count(&self) -> usize {
        self.present.len()
    }
}

/// Report capture-tag presence for an image stream.
///
/// Only the container header is read for JPEG, PNG and HEIF. A file
/// without any EXIF block has every tag missing; any other decode failure
/// is returned.
pub fn read_capture_tags<R: BufRead + Seek>(media: &mut R) -> Result<CaptureTags, exif::Error> {
    let reader = match Reader::new().read_from_container(media) {
        Ok(reader) => reader,
        Err(exif::Error::NotFound(_)) => return Ok(CaptureTags::all_missing()),
        Err(e) => return Err(e),
    };

    let mut tags = CaptureTags::default();
    for (tag, name) in CAPTURE_TAGS {
        if reader.get_field(tag, In::PRIMARY).is_some() {
            tags.present.push(name);
        } else {
            tags.missing.push(name);
        }
    }
    Ok(tags)
}

/// Existing capture date in an image stream, if any.
/// EXIF datetimes have no timezone info - they are local time as-is.
pub fn extract_exif_date<R: BufRead + Seek>(media: &mut R) -> Option<NaiveDateTime> {
    let reader = Reader::new().read_from_container(media).ok()?;

    for (tag, _) in CAPTURE_TAGS {
        if let Some(field) = reader.get_field(tag, In::PRIMARY) {
            let val = field.display_value().to_string();
            if let Some(dt) = parse_exif_datetime(&val) {
                return Some(dt);
            }
        }
    }

    None
}

fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s
        .replace('-', ":")
        .replace('/', ":")
        .replace('\\', ":")
        .replace('.', ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    if let Ok(d) = chrono::NaiveDate::parse_from_str(cleaned.split(' ').next()?, "%Y:%m:%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    None
}

/// A JPEG whose only EXIF field is IFD0 `DateTime` (`YYYY:MM:DD HH:MM:SS`).
#[cfg(test)]
pub(crate) fn jpeg_with_modify_date(datetime: &str) -> Vec<u8> {
    assert_eq!(datetime.len(), 19);
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08");
    tiff.extend_from_slice(&[0x00, 0x01]);
    // DateTime, ASCII, 20 bytes at offset 26
    tiff.extend_from_slice(&[0x01, 0x32, 0x00, 0x02, 0x00, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x1a]);
    tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    tiff.extend_from_slice(datetime.as_bytes());
    tiff.push(0);

    let segment_len = (2 + 6 + tiff.len()) as u16;
    let mut jpeg = vec![0xff, 0xd8, 0xff, 0xe1];
    jpeg.extend_from_slice(&segment_len.to_be_bytes());
    jpeg.extend_from_slice(b"Exif\x00\x00");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xff, 0xd9]);
    jpeg
}
