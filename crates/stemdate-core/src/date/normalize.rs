use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use thiserror::Error;

use super::catalog::Template;
use super::token::Field;

/// Two-digit years below this map to 20xx, the rest to 19xx.
pub const SHORT_YEAR_PIVOT: u32 = 70;

/// Unresolved captures from one successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub year: Option<String>,
    pub short_year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub day_of_year: Option<String>,
    pub hour: Option<String>,
    pub hour12: Option<String>,
    pub minute: Option<String>,
    pub second: Option<String>,
    pub millisecond: Option<String>,
    pub meridiem: Option<String>,
    pub zulu: Option<String>,
    pub offset_sign: Option<String>,
    pub offset_hours: Option<String>,
    pub offset_minutes: Option<String>,
}

impl RawFields {
    pub fn set(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::Year => &mut self.year,
            Field::ShortYear => &mut self.short_year,
            Field::Month => &mut self.month,
            Field::Day => &mut self.day,
            Field::DayOfYear => &mut self.day_of_year,
            Field::Hour => &mut self.hour,
            Field::Hour12 => &mut self.hour12,
            Field::Minute => &mut self.minute,
            Field::Second => &mut self.second,
            Field::Millisecond => &mut self.millisecond,
            Field::Meridiem => &mut self.meridiem,
            Field::Zulu => &mut self.zulu,
            Field::OffsetSign => &mut self.offset_sign,
            Field::OffsetHours => &mut self.offset_hours,
            Field::OffsetMinutes => &mut self.offset_minutes,
        };
        *slot = Some(value.to_string());
    }
}

/// A calendar-valid timestamp recovered from a filename.
///
/// Only constructed after validation, so the date and time always exist.
/// Zone and sub-second parts are carried as captured and never resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTimestamp {
    datetime: NaiveDateTime,
    millisecond: Option<u32>,
    offset_sign: Option<char>,
    offset_hours: Option<u32>,
    offset_minutes: Option<u32>,
    zulu: bool,
    matched_format: String,
    kind: String,
}

impl NormalizedTimestamp {
    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    pub fn year(&self) -> i32 {
        self.datetime.year()
    }

    pub fn month(&self) -> u32 {
        self.datetime.month()
    }

    pub fn day(&self) -> u32 {
        self.datetime.day()
    }

    pub fn hour(&self) -> u32 {
        self.datetime.hour()
    }

    pub fn minute(&self) -> u32 {
        self.datetime.minute()
    }

    pub fn second(&self) -> u32 {
        self.datetime.second()
    }

    pub fn millisecond(&self) -> Option<u32> {
        self.millisecond
    }

    pub fn offset_sign(&self) -> Option<char> {
        self.offset_sign
    }

    pub fn offset_hours(&self) -> Option<u32> {
        self.offset_hours
    }

    pub fn offset_minutes(&self) -> Option<u32> {
        self.offset_minutes
    }

    pub fn is_zulu(&self) -> bool {
        self.zulu
    }

    /// Format string of the template that produced this timestamp.
    pub fn matched_format(&self) -> &str {
        &self.matched_format
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// `YYYY:MM:DD HH:MM:SS`, the value metadata writers expect.
    pub fn exif_value(&self) -> String {
        self.datetime.format("%Y:%m:%d %H:%M:%S").to_string()
    }
}

/// Why a structural match did not yield a timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("no year captured")]
    MissingYear,

    #[error("no month and day captured")]
    MissingDay,

    #[error("`{0}` is not a number")]
    Number(String),

    #[error("12-hour value {0} is out of range")]
    Hour12(u32),

    #[error("impossible calendar date")]
    InvalidDate,

    #[error("impossible time of day")]
    InvalidTime,
}

/// Expand a two-digit year around [`SHORT_YEAR_PIVOT`].
pub fn expand_short_year(value: u32) -> i32 {
    if value < SHORT_YEAR_PIVOT {
        2000 + value as i32
    } else {
        1900 + value as i32
    }
}

/// Resolve captures into a validated timestamp.
///
/// Matches without any hour take `default_time` for the whole time of day.
pub fn normalize(
    raw: &RawFields,
    default_time: NaiveTime,
    template: &Template,
) -> Result<NormalizedTimestamp, NormalizeError> {
    let year = resolve_year(raw)?;
    let date = resolve_date(year, raw)?;
    let time = match resolve_hour(raw)? {
        Some(hour) => {
            let minute = parse_opt(raw.minute.as_deref())?.unwrap_or(0);
            let second = parse_opt(raw.second.as_deref())?.unwrap_or(0);
            NaiveTime::from_hms_opt(hour, minute, second).ok_or(NormalizeError::InvalidTime)?
        }
        None => default_time,
    };

    Ok(NormalizedTimestamp {
        datetime: date.and_time(time),
        millisecond: parse_opt(raw.millisecond.as_deref())?,
        offset_sign: raw.offset_sign.as_deref().and_then(|s| s.chars().next()),
        offset_hours: parse_opt(raw.offset_hours.as_deref())?,
        offset_minutes: parse_opt(raw.offset_minutes.as_deref())?,
        zulu: raw.zulu.is_some(),
        matched_format: template.format_string.clone(),
        kind: template.kind.clone(),
    })
}

fn parse_num(s: &str) -> Result<u32, NormalizeError> {
    s.parse().map_err(|_| NormalizeError::Number(s.to_string()))
}

fn parse_opt(s: Option<&str>) -> Result<Option<u32>, NormalizeError> {
    s.map(parse_num).transpose()
}

fn resolve_year(raw: &RawFields) -> Result<i32, NormalizeError> {
    let year = match (&raw.year, &raw.short_year) {
        (Some(year), _) => parse_num(year)? as i32,
        (None, Some(short)) => expand_short_year(parse_num(short)?),
        (None, None) => return Err(NormalizeError::MissingYear),
    };
    if year < 1 {
        return Err(NormalizeError::InvalidDate);
    }
    Ok(year)
}

fn resolve_date(year: i32, raw: &RawFields) -> Result<NaiveDate, NormalizeError> {
    match (&raw.month, &raw.day, &raw.day_of_year) {
        (Some(month), Some(day), _) => {
            NaiveDate::from_ymd_opt(year, parse_num(month)?, parse_num(day)?)
                .ok_or(NormalizeError::InvalidDate)
        }
        (_, _, Some(ordinal)) => {
            NaiveDate::from_yo_opt(year, parse_num(ordinal)?).ok_or(NormalizeError::InvalidDate)
        }
        _ => Err(NormalizeError::MissingDay),
    }
}

/// 24-hour clock hour, if the match carries one.
///
/// A 12-hour capture only counts together with its meridiem.
fn resolve_hour(raw: &RawFields) -> Result<Option<u32>, NormalizeError> {
    if let (Some(hour12), Some(meridiem)) = (&raw.hour12, &raw.meridiem) {
        let hour = parse_num(hour12)?;
        if hour > 12 {
            return Err(NormalizeError::Hour12(hour));
        }
        let pm = meridiem.eq_ignore_ascii_case("pm");
        let hour = match (pm, hour) {
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, 12) => 0,
            (false, h) => h,
        };
        return Ok(Some(hour));
    }
    parse_opt(raw.hour.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        Template::new("test", "test")
    }

    fn default_time() -> NaiveTime {
        NaiveTime::from_hms_opt(20, 0, 0).unwrap()
    }

    fn raw(pairs: &[(Field, &str)]) -> RawFields {
        let mut raw = RawFields::default();
        for (field, value) in pairs {
            raw.set(*field, value);
        }
        raw
    }

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_short_year_pivot() {
        assert_eq!(expand_short_year(25), 2025);
        assert_eq!(expand_short_year(0), 2000);
        assert_eq!(expand_short_year(69), 2069);
        assert_eq!(expand_short_year(70), 1970);
        assert_eq!(expand_short_year(98), 1998);

        let r = raw(&[(Field::ShortYear, "98"), (Field::Month, "01"), (Field::Day, "02")]);
        assert_eq!(normalize(&r, default_time(), &template()).unwrap().year(), 1998);
    }

    #[test]
    fn test_four_digit_year_preferred() {
        let r = raw(&[
            (Field::Year, "2031"),
            (Field::ShortYear, "98"),
            (Field::Month, "01"),
            (Field::Day, "02"),
        ]);
        assert_eq!(normalize(&r, default_time(), &template()).unwrap().year(), 2031);
    }

    #[test]
    fn test_twelve_hour_conversion() {
        let base = [(Field::Year, "2023"), (Field::Month, "07"), (Field::Day, "14")];
        let cases = [
            ("12", "AM", 0),
            ("12", "pm", 12),
            ("07", "PM", 19),
            ("07", "am", 7),
            ("01", "Pm", 13),
        ];
        for (hour, meridiem, expected) in cases {
            let mut r = raw(&base);
            r.set(Field::Hour12, hour);
            r.set(Field::Meridiem, meridiem);
            let ts = normalize(&r, default_time(), &template()).unwrap();
            assert_eq!(ts.hour(), expected, "{} {}", hour, meridiem);
        }

        let mut r = raw(&base);
        r.set(Field::Hour12, "13");
        r.set(Field::Meridiem, "PM");
        assert_eq!(
            normalize(&r, default_time(), &template()),
            Err(NormalizeError::Hour12(13))
        );
    }

    #[test]
    fn test_hour12_without_meridiem_uses_default_time() {
        let r = raw(&[
            (Field::Year, "2023"),
            (Field::Month, "07"),
            (Field::Day, "14"),
            (Field::Hour12, "03"),
            (Field::Minute, "15"),
        ]);
        let ts = normalize(&r, default_time(), &template()).unwrap();
        assert_eq!(ts.datetime(), ymd_hms(2023, 7, 14, 20, 0, 0));
    }

    #[test]
    fn test_missing_minute_second_default_to_zero() {
        let r = raw(&[
            (Field::Year, "2023"),
            (Field::Month, "07"),
            (Field::Day, "14"),
            (Field::Hour, "09"),
        ]);
        let ts = normalize(&r, default_time(), &template()).unwrap();
        assert_eq!(ts.datetime(), ymd_hms(2023, 7, 14, 9, 0, 0));
    }

    #[test]
    fn test_date_only_takes_default_time() {
        let r = raw(&[(Field::Year, "2023"), (Field::Month, "07"), (Field::Day, "14")]);
        let custom = NaiveTime::from_hms_opt(8, 15, 30).unwrap();
        let ts = normalize(&r, custom, &template()).unwrap();
        assert_eq!(ts.datetime(), ymd_hms(2023, 7, 14, 8, 15, 30));
    }

    #[test]
    fn test_calendar_validation() {
        let invalid = [
            ("2023", "13", "01"),
            ("2023", "00", "10"),
            ("2023", "04", "31"),
            ("2023", "02", "29"),
            ("2023", "07", "00"),
            ("0000", "01", "01"),
        ];
        for (y, m, d) in invalid {
            let r = raw(&[(Field::Year, y), (Field::Month, m), (Field::Day, d)]);
            assert_eq!(
                normalize(&r, default_time(), &template()),
                Err(NormalizeError::InvalidDate),
                "{}-{}-{}",
                y,
                m,
                d
            );
        }

        let r = raw(&[(Field::Year, "2024"), (Field::Month, "02"), (Field::Day, "29")]);
        assert!(normalize(&r, default_time(), &template()).is_ok());
    }

    #[test]
    fn test_time_validation() {
        let base = [(Field::Year, "2023"), (Field::Month, "07"), (Field::Day, "14")];
        for (field, value) in [(Field::Hour, "24"), (Field::Minute, "60"), (Field::Second, "60")] {
            let mut r = raw(&base);
            r.set(Field::Hour, "10");
            r.set(field, value);
            assert_eq!(
                normalize(&r, default_time(), &template()),
                Err(NormalizeError::InvalidTime)
            );
        }
    }

    #[test]
    fn test_day_of_year() {
        let r = raw(&[(Field::Year, "2024"), (Field::DayOfYear, "060")]);
        let ts = normalize(&r, default_time(), &template()).unwrap();
        assert_eq!((ts.month(), ts.day()), (2, 29));

        let r = raw(&[(Field::Year, "2023"), (Field::DayOfYear, "366")]);
        assert_eq!(
            normalize(&r, default_time(), &template()),
            Err(NormalizeError::InvalidDate)
        );

        let r = raw(&[
            (Field::Year, "2023"),
            (Field::Month, "07"),
            (Field::Day, "14"),
            (Field::DayOfYear, "001"),
        ]);
        let ts = normalize(&r, default_time(), &template()).unwrap();
        assert_eq!((ts.month(), ts.day()), (7, 14));
    }

    #[test]
    fn test_passthrough_fields() {
        let r = raw(&[
            (Field::Year, "2023"),
            (Field::Month, "07"),
            (Field::Day, "14"),
            (Field::Hour, "15"),
            (Field::Millisecond, "042"),
            (Field::OffsetSign, "-"),
            (Field::OffsetHours, "05"),
            (Field::OffsetMinutes, "30"),
            (Field::Zulu, "z"),
        ]);
        let ts = normalize(&r, default_time(), &template()).unwrap();
        assert_eq!(ts.millisecond(), Some(42));
        assert_eq!(ts.offset_sign(), Some('-'));
        assert_eq!(ts.offset_hours(), Some(5));
        assert_eq!(ts.offset_minutes(), Some(30));
        assert!(ts.is_zulu());
        // Offsets are carried, not applied.
        assert_eq!(ts.hour(), 15);

        let r = raw(&[(Field::Year, "2023"), (Field::Month, "07"), (Field::Day, "14")]);
        let ts = normalize(&r, default_time(), &template()).unwrap();
        assert_eq!(ts.millisecond(), None);
        assert_eq!(ts.offset_sign(), None);
        assert!(!ts.is_zulu());
    }

    #[test]
    fn test_exif_value() {
        let r = raw(&[
            (Field::Year, "2023"),
            (Field::Month, "7"),
            (Field::Day, "4"),
            (Field::Hour, "05"),
            (Field::Minute, "06"),
            (Field::Second, "07"),
        ]);
        let ts = normalize(&r, default_time(), &template()).unwrap();
        assert_eq!(ts.exif_value(), "2023:07:04 05:06:07");
    }
}
