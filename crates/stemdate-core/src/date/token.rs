use crate::error::CompileError;

/// Semantic field a template token binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Year,
    ShortYear,
    Month,
    Day,
    DayOfYear,
    Hour,
    Hour12,
    Minute,
    Second,
    Millisecond,
    Meridiem,
    Zulu,
    OffsetSign,
    OffsetHours,
    OffsetMinutes,
}

impl Field {
    /// Capture group name used in compiled matchers.
    pub fn group_name(self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::ShortYear => "shortyear",
            Field::Month => "month",
            Field::Day => "day",
            Field::DayOfYear => "dayofyear",
            Field::Hour => "hour",
            Field::Hour12 => "hour12",
            Field::Minute => "minute",
            Field::Second => "second",
            Field::Millisecond => "millisecond",
            Field::Meridiem => "ampm",
            Field::Zulu => "zulu",
            Field::OffsetSign => "offset_sign",
            Field::OffsetHours => "offset_hh",
            Field::OffsetMinutes => "offset_mm",
        }
    }

    fn is_hour(self) -> bool {
        matches!(self, Field::Hour | Field::Hour12)
    }
}

/// A placeholder spelling in a template and the fragment it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub spelling: &'static str,
    pub field: Field,
    pub fragment: &'static str,
}

const fn token(spelling: &'static str, field: Field, fragment: &'static str) -> Token {
    Token {
        spelling,
        field,
        fragment,
    }
}

// Digit classes are ASCII only; captured values are parsed as plain integers.
const STANDARD_TOKENS: &[Token] = &[
    token("YYYY", Field::Year, "[0-9]{4}"),
    token("YY", Field::ShortYear, "[0-9]{2}"),
    token("MM", Field::Month, "[0-9]{2}"),
    token("M", Field::Month, "[0-9]{1,2}"),
    token("DDD", Field::DayOfYear, "[0-9]{3}"),
    token("DD", Field::Day, "[0-9]{2}"),
    token("D", Field::Day, "[0-9]{1,2}"),
    token("HH", Field::Hour, "[0-9]{2}"),
    token("hh", Field::Hour12, "[0-9]{2}"),
    token("mm", Field::Minute, "[0-9]{2}"),
    token("SS", Field::Second, "[0-9]{2}"),
    token("fff", Field::Millisecond, "[0-9]{3}"),
    token("AMPM", Field::Meridiem, "[ap]m"),
    token("Z", Field::Zulu, "Z"),
    token("TZ_SIGN", Field::OffsetSign, "[+-]"),
    token("TZ_HH", Field::OffsetHours, "[0-9]{2}"),
    token("TZ_MM", Field::OffsetMinutes, "[0-9]{2}"),
];

/// One scanned piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// A token together with the field it binds at this position.
    Token { token: Token, field: Field },
    /// A run of literal text, matched exactly.
    Literal(String),
}

/// Immutable token table with a maximal-munch tokenizer.
///
/// Tokens are kept sorted by descending spelling length so that, at any
/// template position, the first spelling that matches is the longest one
/// (`YYYY` before `YY`, `DDD` before `DD` before `D`, `TZ_HH` before `Z`).
#[derive(Debug, Clone)]
pub struct Grammar {
    tokens: Vec<Token>,
}

impl Grammar {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().collect();
        // Stable: equal-length spellings keep table order.
        tokens.sort_by(|a, b| b.spelling.len().cmp(&a.spelling.len()));
        Self { tokens }
    }

    /// The built-in token table.
    pub fn standard() -> Self {
        Self::new(STANDARD_TOKENS.iter().copied())
    }

    /// Tokens in scan order (longest spelling first).
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn longest_at(&self, rest: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| rest.starts_with(t.spelling))
    }

    /// Split a template into tokens and literal runs.
    ///
    /// Text between single quotes is literal (`''` is a literal quote). A
    /// month token whose nearest preceding token is an hour binds the minute
    /// field instead, so `HHMMSS` reads as hour/minute/second.
    pub fn tokenize(&self, template: &str) -> Result<Vec<Piece>, CompileError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut previous: Option<Field> = None;
        let mut rest = template;

        while let Some(c) = rest.chars().next() {
            if let Some(after) = rest.strip_prefix("''") {
                literal.push('\'');
                rest = after;
                continue;
            }
            if c == '\'' {
                let (text, after) =
                    take_quoted(&rest[1..]).ok_or(CompileError::UnterminatedQuote)?;
                literal.push_str(&text);
                rest = after;
                continue;
            }
            if let Some(token) = self.longest_at(rest) {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                let field = match (token.field, previous) {
                    (Field::Month, Some(prev)) if prev.is_hour() => Field::Minute,
                    (field, _) => field,
                };
                pieces.push(Piece::Token {
                    token: *token,
                    field,
                });
                previous = Some(token.field);
                rest = &rest[token.spelling.len()..];
                continue;
            }
            literal.push(c);
            rest = &rest[c.len_utf8()..];
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(pieces)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::standard()
    }
}

/// Consume quoted text up to the closing quote. Returns the literal text and
/// the remainder after the quote, or `None` if the quote never closes.
fn take_quoted(s: &str) -> Option<(String, &str)> {
    let mut text = String::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if let Some(&(_, '\'')) = chars.peek() {
                chars.next();
                text.push('\'');
                continue;
            }
            return Some((text, &s[i + 1..]));
        }
        text.push(c);
    }
    None
}
