//! Column default values as reported by `PRAGMA table_info`.
//!
//! The catalog reports a default as the SQL text of the `DEFAULT` clause.
//! [`DefaultValue::parse`] recognizes literal forms and the three
//! `CURRENT_*` keywords; anything else (function calls, arithmetic) has no
//! literal meaning and parses to `None`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("static regex must compile"));
static HEX_INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-]?)0[xX]([0-9a-fA-F]+)$").expect("static regex must compile"));
static REAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("static regex must compile")
});
static BLOB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[xX]'((?:[0-9a-fA-F]{2})*)'$").expect("static regex must compile")
});

/// A literal column default.
///
/// `Null` is an explicit `DEFAULT NULL` and is distinct from a column that
/// declares no default at all (which is `None` at the column level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
}

/// Kind tag of a [`DefaultValue`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultKind {
    Null,
    Integer,
    Real,
    Text,
    Blob,
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
}

impl DefaultValue {
    /// Parses the SQL text of a `DEFAULT` clause.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlsynth_core::DefaultValue;
    ///
    /// assert_eq!(DefaultValue::parse("NULL"), Some(DefaultValue::Null));
    /// assert_eq!(DefaultValue::parse("-42"), Some(DefaultValue::Integer(-42)));
    /// assert_eq!(DefaultValue::parse("'it''s'"), Some(DefaultValue::Text("it's".into())));
    /// assert_eq!(DefaultValue::parse("X'0AFF'"), Some(DefaultValue::Blob(vec![0x0a, 0xff])));
    /// assert_eq!(DefaultValue::parse("current_timestamp"), Some(DefaultValue::CurrentTimestamp));
    /// assert_eq!(DefaultValue::parse("(datetime('now'))"), None);
    /// ```
    pub fn parse(sql: &str) -> Option<Self> {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return None;
        }

        // `DEFAULT (expr)` is reported with its parentheses.
        if let Some(inner) = trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            return Self::parse(inner);
        }

        match trimmed.to_ascii_uppercase().as_str() {
            "NULL" => return Some(Self::Null),
            "TRUE" => return Some(Self::Integer(1)),
            "FALSE" => return Some(Self::Integer(0)),
            "CURRENT_DATE" => return Some(Self::CurrentDate),
            "CURRENT_TIME" => return Some(Self::CurrentTime),
            "CURRENT_TIMESTAMP" => return Some(Self::CurrentTimestamp),
            _ => {}
        }

        if let Some(text) = unquote(trimmed, '\'').or_else(|| unquote(trimmed, '"')) {
            return Some(Self::Text(text));
        }

        if let Some(caps) = BLOB_RE.captures(trimmed) {
            return decode_hex(&caps[1]).map(Self::Blob);
        }

        if INTEGER_RE.is_match(trimmed) {
            // Out-of-range integers are stored by SQLite as reals.
            return match trimmed.parse::<i64>() {
                Ok(value) => Some(Self::Integer(value)),
                Err(_) => parse_finite(trimmed).map(Self::Real),
            };
        }

        if let Some(caps) = HEX_INTEGER_RE.captures(trimmed) {
            let magnitude = u64::from_str_radix(&caps[2], 16).ok()?;
            let value = magnitude as i64;
            return Some(Self::Integer(if &caps[1] == "-" { value.wrapping_neg() } else { value }));
        }

        if REAL_RE.is_match(trimmed) {
            return parse_finite(trimmed).map(Self::Real);
        }

        None
    }

    pub fn kind(&self) -> DefaultKind {
        match self {
            Self::Null => DefaultKind::Null,
            Self::Integer(_) => DefaultKind::Integer,
            Self::Real(_) => DefaultKind::Real,
            Self::Text(_) => DefaultKind::Text,
            Self::Blob(_) => DefaultKind::Blob,
            Self::CurrentDate => DefaultKind::CurrentDate,
            Self::CurrentTime => DefaultKind::CurrentTime,
            Self::CurrentTimestamp => DefaultKind::CurrentTimestamp,
        }
    }
}

impl fmt::Display for DefaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Integer => write!(f, "integer"),
            Self::Real => write!(f, "real"),
            Self::Text => write!(f, "text"),
            Self::Blob => write!(f, "blob"),
            Self::CurrentDate => write!(f, "current_date"),
            Self::CurrentTime => write!(f, "current_time"),
            Self::CurrentTimestamp => write!(f, "current_timestamp"),
        }
    }
}

/// Overflowing literals such as `1e999` have no finite value to carry.
fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn unquote(raw: &str, quote: char) -> Option<String> {
    let inner = raw.strip_prefix(quote)?.strip_suffix(quote)?;
    let doubled: String = [quote, quote].iter().collect();

    // A lone quote inside means this was not a single literal (e.g. 'a' || 'b').
    let without_escapes = inner.replace(&doubled, "");
    if without_escapes.contains(quote) {
        return None;
    }
    Some(inner.replace(&doubled, &quote.to_string()))
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
