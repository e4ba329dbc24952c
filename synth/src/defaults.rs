//! Catalog default literal to typed literal expression.
//!
//! [`resolve_default`] implements the full conversion matrix between the
//! eight default kinds and the property types. A pair without a mapping is
//! an [`UnsupportedDefault`]; callers decide whether that is a diagnostic
//! or an error. [`baseline_for_type`] gives every type a value to fall back
//! on, so a not-null property can always be materialized.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlsynth_core::{
    DefaultKind, DefaultValue, GeneratorConfig, Literal, NowFormat, Property, PropertyType,
};
use thiserror::Error;
use uuid::Uuid;

/// A (default kind, property type) pair without a defined conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} default cannot initialize a {property_type} property")]
pub struct UnsupportedDefault {
    pub kind: DefaultKind,
    pub property_type: PropertyType,
}

/// Converts a catalog default into a literal for `property_type`.
///
/// # Examples
///
/// ```
/// use sqlsynth_core::{DefaultValue, GeneratorConfig, Literal, PropertyType};
/// use sqlsynth_synth::resolve_default;
///
/// let config = GeneratorConfig::default();
/// let text = DefaultValue::Text("true".into());
/// assert_eq!(
///     resolve_default(&text, &PropertyType::Bool, true, &config),
///     Ok(Literal::Bool(true))
/// );
///
/// let text = DefaultValue::Text("maybe".into());
/// assert!(resolve_default(&text, &PropertyType::Bool, true, &config).is_err());
/// ```
pub fn resolve_default(
    default: &DefaultValue,
    property_type: &PropertyType,
    is_not_null: bool,
    config: &GeneratorConfig,
) -> Result<Literal, UnsupportedDefault> {
    let resolved = match default {
        DefaultValue::Null => (!is_not_null).then_some(Literal::Nil),
        DefaultValue::Integer(value) => from_integer(*value, property_type),
        DefaultValue::Real(value) => from_real(*value, property_type),
        DefaultValue::Text(text) => from_text(text, property_type, config),
        DefaultValue::Blob(bytes) => from_blob(bytes, property_type),
        DefaultValue::CurrentDate => now(NowFormat::Date, property_type),
        DefaultValue::CurrentTime => now(NowFormat::Time, property_type),
        DefaultValue::CurrentTimestamp => now(NowFormat::Timestamp, property_type),
    };

    resolved.ok_or_else(|| UnsupportedDefault {
        kind: default.kind(),
        property_type: property_type.clone(),
    })
}

fn from_integer(value: i64, property_type: &PropertyType) -> Option<Literal> {
    match property_type {
        PropertyType::Integer => Some(Literal::Integer(value)),
        PropertyType::Double => Some(Literal::Double(value as f64)),
        PropertyType::String => Some(Literal::String(value.to_string())),
        PropertyType::Bool => Some(Literal::Bool(value != 0)),
        PropertyType::Date => Some(Literal::Date(value as f64)),
        PropertyType::Decimal => Some(Literal::Decimal(Decimal::from(value).to_string())),
        PropertyType::ByteArray
        | PropertyType::BinaryData
        | PropertyType::Url
        | PropertyType::Uuid
        | PropertyType::Custom(_) => None,
    }
}

fn from_real(value: f64, property_type: &PropertyType) -> Option<Literal> {
    if !value.is_finite() {
        return None;
    }
    match property_type {
        PropertyType::Integer => truncate(value).map(Literal::Integer),
        PropertyType::Double => Some(Literal::Double(value)),
        PropertyType::String => Some(Literal::String(value.to_string())),
        PropertyType::Bool => Some(Literal::Bool(value != 0.0)),
        PropertyType::Date => Some(Literal::Date(value)),
        PropertyType::Decimal => parse_decimal(&value.to_string()).map(Literal::Decimal),
        PropertyType::ByteArray
        | PropertyType::BinaryData
        | PropertyType::Url
        | PropertyType::Uuid
        | PropertyType::Custom(_) => None,
    }
}

fn from_text(text: &str, property_type: &PropertyType, config: &GeneratorConfig) -> Option<Literal> {
    match property_type {
        PropertyType::String => Some(Literal::String(text.to_string())),
        PropertyType::Integer => text.trim().parse::<i64>().ok().map(Literal::Integer),
        PropertyType::Double => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Literal::Double),
        PropertyType::Bool => parse_bool_token(text, config.case_sensitive_bool_tokens).map(Literal::Bool),
        PropertyType::Date => parse_date(text, &config.date_format).map(Literal::Date),
        PropertyType::Url => url::Url::parse(text.trim())
            .ok()
            .map(|_| Literal::Url(text.trim().to_string())),
        PropertyType::Uuid => Uuid::parse_str(text.trim()).ok().map(Literal::Uuid),
        PropertyType::Decimal => parse_decimal(text).map(Literal::Decimal),
        PropertyType::ByteArray | PropertyType::BinaryData | PropertyType::Custom(_) => None,
    }
}

fn from_blob(bytes: &[u8], property_type: &PropertyType) -> Option<Literal> {
    match property_type {
        PropertyType::ByteArray | PropertyType::BinaryData => Some(Literal::Bytes(bytes.to_vec())),
        PropertyType::Uuid => Uuid::from_slice(bytes).ok().map(Literal::Uuid),
        _ => None,
    }
}

fn now(format: NowFormat, property_type: &PropertyType) -> Option<Literal> {
    matches!(property_type, PropertyType::Date | PropertyType::String).then_some(Literal::Now(format))
}

/// Truncates toward zero when the value fits in an `i64`.
fn truncate(value: f64) -> Option<i64> {
    // i64::MAX is not representable; 2^63 is the first value out of range.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let truncated = value.trunc();
    (truncated.is_finite() && (-LIMIT..LIMIT).contains(&truncated)).then_some(truncated as i64)
}

/// Accepts `true/false/yes/no/1/0`.
pub fn parse_bool_token(text: &str, case_sensitive: bool) -> Option<bool> {
    const TOKENS: [(&str, bool); 6] = [
        ("true", true),
        ("false", false),
        ("yes", true),
        ("no", false),
        ("1", true),
        ("0", false),
    ];
    let token = text.trim();
    TOKENS
        .iter()
        .find(|(candidate, _)| {
            if case_sensitive {
                token == *candidate
            } else {
                token.eq_ignore_ascii_case(candidate)
            }
        })
        .map(|(_, value)| *value)
}

/// Seconds since the epoch of a text date: `format` as a date-time, then
/// as a bare date, then raw seconds.
pub fn parse_date(text: &str, format: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
        return Some(datetime.and_utc().timestamp_millis() as f64 / 1000.0);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, format) {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp() as f64);
    }
    text.parse::<f64>().ok().filter(|secs| secs.is_finite())
}

/// Text forms of SQLite's date functions and `CURRENT_*` defaults.
const ENGINE_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d"];

/// Seconds since the epoch of a date the database engine rendered as
/// text, such as a `CURRENT_TIMESTAMP` default in an epoch column.
///
/// # Examples
///
/// ```
/// use sqlsynth_synth::parse_engine_date;
///
/// assert_eq!(parse_engine_date("2001-02-03 04:05:06"), Some(981173106.0));
/// assert_eq!(parse_engine_date("1970-01-02"), Some(86400.0));
/// assert_eq!(parse_engine_date("yesterday"), None);
/// ```
pub fn parse_engine_date(text: &str) -> Option<f64> {
    ENGINE_DATE_FORMATS.iter().find_map(|format| parse_date(text, format))
}

/// Canonical decimal text, accepting plain and scientific notation.
pub fn parse_decimal(text: &str) -> Option<String> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
        .map(|decimal| decimal.normalize().to_string())
}

/// Baseline value of a type, used when nothing better is known.
pub fn baseline_for_type(property_type: &PropertyType) -> Literal {
    match property_type {
        PropertyType::Integer => Literal::Integer(-1),
        PropertyType::Double => Literal::Double(-1.0),
        PropertyType::String => Literal::String(String::new()),
        PropertyType::Bool => Literal::Bool(false),
        PropertyType::Date => Literal::Date(0.0),
        PropertyType::Uuid => Literal::Uuid(Uuid::nil()),
        PropertyType::Decimal => Literal::Decimal("1".to_string()),
        PropertyType::Url => Literal::Url("about:blank".to_string()),
        PropertyType::ByteArray | PropertyType::BinaryData => Literal::Bytes(Vec::new()),
        PropertyType::Custom(name) => Literal::Construct(name.clone()),
    }
}

/// Baseline value of a property. Always defined.
pub fn baseline_default(property: &Property) -> Literal {
    baseline_for_type(&property.property_type)
}

/// What a property reads as when its column is absent or unusable: the
/// resolved default, else `Nil` for nullable properties, else the baseline.
pub fn fallback_literal(property: &Property) -> Literal {
    match &property.default_value {
        Some(default) => default.clone(),
        None if property.is_nullable() => Literal::Nil,
        None => baseline_default(property),
    }
}
