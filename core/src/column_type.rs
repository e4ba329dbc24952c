//! Declared column types and SQLite type affinity.
//!
//! A column's declared type is free text in SQLite. [`ColumnType::parse`]
//! maps the keywords sqlsynth knows about onto dedicated variants and keeps
//! everything else verbatim as [`ColumnType::Custom`]. Every declaration,
//! including an absent one, has a [`TypeAffinity`].
//!
//! # Examples
//!
//! ```
//! use sqlsynth_core::{ColumnType, TypeAffinity};
//!
//! let varchar = ColumnType::parse("VARCHAR(255)");
//! assert_eq!(varchar, ColumnType::Varchar(Some(255)));
//! assert_eq!(varchar.affinity(), TypeAffinity::Numeric);
//!
//! let bigint = ColumnType::parse("BIGINT");
//! assert_eq!(bigint, ColumnType::Custom("BIGINT".into()));
//! assert_eq!(bigint.affinity(), TypeAffinity::Integer);
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]+)\s*(?:\(\s*([^)]*?)\s*\))?$").expect("static regex must compile")
});

/// Storage-class family SQLite uses to coerce values stored in a column.
///
/// See <https://www.sqlite.org/datatype3.html#type_affinity>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeAffinity {
    Text,
    Numeric,
    Integer,
    Real,
    Blob,
}

impl TypeAffinity {
    /// Substring scan over a raw declaration, in SQLite's priority order.
    ///
    /// `INT` wins over everything, then `CHAR`/`CLOB`/`TEXT`, then `BLOB`,
    /// then `REAL`/`FLOA`/`DOUB`. No match yields [`TypeAffinity::Numeric`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlsynth_core::TypeAffinity;
    ///
    /// assert_eq!(TypeAffinity::scan("CLOB"), TypeAffinity::Text);
    /// assert_eq!(TypeAffinity::scan("POINT"), TypeAffinity::Integer);
    /// assert_eq!(TypeAffinity::scan("MONEY"), TypeAffinity::Numeric);
    /// ```
    pub fn scan(declaration: &str) -> Self {
        let upper = declaration.to_ascii_uppercase();

        if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.contains("BLOB") {
            Self::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Numeric
        }
    }

    /// Affinity of an optional declaration. A missing or blank declaration
    /// has blob affinity, as in SQLite.
    pub fn of_declaration(column_type: Option<&ColumnType>) -> Self {
        match column_type {
            Some(column_type) => column_type.affinity(),
            None => Self::Blob,
        }
    }
}

impl fmt::Display for TypeAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Numeric => write!(f, "numeric"),
            Self::Integer => write!(f, "integer"),
            Self::Real => write!(f, "real"),
            Self::Blob => write!(f, "blob"),
        }
    }
}

/// Normalized declared type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Any,
    Boolean,
    /// `VARCHAR` with its optional declared width.
    Varchar(Option<u32>),
    Date,
    Datetime,
    Timestamp,
    Decimal,
    /// Any declaration sqlsynth has no dedicated variant for, kept verbatim.
    Custom(String),
}

impl ColumnType {
    /// Parses a raw declaration. Case-insensitive and infallible.
    ///
    /// `DOUBLE` is folded into [`ColumnType::Real`]. Parenthesized arguments
    /// are accepted on every keyword; only `VARCHAR` keeps them (as its
    /// width), and a `VARCHAR` whose width is not a number stays custom.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlsynth_core::ColumnType;
    ///
    /// assert_eq!(ColumnType::parse("integer"), ColumnType::Integer);
    /// assert_eq!(ColumnType::parse("DOUBLE"), ColumnType::Real);
    /// assert_eq!(ColumnType::parse("bool"), ColumnType::Boolean);
    /// assert_eq!(ColumnType::parse("VARCHAR"), ColumnType::Varchar(None));
    /// assert_eq!(ColumnType::parse("DECIMAL(10, 2)"), ColumnType::Decimal);
    /// assert_eq!(
    ///     ColumnType::parse("DOUBLE PRECISION"),
    ///     ColumnType::Custom("DOUBLE PRECISION".into())
    /// );
    /// ```
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let custom = || Self::Custom(trimmed.to_string());

        let Some(caps) = DECLARATION_RE.captures(trimmed) else {
            return custom();
        };
        let keyword = caps[1].to_ascii_uppercase();
        let args = caps.get(2).map(|m| m.as_str());

        match keyword.as_str() {
            "INTEGER" => Self::Integer,
            "REAL" | "DOUBLE" => Self::Real,
            "TEXT" => Self::Text,
            "BLOB" => Self::Blob,
            "ANY" => Self::Any,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "VARCHAR" => match args {
                None => Self::Varchar(None),
                Some(width) => match width.parse::<u32>() {
                    Ok(width) => Self::Varchar(Some(width)),
                    Err(_) => custom(),
                },
            },
            "DATE" => Self::Date,
            "DATETIME" => Self::Datetime,
            "TIMESTAMP" => Self::Timestamp,
            "DECIMAL" => Self::Decimal,
            _ => custom(),
        }
    }

    /// Parses an optional catalog declaration; blank strings mean "no type".
    pub fn parse_declared(raw: Option<&str>) -> Option<Self> {
        raw.map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(Self::parse)
    }

    /// Affinity of this type.
    ///
    /// The four storage-class keywords map to their own affinity, every
    /// other dedicated variant is numeric, and custom declarations go
    /// through [`TypeAffinity::scan`].
    pub fn affinity(&self) -> TypeAffinity {
        match self {
            Self::Integer => TypeAffinity::Integer,
            Self::Real => TypeAffinity::Real,
            Self::Text => TypeAffinity::Text,
            Self::Blob => TypeAffinity::Blob,
            Self::Any
            | Self::Boolean
            | Self::Varchar(_)
            | Self::Date
            | Self::Datetime
            | Self::Timestamp
            | Self::Decimal => TypeAffinity::Numeric,
            Self::Custom(raw) => TypeAffinity::scan(raw),
        }
    }

    /// Whether this is one of the three date-like declarations.
    pub fn is_date_like(&self) -> bool {
        matches!(self, Self::Date | Self::Datetime | Self::Timestamp)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Real => write!(f, "REAL"),
            Self::Text => write!(f, "TEXT"),
            Self::Blob => write!(f, "BLOB"),
            Self::Any => write!(f, "ANY"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Varchar(None) => write!(f, "VARCHAR"),
            Self::Varchar(Some(width)) => write!(f, "VARCHAR({width})"),
            Self::Date => write!(f, "DATE"),
            Self::Datetime => write!(f, "DATETIME"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Decimal => write!(f, "DECIMAL"),
            Self::Custom(raw) => write!(f, "{raw}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(ColumnType::parse("Integer"), ColumnType::Integer);
        assert_eq!(ColumnType::parse("text"), ColumnType::Text);
        assert_eq!(ColumnType::parse("  blob "), ColumnType::Blob);
        assert_eq!(ColumnType::parse("DateTime"), ColumnType::Datetime);
        assert_eq!(ColumnType::parse("timestamp"), ColumnType::Timestamp);
        assert_eq!(ColumnType::parse("any"), ColumnType::Any);
    }

    #[test]
    fn test_varchar_width() {
        assert_eq!(ColumnType::parse("VARCHAR(255)"), ColumnType::Varchar(Some(255)));
        assert_eq!(ColumnType::parse("varchar ( 12 )"), ColumnType::Varchar(Some(12)));
        assert_eq!(
            ColumnType::parse("VARCHAR(max)"),
            ColumnType::Custom("VARCHAR(max)".to_string())
        );
    }

    #[test]
    fn test_documented_affinity_examples() {
        let varchar = ColumnType::parse("VARCHAR(255)");
        assert_eq!(varchar, ColumnType::Varchar(Some(255)));
        assert_eq!(varchar.affinity(), TypeAffinity::Numeric);

        let bigint = ColumnType::parse("BIGINT");
        assert_eq!(bigint, ColumnType::Custom("BIGINT".to_string()));
        assert_eq!(bigint.affinity(), TypeAffinity::Integer);

        let clob = ColumnType::parse("CLOB");
        assert_eq!(clob, ColumnType::Custom("CLOB".to_string()));
        assert_eq!(clob.affinity(), TypeAffinity::Text);
    }

    #[test]
    fn test_scan_priority_order() {
        // INT beats CHAR even when both appear.
        assert_eq!(TypeAffinity::scan("CHARINT"), TypeAffinity::Integer);
        assert_eq!(TypeAffinity::scan("NATIVE CHARACTER(70)"), TypeAffinity::Text);
        // BLOB beats REAL.
        assert_eq!(TypeAffinity::scan("REALBLOB"), TypeAffinity::Blob);
        assert_eq!(TypeAffinity::scan("FLOAT"), TypeAffinity::Real);
        assert_eq!(TypeAffinity::scan("DOUBLE PRECISION"), TypeAffinity::Real);
        assert_eq!(TypeAffinity::scan("NUMERIC"), TypeAffinity::Numeric);
        assert_eq!(TypeAffinity::scan(""), TypeAffinity::Numeric);
    }

    #[test]
    fn test_dedicated_variants_affinity() {
        assert_eq!(ColumnType::Integer.affinity(), TypeAffinity::Integer);
        assert_eq!(ColumnType::Real.affinity(), TypeAffinity::Real);
        assert_eq!(ColumnType::Text.affinity(), TypeAffinity::Text);
        assert_eq!(ColumnType::Blob.affinity(), TypeAffinity::Blob);
        assert_eq!(ColumnType::Boolean.affinity(), TypeAffinity::Numeric);
        assert_eq!(ColumnType::Date.affinity(), TypeAffinity::Numeric);
        assert_eq!(ColumnType::Decimal.affinity(), TypeAffinity::Numeric);
    }

    #[test]
    fn test_missing_declaration() {
        assert_eq!(ColumnType::parse_declared(None), None);
        assert_eq!(ColumnType::parse_declared(Some("  ")), None);
        assert_eq!(TypeAffinity::of_declaration(None), TypeAffinity::Blob);
    }

    #[test]
    fn test_affinity_is_independent_of_case() {
        for raw in ["bigint", "BigInt", "BIGINT"] {
            assert_eq!(ColumnType::parse(raw).affinity(), TypeAffinity::Integer);
        }
    }

    #[test]
    fn test_display_round_trips_dedicated_variants() {
        for raw in ["INTEGER", "REAL", "TEXT", "BLOB", "VARCHAR(8)", "DATE", "DECIMAL"] {
            assert_eq!(ColumnType::parse(raw).to_string(), raw);
        }
    }
}
