//! Generator configuration.
//!
//! Controls the typing and synthesis decisions that are not dictated by the
//! schema itself: how dates and identifiers are stored, whether writes are
//! synthesized at all, and how declared custom types map to target types.
//!
//! # Example YAML
//!
//! ```yaml
//! read_only: false
//! date_storage: formatted_text
//! date_format: "%Y-%m-%d %H:%M:%S"
//! uuid_storage: blob
//! insert_returning_fallback: true
//! url_column_suffixes: [url, link]
//! custom_types:
//!   MONEY:
//!     name: Money
//!     storage: integer
//! exclude_tables: [audit_log]
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// How date properties are stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStorage {
    /// Seconds since the Unix epoch, as a REAL.
    #[default]
    EpochSeconds,
    /// Text rendered with [`GeneratorConfig::date_format`].
    FormattedText,
}

/// How 128-bit identifiers are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UuidStorage {
    /// Hyphenated text.
    #[default]
    Text,
    /// 16 raw bytes.
    Blob,
}

/// Target representation of blob columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobRepresentation {
    #[default]
    ByteArray,
    BinaryData,
}

/// Storage class a custom type binds and reads through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomStorage {
    Integer,
    Real,
    Text,
    Blob,
}

/// Mapping of one declared type to a custom target type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTypeConfig {
    /// Target type name.
    pub name: String,
    /// Storage class; a custom type without one cannot be bound.
    #[serde(default)]
    pub storage: Option<CustomStorage>,
}

/// Configuration of one generation run.
///
/// Every field has a default, so an empty YAML document is a valid config.
///
/// # Examples
///
/// ```
/// use sqlsynth_core::{DateStorage, GeneratorConfig};
///
/// let config: GeneratorConfig = serde_yaml::from_str("date_storage: formatted_text").unwrap();
/// assert_eq!(config.date_storage, DateStorage::FormattedText);
/// assert!(!config.read_only);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Suppresses insert/update/delete synthesis entirely.
    pub read_only: bool,
    pub date_storage: DateStorage,
    /// chrono format used for text dates and text date defaults.
    pub date_format: String,
    pub uuid_storage: UuidStorage,
    pub blob_representation: BlobRepresentation,
    /// Also synthesize a rowid-based select for insert-and-return.
    pub insert_returning_fallback: bool,
    /// Turn unsupported default conversions into generation errors.
    pub strict_defaults: bool,
    /// Match boolean default tokens case-sensitively.
    pub case_sensitive_bool_tokens: bool,
    /// Text columns whose name ends with one of these become URLs.
    pub url_column_suffixes: Vec<String>,
    /// Text or blob columns whose name ends with one of these become UUIDs.
    pub uuid_column_suffixes: Vec<String>,
    /// Declared type (upper case) to custom target type.
    pub custom_types: BTreeMap<String, CustomTypeConfig>,
    /// Tables and views to leave out of the run.
    pub exclude_tables: Vec<String>,
    pub include_views: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            date_storage: DateStorage::default(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            uuid_storage: UuidStorage::default(),
            blob_representation: BlobRepresentation::default(),
            insert_returning_fallback: false,
            strict_defaults: false,
            case_sensitive_bool_tokens: false,
            url_column_suffixes: vec!["url".to_string()],
            uuid_column_suffixes: vec!["uuid".to_string()],
            custom_types: BTreeMap::new(),
            exclude_tables: Vec::new(),
            include_views: true,
        }
    }
}

impl GeneratorConfig {
    /// Loads configuration from a YAML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read,
    /// [`ConfigError::YamlError`] if parsing fails, or
    /// [`ConfigError::Invalid`] if a value is unusable.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks values serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.date_format.trim().is_empty() {
            return Err(ConfigError::Invalid("date_format cannot be empty".to_string()));
        }
        for (declared, custom) in &self.custom_types {
            if custom.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "custom type for '{declared}' has an empty name"
                )));
            }
            if declared.to_ascii_uppercase() != *declared {
                return Err(ConfigError::Invalid(format!(
                    "custom type key '{declared}' must be upper case"
                )));
            }
        }
        Ok(())
    }

    /// Returns `true` if `table` is in the exclusion list (case-insensitive).
    pub fn is_excluded(&self, table: &str) -> bool {
        self.exclude_tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Custom mapping for a raw declared type, if any.
    pub fn custom_type(&self, declared: &str) -> Option<&CustomTypeConfig> {
        self.custom_types.get(&declared.trim().to_ascii_uppercase())
    }

    /// Whether a column name carries one of `suffixes` (case-insensitive).
    pub fn has_suffix(column: &str, suffixes: &[String]) -> bool {
        let lower = column.to_ascii_lowercase();
        suffixes
            .iter()
            .any(|suffix| !suffix.is_empty() && lower.ends_with(&suffix.to_ascii_lowercase()))
    }
}
