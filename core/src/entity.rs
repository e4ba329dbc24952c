//! Typed record descriptions derived from the schema model.
//!
//! An [`Entity`] is a table or view abstracted into a record type: its
//! columns become [`Property`] values carrying the target [`PropertyType`]
//! and a resolved default [`Literal`]. Relationships refer to other
//! entities by name only; nothing here owns or points at another entity.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::column_type::{ColumnType, TypeAffinity};

/// Whether an entity was built from a table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Table,
    View,
}

/// Target type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Integer,
    Double,
    String,
    /// Raw byte array.
    ByteArray,
    Bool,
    Date,
    /// Opaque binary data container.
    BinaryData,
    Url,
    Decimal,
    Uuid,
    /// A user-declared type, by its target name.
    Custom(String),
}

impl PropertyType {
    /// Integer or double.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Double)
    }

    /// Byte array or binary data.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::ByteArray | Self::BinaryData)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "string"),
            Self::ByteArray => write!(f, "byte_array"),
            Self::Bool => write!(f, "bool"),
            Self::Date => write!(f, "date"),
            Self::BinaryData => write!(f, "binary_data"),
            Self::Url => write!(f, "url"),
            Self::Decimal => write!(f, "decimal"),
            Self::Uuid => write!(f, "uuid"),
            Self::Custom(name) => write!(f, "custom({name})"),
        }
    }
}

/// Which part of the current moment a [`Literal::Now`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NowFormat {
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM:SS`
    Time,
    /// `YYYY-MM-DD HH:MM:SS`
    Timestamp,
}

impl NowFormat {
    /// chrono format string matching SQLite's rendering of the keyword.
    pub fn chrono_format(self) -> &'static str {
        match self {
            Self::Date => "%Y-%m-%d",
            Self::Time => "%H:%M:%S",
            Self::Timestamp => "%Y-%m-%d %H:%M:%S",
        }
    }
}

/// A target-language-neutral literal expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// The target's no-value literal.
    Nil,
    Integer(i64),
    Double(f64),
    String(String),
    Bool(bool),
    Bytes(Vec<u8>),
    /// Seconds since the Unix epoch.
    Date(f64),
    Url(String),
    Uuid(Uuid),
    /// Canonical decimal text.
    Decimal(String),
    /// "Format the current timestamp", evaluated when a record is created.
    Now(NowFormat),
    /// Parameterless construction of a custom type.
    Construct(String),
}

impl Literal {
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

/// Reference from a property to the column it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Constraint id within the source table.
    pub constraint_id: i64,
    pub destination_table: String,
    /// External name of the destination column; `None` means the
    /// destination's primary key.
    pub destination_column: Option<String>,
    /// Whether the constraint spans more than one column.
    pub is_compound: bool,
}

/// One typed attribute of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Normalized name.
    pub name: String,
    /// Raw column name.
    pub external_name: String,
    pub property_type: PropertyType,
    pub column_type: Option<ColumnType>,
    pub affinity: TypeAffinity,
    pub is_not_null: bool,
    pub is_primary_key: bool,
    /// Resolved default; `None` when the column has no usable default.
    pub default_value: Option<Literal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
}

impl Property {
    pub fn is_nullable(&self) -> bool {
        !self.is_not_null
    }
}

/// Primary key of an entity, by property name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKey {
    Simple(String),
    Compound(Vec<String>),
}

impl PrimaryKey {
    /// Property names making up the key, in key order.
    pub fn property_names(&self) -> Vec<&str> {
        match self {
            Self::Simple(name) => vec![name.as_str()],
            Self::Compound(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// `source_property` of this entity points at `destination_property` of
/// `destination_entity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToOneRelationship {
    pub name: String,
    pub source_property: String,
    pub destination_entity: String,
    pub destination_property: String,
}

/// Rows of `source_entity` whose `source_property` equals this entity's
/// `destination_property`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToManyRelationship {
    pub name: String,
    pub source_entity: String,
    pub source_property: String,
    pub destination_property: String,
}

/// A table or view as a typed record description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub external_name: String,
    pub kind: EntityKind,
    /// Properties in column ordinal order.
    pub properties: Vec<Property>,
    pub primary_key: Option<PrimaryKey>,
    pub to_one: Vec<ToOneRelationship>,
    pub to_many: Vec<ToManyRelationship>,
    pub can_insert: bool,
    pub can_update: bool,
    pub can_delete: bool,
    /// Table declared `WITHOUT ROWID`.
    pub without_rowid: bool,
}

impl Entity {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Finds a property by its column name, case-insensitively.
    pub fn property_by_column(&self, column: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.external_name.eq_ignore_ascii_case(column))
    }

    /// Ordinal position of a property.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// Properties making up the primary key, in key order.
    pub fn primary_key_properties(&self) -> Vec<&Property> {
        self.primary_key
            .as_ref()
            .map(|key| {
                key.property_names()
                    .into_iter()
                    .filter_map(|name| self.property(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Properties outside the primary key, in ordinal order.
    pub fn non_key_properties(&self) -> Vec<&Property> {
        self.properties.iter().filter(|p| !p.is_primary_key).collect()
    }
}
