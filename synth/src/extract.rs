//! Extract-expression synthesis.
//!
//! Reading a row never fails. Every property reads through the same
//! decision: an index outside the result set or a null in a not-null
//! property falls back to the resolved default (or baseline), a null in a
//! nullable property is `Nil`, and anything else is read and converted.
//! Conversions that can fail at read time fall back the same way.

use serde::{Deserialize, Serialize};
use sqlsynth_core::{CustomStorage, Entity, GeneratorConfig, Literal, Property};

use crate::bind::Binder;
use crate::defaults::fallback_literal;
use crate::error::Result;
use crate::index::StaticIndexTable;

/// How a stored value becomes a property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reader {
    Int64,
    Double,
    /// Integer compared not-equal to zero.
    Bool,
    DateEpoch,
    DateText { format: String },
    Text,
    Blob,
    UuidText,
    UuidBlob,
    UrlText,
    DecimalText,
    Custom { name: String, storage: CustomStorage },
}

impl Reader {
    /// Conversions that can reject a stored value. Epoch dates count: the
    /// engine's own date defaults store text that has to be parsed.
    pub fn is_fallible(&self) -> bool {
        matches!(
            self,
            Self::DateEpoch
                | Self::DateText { .. }
                | Self::UuidText
                | Self::UuidBlob
                | Self::UrlText
                | Self::DecimalText
        )
    }

    /// Reads a pointer plus a byte length.
    pub fn is_variable_length(&self) -> bool {
        match self {
            Self::DateText { .. }
            | Self::Text
            | Self::Blob
            | Self::UuidText
            | Self::UuidBlob
            | Self::UrlText
            | Self::DecimalText => true,
            Self::Custom { storage, .. } => matches!(storage, CustomStorage::Text | CustomStorage::Blob),
            Self::Int64 | Self::Double | Self::Bool | Self::DateEpoch => false,
        }
    }
}

impl From<&Binder> for Reader {
    fn from(binder: &Binder) -> Self {
        match binder {
            Binder::Int64 => Self::Int64,
            Binder::Double => Self::Double,
            Binder::Bool => Self::Bool,
            Binder::DateEpoch => Self::DateEpoch,
            Binder::DateText { format } => Self::DateText { format: format.clone() },
            Binder::Text => Self::Text,
            Binder::Blob => Self::Blob,
            Binder::UuidText => Self::UuidText,
            Binder::UuidBlob => Self::UuidBlob,
            Binder::UrlText => Self::UrlText,
            Binder::DecimalText => Self::DecimalText,
            Binder::Custom { name, storage } => Self::Custom {
                name: name.clone(),
                storage: *storage,
            },
        }
    }
}

/// Value-reading expression of one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractExpr {
    pub property: String,
    pub column: String,
    /// Position in the canonical select.
    pub index_slot: i32,
    pub reader: Reader,
    /// Test for the null marker before reading.
    pub null_check: bool,
    /// Value used when the column is absent, null in a not-null property,
    /// or fails to convert.
    pub fallback: Literal,
    pub fallible: bool,
    pub length_query: bool,
}

/// Outcome of the range and null checks for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDecision {
    Read,
    Nil,
    Fallback,
}

impl ExtractExpr {
    pub fn for_property(
        entity: &str,
        property: &Property,
        index_slot: i32,
        config: &GeneratorConfig,
    ) -> Result<Self> {
        let reader = Reader::from(&Binder::for_property(entity, property, config)?);
        Ok(Self {
            property: property.name.clone(),
            column: property.external_name.clone(),
            index_slot,
            fallible: reader.is_fallible(),
            length_query: reader.is_variable_length(),
            reader,
            null_check: property.is_nullable(),
            fallback: fallback_literal(property),
        })
    }

    /// Decides how to materialize the column at `index` of a result with
    /// `column_count` columns. `is_null` is only consulted in range.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlsynth_core::Literal;
    /// use sqlsynth_synth::{ExtractExpr, ReadDecision, Reader};
    ///
    /// let expr = ExtractExpr {
    ///     property: "nickname".into(),
    ///     column: "nickname".into(),
    ///     index_slot: 1,
    ///     reader: Reader::Text,
    ///     null_check: true,
    ///     fallback: Literal::String("anon".into()),
    ///     fallible: false,
    ///     length_query: true,
    /// };
    /// assert_eq!(expr.decide(1, 2, true), ReadDecision::Nil);
    /// assert_eq!(expr.decide(-1, 2, false), ReadDecision::Fallback);
    /// assert_eq!(expr.decide(1, 2, false), ReadDecision::Read);
    /// ```
    pub fn decide(&self, index: i32, column_count: i32, is_null: bool) -> ReadDecision {
        if index < 0 || index >= column_count {
            return ReadDecision::Fallback;
        }
        match (is_null, self.null_check) {
            (true, true) => ReadDecision::Nil,
            (true, false) => ReadDecision::Fallback,
            (false, _) => ReadDecision::Read,
        }
    }
}

/// Extract expressions of every property, slotted by the static table.
pub fn extract_exprs(
    entity: &Entity,
    static_indices: &StaticIndexTable,
    config: &GeneratorConfig,
) -> Result<Vec<ExtractExpr>> {
    entity
        .properties
        .iter()
        .map(|property| {
            ExtractExpr::for_property(&entity.name, property, static_indices.index_of(&property.name), config)
        })
        .collect()
}
