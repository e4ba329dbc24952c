//! Bind-chain synthesis.
//!
//! Fixed-width values (integers, doubles, booleans, epoch dates) are bound
//! directly. Strings, byte buffers and anything rendered to text first
//! must stay alive until the statement has run, so binding one opens a
//! scope that holds every remaining bind plus the terminal action. A chain
//! is therefore a run of direct binds followed by at most one scoped bind
//! whose body is again a chain.

use serde::{Deserialize, Serialize};
use sqlsynth_core::{
    CustomStorage, DateStorage, Entity, GeneratorConfig, Property, PropertyType, UuidStorage,
};

use crate::error::{Result, SynthError};

/// Whether a bind can happen inline or needs a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMode {
    Direct,
    Scoped,
}

/// How one property value reaches a statement parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binder {
    Int64,
    Double,
    /// Bound as integer 0/1.
    Bool,
    /// Seconds since the epoch, as a double.
    DateEpoch,
    /// Rendered with a chrono format.
    DateText { format: String },
    Text,
    Blob,
    /// Hyphenated lower-case text.
    UuidText,
    /// 16 raw bytes.
    UuidBlob,
    UrlText,
    DecimalText,
    Custom { name: String, storage: CustomStorage },
}

impl Binder {
    /// Picks the binder of a property.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::NoBinder`] for a custom type with no
    /// configured storage class.
    pub fn for_property(entity: &str, property: &Property, config: &GeneratorConfig) -> Result<Self> {
        let binder = match &property.property_type {
            PropertyType::Integer => Self::Int64,
            PropertyType::Double => Self::Double,
            PropertyType::Bool => Self::Bool,
            PropertyType::Date => match config.date_storage {
                DateStorage::EpochSeconds => Self::DateEpoch,
                DateStorage::FormattedText => Self::DateText {
                    format: config.date_format.clone(),
                },
            },
            PropertyType::String => Self::Text,
            PropertyType::ByteArray | PropertyType::BinaryData => Self::Blob,
            PropertyType::Uuid => match config.uuid_storage {
                UuidStorage::Text => Self::UuidText,
                UuidStorage::Blob => Self::UuidBlob,
            },
            PropertyType::Url => Self::UrlText,
            PropertyType::Decimal => Self::DecimalText,
            PropertyType::Custom(name) => {
                let storage = property
                    .column_type
                    .as_ref()
                    .and_then(|declared| config.custom_type(&declared.to_string()))
                    .filter(|custom| custom.name == *name)
                    .or_else(|| config.custom_types.values().find(|custom| custom.name == *name))
                    .and_then(|custom| custom.storage);
                match storage {
                    Some(storage) => Self::Custom {
                        name: name.clone(),
                        storage,
                    },
                    None => {
                        return Err(SynthError::NoBinder {
                            entity: entity.to_string(),
                            property: property.name.clone(),
                            property_type: property.property_type.clone(),
                        });
                    }
                }
            }
        };
        Ok(binder)
    }

    pub fn mode(&self) -> BindMode {
        match self {
            Self::Int64 | Self::Double | Self::Bool | Self::DateEpoch => BindMode::Direct,
            Self::Custom { storage, .. } => match storage {
                CustomStorage::Integer | CustomStorage::Real => BindMode::Direct,
                CustomStorage::Text | CustomStorage::Blob => BindMode::Scoped,
            },
            Self::DateText { .. }
            | Self::Text
            | Self::Blob
            | Self::UuidText
            | Self::UuidBlob
            | Self::UrlText
            | Self::DecimalText => BindMode::Scoped,
        }
    }
}

/// Binding one property to one 1-based parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindOp {
    pub property: String,
    pub parameter: usize,
    pub binder: Binder,
    /// Whether a missing value binds SQL NULL.
    pub nullable: bool,
}

/// What a chain does once every parameter is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// Run the statement to completion.
    Step,
    /// Hand the bound statement to a caller-supplied continuation.
    Continuation,
}

/// Inline binds followed by either the terminal or one scoped bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindBlock {
    pub direct: Vec<BindOp>,
    pub tail: BindTail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindTail {
    Terminal(Terminal),
    Scoped { op: BindOp, body: Box<BindBlock> },
}

impl BindBlock {
    /// Nests `ops` from the first scoped op onward.
    pub fn build(ops: Vec<BindOp>, terminal: Terminal) -> Self {
        let mut direct = Vec::new();
        let mut ops = ops.into_iter();
        while let Some(op) = ops.next() {
            if op.binder.mode() == BindMode::Scoped {
                let body = Self::build(ops.collect(), terminal);
                return Self {
                    direct,
                    tail: BindTail::Scoped {
                        op,
                        body: Box::new(body),
                    },
                };
            }
            direct.push(op);
        }
        Self {
            direct,
            tail: BindTail::Terminal(terminal),
        }
    }

    /// Number of nested scopes.
    pub fn depth(&self) -> usize {
        match &self.tail {
            BindTail::Terminal(_) => 0,
            BindTail::Scoped { body, .. } => 1 + body.depth(),
        }
    }

    /// Every op in bind order.
    pub fn ops(&self) -> Vec<&BindOp> {
        let mut ops: Vec<&BindOp> = self.direct.iter().collect();
        if let BindTail::Scoped { op, body } = &self.tail {
            ops.push(op);
            ops.extend(body.ops());
        }
        ops
    }

    pub fn terminal(&self) -> Terminal {
        match &self.tail {
            BindTail::Terminal(terminal) => *terminal,
            BindTail::Scoped { body, .. } => body.terminal(),
        }
    }
}

/// Builds the chain binding `properties` to parameters `1..=N` in order.
///
/// `nullable` decides per property whether an absent value binds NULL.
pub fn bind_chain<'a>(
    entity: &Entity,
    properties: impl IntoIterator<Item = &'a Property>,
    config: &GeneratorConfig,
    terminal: Terminal,
    nullable: impl Fn(&Property) -> bool,
) -> Result<BindBlock> {
    let ops = properties
        .into_iter()
        .enumerate()
        .map(|(offset, property)| {
            Ok(BindOp {
                property: property.name.clone(),
                parameter: offset + 1,
                binder: Binder::for_property(&entity.name, property, config)?,
                nullable: nullable(property),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(BindBlock::build(ops, terminal))
}
