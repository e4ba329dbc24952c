//! Error types for synthesis.
//!
//! Only conditions that make an entity impossible to encode are errors.
//! Unsupported defaults and relationship keys degrade gracefully and are
//! reported as [`Diagnostic`](crate::Diagnostic)s instead.

use sqlsynth_core::{DefaultKind, PropertyType};
use thiserror::Error;

/// Errors that abort synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// A property's type has no defined binder.
    #[error("no binder for {entity}.{property} of type {property_type}")]
    NoBinder {
        entity: String,
        property: String,
        property_type: PropertyType,
    },

    /// An unsupported default conversion under `strict_defaults`.
    #[error("unsupported {kind} default for {entity}.{property} of type {property_type}")]
    StrictDefault {
        entity: String,
        property: String,
        kind: DefaultKind,
        property_type: PropertyType,
    },

    /// An operation referenced an entity that is not part of the run.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// An operation needs a primary key the entity does not have.
    #[error("entity {0} has no primary key")]
    MissingPrimaryKey(String),
}

/// Convenience alias for results with [`SynthError`].
pub type Result<T> = std::result::Result<T, SynthError>;
