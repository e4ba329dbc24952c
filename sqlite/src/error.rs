//! Error types for catalog reads and replay.

use sqlsynth_synth::SynthError;
use thiserror::Error;

/// Errors that can occur while reading a catalog or replaying operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A catalog row that cannot describe a schema object.
    #[error("malformed catalog row for {object}: {detail}")]
    MalformedRow { object: String, detail: String },

    /// A `sqlite_master` row of a type other than table, view, index or trigger.
    #[error("unknown catalog object type '{object_type}' for {name}")]
    UnknownObjectType { object_type: String, name: String },

    /// An object name that cannot be passed to a pragma.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A record value that does not fit the property's binder.
    #[error("value of {entity}.{property} does not fit binder {binder}")]
    ValueMismatch {
        entity: String,
        property: String,
        binder: String,
    },

    /// The bundle has no such operation (read-only run, view, or no key).
    #[error("{operation} is not available for {entity}")]
    OperationUnavailable { entity: String, operation: String },

    /// Synthesis failure surfaced while replaying.
    #[error(transparent)]
    Synthesis(#[from] SynthError),
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
