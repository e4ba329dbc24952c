//! Core schema model and typing primitives.
//!
//! This crate defines the foundational types shared by the sqlsynth
//! workspace:
//!
//! - [`Schema`], [`Table`], [`View`], [`Column`], [`ForeignKey`]: the
//!   catalog snapshot of one SQLite database.
//! - [`ColumnType`] and [`TypeAffinity`]: declared column types and the
//!   storage-class family SQLite derives from them.
//! - [`DefaultValue`]: literal column defaults.
//! - [`Entity`], [`Property`], [`PropertyType`], [`Literal`]: typed record
//!   descriptions consumed by synthesis.
//! - [`GeneratorConfig`]: run configuration, loadable from YAML.
//!
//! Validation ([`validate_schema`]) reports schema shapes that synthesis
//! would otherwise skip silently.
//!
//! # Example
//!
//! ```
//! use sqlsynth_core::*;
//!
//! let mut schema = Schema::default();
//! schema.tables.push(Table::new(
//!     "person",
//!     "CREATE TABLE person (person_id INTEGER PRIMARY KEY, lastname TEXT NOT NULL)",
//!     vec![
//!         Column::new(0, "person_id", ColumnType::parse_declared(Some("INTEGER"))).primary_key(1),
//!         Column::new(1, "lastname", ColumnType::parse_declared(Some("TEXT"))).not_null(),
//!     ],
//! ));
//!
//! let table = schema.table("person").unwrap();
//! assert_eq!(table.columns[1].affinity(), TypeAffinity::Text);
//! assert!(validate_schema(&schema).is_empty());
//! ```

mod column_type;
mod config;
mod default_value;
mod entity;
mod error;
mod types;
mod validate;

pub use column_type::{ColumnType, TypeAffinity};
pub use config::{
    BlobRepresentation, CustomStorage, CustomTypeConfig, DateStorage, GeneratorConfig, UuidStorage,
};
pub use default_value::{DefaultKind, DefaultValue};
pub use entity::*;
pub use error::{ConfigError, ConfigResult};
pub use types::*;
pub use validate::{ValidationError, validate_schema};
