//! Data-access synthesis over the sqlsynth schema model.
//!
//! Given a [`Schema`](sqlsynth_core::Schema), [`synthesize`] builds the
//! entity model and, for every entity, an [`EntityBundle`]:
//!
//! - the canonical select and its constant [`StaticIndexTable`];
//! - a [`DynamicIndexLookup`] resolving arbitrary statements by column name;
//! - [`ExtractExpr`]s that read a row without ever failing;
//! - [`BindBlock`] chains for insert, update and delete;
//! - [`ToOneAccessor`]s and [`ToManyAccessor`]s derived from foreign keys.
//!
//! Findings that degrade but do not abort synthesis are returned as
//! [`Diagnostic`]s.
//!
//! # Example
//!
//! ```
//! use sqlsynth_core::{Column, ColumnType, GeneratorConfig, Schema, Table};
//! use sqlsynth_synth::{VerbatimNamer, synthesize};
//!
//! let mut schema = Schema::default();
//! schema.tables.push(Table::new(
//!     "person",
//!     "CREATE TABLE person (person_id INTEGER PRIMARY KEY, lastname TEXT NOT NULL)",
//!     vec![
//!         Column::new(0, "person_id", Some(ColumnType::Integer)).primary_key(1),
//!         Column::new(1, "lastname", Some(ColumnType::Text)).not_null(),
//!     ],
//! ));
//!
//! let output = synthesize(&schema, &GeneratorConfig::default(), &VerbatimNamer).unwrap();
//! let bundle = output.bundle("person").unwrap();
//! assert_eq!(bundle.static_indices.sql, r#"SELECT "person_id", "lastname" FROM "person""#);
//! assert_eq!(bundle.insert.as_ref().unwrap().bind.depth(), 1);
//! ```

mod bind;
mod bundle;
mod defaults;
mod diagnostics;
mod error;
mod extract;
mod index;
mod model;
mod namer;
mod relationship;
mod resolve;
pub mod sql;

pub use bind::{BindBlock, BindMode, BindOp, BindTail, Binder, Terminal, bind_chain};
pub use bundle::{
    EntityBundle, InsertReturning, SynthesisOutput, WriteOperation, synthesize, synthesize_entity,
};
pub use defaults::{
    UnsupportedDefault, baseline_default, baseline_for_type, fallback_literal, parse_bool_token,
    parse_date, parse_decimal, parse_engine_date, resolve_default,
};
pub use diagnostics::{Diagnostic, DiagnosticCode, SynthesisReport};
pub use error::{Result, SynthError};
pub use extract::{ExtractExpr, ReadDecision, Reader, extract_exprs};
pub use index::{
    DynamicIndexLookup, INDEX_UNMATCHED, IndexAssignment, LookupTarget, ResolvedIndices,
    StaticIndexEntry, StaticIndexTable,
};
pub use model::{EntityModel, build_model};
pub use namer::{Namer, VerbatimNamer};
pub use relationship::{ToManyAccessor, ToOneAccessor, to_many_accessor, to_one_accessor};
pub use resolve::resolve_property_type;
