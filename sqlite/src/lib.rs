//! SQLite catalog access for sqlsynth.
//!
//! This crate is the only part of the workspace that talks to a database.
//! It reads the catalog of one connection, builds the
//! [`Schema`](sqlsynth_core::Schema) model synthesis starts from, and can
//! replay synthesized bundles against a live connection.
//!
//! # Architecture
//!
//! - **`catalog`**: raw `sqlite_master` and pragma rows
//! - **`schema`**: schema model construction from those rows
//! - **`replay`**: reference interpreter for synthesized operations
//!
//! # Quick start
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use rusqlite::Connection;
//! use sqlsynth_core::GeneratorConfig;
//! use sqlsynth_sqlite::{FieldValue, Replay, load_schema};
//! use sqlsynth_synth::{VerbatimNamer, synthesize};
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch("CREATE TABLE person (person_id INTEGER PRIMARY KEY, lastname TEXT NOT NULL)")
//!     .unwrap();
//!
//! let schema = load_schema(&conn).unwrap();
//! let output = synthesize(&schema, &GeneratorConfig::default(), &VerbatimNamer).unwrap();
//!
//! let replay = Replay::new(&conn, &output);
//! let record = BTreeMap::from([("lastname".to_string(), FieldValue::Text("Lovelace".into()))]);
//! replay.insert("person", &record).unwrap();
//!
//! let rows = replay.select_all("person").unwrap();
//! assert_eq!(rows[0]["person_id"], FieldValue::Integer(1));
//! ```

mod catalog;
mod error;
mod replay;
mod schema;

pub use catalog::{
    ColumnRow, ForeignKeyRow, MasterRow, RawCatalog, open_read_only, open_with_script, read_catalog,
    read_catalog_from_sql,
};
pub use error::{CatalogError, Result};
pub use replay::{FieldValue, Record, Replay};
pub use schema::{build_schema, load_schema, load_schema_from_path, load_schema_from_sql};
