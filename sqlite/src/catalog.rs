//! Raw catalog reads.
//!
//! [`read_catalog`] issues the catalog queries against one connection and
//! returns the rows as reported, without interpreting them:
//!
//! - `SELECT type, name, tbl_name, rootpage, sql FROM sqlite_master`
//! - `PRAGMA table_info(<t>)` for every table and view
//! - `PRAGMA foreign_key_list(<t>)` for every table
//! - `PRAGMA schema_version` and `PRAGMA user_version`
//!
//! Any failing query aborts the read.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use sqlsynth_synth::sql::quote_identifier;
use tracing::debug;

use crate::error::{CatalogError, Result};

/// One row of `sqlite_master`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRow {
    pub object_type: String,
    pub name: String,
    pub table_name: String,
    pub root_page: Option<i64>,
    pub sql: Option<String>,
}

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub cid: i64,
    pub name: String,
    /// Declared type; empty when the column declares none.
    pub declared_type: String,
    pub not_null: bool,
    pub default_sql: Option<String>,
    /// 1-based position in the primary key, 0 if not part of it.
    pub pk: i64,
}

/// One row of `PRAGMA foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub id: i64,
    pub seq: i64,
    pub table: String,
    pub from: String,
    pub to: Option<String>,
    pub on_update: String,
    pub on_delete: String,
    pub match_mode: String,
}

/// Everything the catalog reports, keyed by object name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCatalog {
    pub schema_version: i64,
    pub user_version: i64,
    pub objects: Vec<MasterRow>,
    pub columns: BTreeMap<String, Vec<ColumnRow>>,
    pub foreign_keys: BTreeMap<String, Vec<ForeignKeyRow>>,
}

/// Opens a database file without write access.
pub fn open_read_only(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Opens an in-memory database and runs a schema script on it.
pub fn open_with_script(sql: &str) -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(sql)?;
    Ok(conn)
}

/// Reads the complete catalog of `conn`.
///
/// Internal objects (`sqlite_sequence`, `sqlite_stat1`, ...) are skipped;
/// automatic indices are kept.
///
/// # Errors
///
/// Returns [`CatalogError::DatabaseError`] if any catalog query fails and
/// [`CatalogError::InvalidIdentifier`] for names no pragma can take.
pub fn read_catalog(conn: &Connection) -> Result<RawCatalog> {
    let schema_version: i64 = conn.query_row("PRAGMA schema_version", [], |row| row.get(0))?;
    let user_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    let mut stmt = conn.prepare("SELECT type, name, tbl_name, rootpage, sql FROM sqlite_master")?;
    let objects: Vec<MasterRow> = stmt
        .query_map([], |row| {
            Ok(MasterRow {
                object_type: row.get(0)?,
                name: row.get(1)?,
                table_name: row.get(2)?,
                root_page: row.get(3)?,
                sql: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let objects: Vec<MasterRow> = objects
        .into_iter()
        .filter(|o| o.object_type == "index" || !o.name.starts_with("sqlite_"))
        .collect();
    debug!(objects = objects.len(), schema_version, user_version, "Read sqlite_master");

    let mut catalog = RawCatalog {
        schema_version,
        user_version,
        objects,
        ..RawCatalog::default()
    };

    for object in &catalog.objects {
        match object.object_type.as_str() {
            "table" => {
                catalog
                    .columns
                    .insert(object.name.clone(), read_table_info(conn, &object.name)?);
                catalog
                    .foreign_keys
                    .insert(object.name.clone(), read_foreign_keys(conn, &object.name)?);
            }
            "view" => {
                catalog
                    .columns
                    .insert(object.name.clone(), read_table_info(conn, &object.name)?);
            }
            _ => {}
        }
    }

    Ok(catalog)
}

/// Runs a schema script on an in-memory database and reads its catalog.
///
/// # Examples
///
/// ```
/// use sqlsynth_sqlite::read_catalog_from_sql;
///
/// let catalog = read_catalog_from_sql("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();
/// assert_eq!(catalog.objects[0].name, "t");
/// assert_eq!(catalog.columns["t"][0].pk, 1);
/// ```
pub fn read_catalog_from_sql(sql: &str) -> Result<RawCatalog> {
    let conn = open_with_script(sql)?;
    read_catalog(&conn)
}

fn pragma_target(name: &str) -> Result<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(CatalogError::InvalidIdentifier(name.to_string()));
    }
    Ok(quote_identifier(name))
}

fn read_table_info(conn: &Connection, table: &str) -> Result<Vec<ColumnRow>> {
    let sql = format!("PRAGMA table_info({})", pragma_target(table)?);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ColumnRow {
                cid: row.get(0)?,
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                not_null: row.get::<_, i64>(3)? != 0,
                default_sql: row.get(4)?,
                pk: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(table, columns = rows.len(), "Read table_info");
    Ok(rows)
}

fn read_foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKeyRow>> {
    let sql = format!("PRAGMA foreign_key_list({})", pragma_target(table)?);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query_map([], |row| {
            Ok(ForeignKeyRow {
                id: row.get(0)?,
                seq: row.get(1)?,
                table: row.get(2)?,
                from: row.get(3)?,
                to: row.get(4)?,
                on_update: row.get(5)?,
                on_delete: row.get(6)?,
                match_mode: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    // The pragma lists constraints newest first.
    rows.sort_by_key(|fk| (fk.id, fk.seq));
    debug!(table, foreign_keys = rows.len(), "Read foreign_key_list");
    Ok(rows)
}
