//! Schema model construction from raw catalog rows.
//!
//! Tables and views keep catalog order. Indices and triggers are grouped by
//! the table they belong to. Interpretation is limited to what the model
//! needs: declared types are parsed, default clauses are parsed when they
//! are literals, and referential actions are decoded.

use std::path::Path;

use rusqlite::Connection;
use sqlsynth_core::{
    Column, ColumnType, ForeignKey, ForeignKeyAction, Index, MatchMode, Schema, Table, Trigger, View,
};
use tracing::debug;

use crate::catalog::{ColumnRow, ForeignKeyRow, MasterRow, RawCatalog, open_read_only, read_catalog, read_catalog_from_sql};
use crate::error::{CatalogError, Result};

/// Builds the schema model from a raw catalog.
///
/// # Errors
///
/// Returns [`CatalogError::UnknownObjectType`] for catalog objects other
/// than tables, views, indices and triggers, and
/// [`CatalogError::MalformedRow`] for rows that cannot describe an object.
pub fn build_schema(catalog: &RawCatalog) -> Result<Schema> {
    let mut schema = Schema {
        version: catalog.schema_version,
        user_version: catalog.user_version,
        ..Schema::default()
    };

    for object in &catalog.objects {
        match object.object_type.as_str() {
            "table" => {
                let columns = columns_of(catalog, object)?;
                let mut table = Table::new(&object.name, &creation_sql(object)?, columns);
                table.external_name = object.table_name.clone();
                for row in catalog.foreign_keys.get(&object.name).into_iter().flatten() {
                    table.foreign_keys.push(foreign_key(&object.name, row)?);
                }
                schema.tables.push(table);
            }
            "view" => {
                let columns = columns_of(catalog, object)?;
                let mut view = View::new(&object.name, &creation_sql(object)?, columns);
                view.external_name = object.table_name.clone();
                schema.views.push(view);
            }
            "index" => {
                schema
                    .indices
                    .entry(object.table_name.clone())
                    .or_default()
                    .push(Index {
                        name: object.name.clone(),
                        table_name: object.table_name.clone(),
                        creation_sql: object.sql.clone(),
                    });
            }
            "trigger" => {
                schema
                    .triggers
                    .entry(object.table_name.clone())
                    .or_default()
                    .push(Trigger {
                        name: object.name.clone(),
                        table_name: object.table_name.clone(),
                        creation_sql: creation_sql(object)?,
                    });
            }
            other => {
                return Err(CatalogError::UnknownObjectType {
                    object_type: other.to_string(),
                    name: object.name.clone(),
                });
            }
        }
    }

    debug!(
        tables = schema.tables.len(),
        views = schema.views.len(),
        "Built schema model"
    );
    Ok(schema)
}

/// Reads and builds the schema of an open connection.
pub fn load_schema(conn: &Connection) -> Result<Schema> {
    build_schema(&read_catalog(conn)?)
}

/// Opens a database file read-only and builds its schema.
pub fn load_schema_from_path(path: impl AsRef<Path>) -> Result<Schema> {
    let conn = open_read_only(path)?;
    load_schema(&conn)
}

/// Builds the schema a SQL script creates.
///
/// # Examples
///
/// ```
/// use sqlsynth_sqlite::load_schema_from_sql;
///
/// let schema = load_schema_from_sql(
///     "CREATE TABLE owner (id INTEGER PRIMARY KEY);
///      CREATE TABLE pet (id INTEGER PRIMARY KEY, owner_id INTEGER REFERENCES owner(id));",
/// )
/// .unwrap();
/// assert_eq!(schema.entity_names(), vec!["owner", "pet"]);
/// assert_eq!(schema.table("pet").unwrap().foreign_keys[0].destination_table, "owner");
/// ```
pub fn load_schema_from_sql(sql: &str) -> Result<Schema> {
    build_schema(&read_catalog_from_sql(sql)?)
}

fn creation_sql(object: &MasterRow) -> Result<String> {
    object.sql.clone().ok_or_else(|| CatalogError::MalformedRow {
        object: object.name.clone(),
        detail: format!("{} without SQL", object.object_type),
    })
}

fn columns_of(catalog: &RawCatalog, object: &MasterRow) -> Result<Vec<Column>> {
    let rows = catalog
        .columns
        .get(&object.name)
        .ok_or_else(|| CatalogError::MalformedRow {
            object: object.name.clone(),
            detail: "no column information".to_string(),
        })?;
    rows.iter().map(|row| column(&object.name, row)).collect()
}

fn column(object: &str, row: &ColumnRow) -> Result<Column> {
    let malformed = |detail: String| CatalogError::MalformedRow {
        object: object.to_string(),
        detail,
    };
    if row.name.is_empty() {
        return Err(malformed(format!("column {} has no name", row.cid)));
    }
    let position = u32::try_from(row.pk)
        .map_err(|_| malformed(format!("column {} has key position {}", row.name, row.pk)))?;

    let mut column = Column::new(
        row.cid,
        &row.name,
        ColumnType::parse_declared(Some(&row.declared_type)),
    );
    if row.not_null {
        column = column.not_null();
    }
    if let Some(default_sql) = &row.default_sql {
        column = column.with_default_sql(default_sql);
    }
    if position > 0 {
        column = column.primary_key(position);
    }
    Ok(column)
}

fn foreign_key(table: &str, row: &ForeignKeyRow) -> Result<ForeignKey> {
    let malformed = |detail: String| CatalogError::MalformedRow {
        object: table.to_string(),
        detail,
    };
    let action = |raw: &str| {
        ForeignKeyAction::parse(raw).ok_or_else(|| malformed(format!("unknown referential action '{raw}'")))
    };

    let mut foreign_key = ForeignKey::new(&row.from, &row.table, row.to.as_deref());
    foreign_key.id = row.id;
    foreign_key.seq = row.seq;
    foreign_key.on_update = action(&row.on_update)?;
    foreign_key.on_delete = action(&row.on_delete)?;
    foreign_key.match_mode = MatchMode::parse(&row.match_mode)
        .ok_or_else(|| malformed(format!("unknown match mode '{}'", row.match_mode)))?;
    Ok(foreign_key)
}
