//! Schema model validation.
//!
//! SQLite accepts schemas that cannot be turned into sound record types:
//! foreign keys may reference tables that do not exist, and views can
//! report duplicate column names. [`validate_schema`] reports these so the
//! caller can surface them before synthesis silently skips the affected
//! parts.
//!
//! # Examples
//!
//! ```
//! use sqlsynth_core::*;
//!
//! let mut schema = Schema::default();
//! schema.tables.push(
//!     Table::new("pet", "CREATE TABLE pet (owner_id INTEGER REFERENCES owner)", vec![
//!         Column::new(0, "owner_id", Some(ColumnType::Integer)),
//!     ])
//!     .with_foreign_key(ForeignKey::new("owner_id", "owner", None)),
//! );
//!
//! let errors = validate_schema(&schema);
//! assert_eq!(
//!     errors,
//!     vec![ValidationError::MissingForeignKeyTable {
//!         table: "pet".into(),
//!         destination: "owner".into(),
//!     }]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{Column, Schema};

/// Structural problems found in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A table or view has an empty name.
    #[error("entity name cannot be empty")]
    EmptyEntityName,
    /// A table and a view share a name.
    #[error("duplicate entity name: {0}")]
    DuplicateEntity(String),
    /// A column has an empty name.
    #[error("column name cannot be empty in {0}")]
    EmptyColumnName(String),
    /// Two columns of one entity share a name (case-insensitively).
    #[error("duplicate column {column} in {entity}")]
    DuplicateColumn { entity: String, column: String },
    /// A foreign key references a table that does not exist.
    #[error("foreign key in {table} references missing table {destination}")]
    MissingForeignKeyTable { table: String, destination: String },
    /// A foreign key references a column that does not exist.
    #[error("foreign key in {table} references missing column {destination}.{column}")]
    MissingForeignKeyColumn {
        table: String,
        destination: String,
        column: String,
    },
}

/// Validates a schema model and returns every finding, in catalog order.
pub fn validate_schema(schema: &Schema) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen_entities: HashSet<String> = HashSet::new();

    let entities = schema
        .tables
        .iter()
        .map(|t| (t.name.as_str(), t.columns.as_slice()))
        .chain(schema.views.iter().map(|v| (v.name.as_str(), v.columns.as_slice())));

    for (name, columns) in entities {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyEntityName);
            continue;
        }
        if !seen_entities.insert(name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateEntity(name.to_string()));
        }
        errors.extend(validate_columns(name, columns));
    }

    for table in &schema.tables {
        for foreign_key in &table.foreign_keys {
            let Some(destination) = schema.table(&foreign_key.destination_table) else {
                errors.push(ValidationError::MissingForeignKeyTable {
                    table: table.name.clone(),
                    destination: foreign_key.destination_table.clone(),
                });
                continue;
            };
            if let Some(column) = &foreign_key.destination_column {
                if destination.column(column).is_none() {
                    errors.push(ValidationError::MissingForeignKeyColumn {
                        table: table.name.clone(),
                        destination: destination.name.clone(),
                        column: column.clone(),
                    });
                }
            }
        }
    }

    errors
}

fn validate_columns(entity: &str, columns: &[Column]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for column in columns {
        if column.name.trim().is_empty() {
            errors.push(ValidationError::EmptyColumnName(entity.to_string()));
            continue;
        }
        if !seen.insert(column.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateColumn {
                entity: entity.to_string(),
                column: column.name.clone(),
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnType, ForeignKey, Table, View};

    fn owner() -> Table {
        Table::new(
            "owner",
            "CREATE TABLE owner (id INTEGER PRIMARY KEY)",
            vec![Column::new(0, "id", Some(ColumnType::Integer)).primary_key(1)],
        )
    }

    #[test]
    fn test_valid_schema_has_no_findings() {
        let mut schema = Schema::default();
        schema.tables.push(owner());
        schema.tables.push(
            Table::new(
                "pet",
                "CREATE TABLE pet (owner_id INTEGER REFERENCES owner(id))",
                vec![Column::new(0, "owner_id", Some(ColumnType::Integer))],
            )
            .with_foreign_key(ForeignKey::new("owner_id", "OWNER", Some("id"))),
        );
        assert!(validate_schema(&schema).is_empty());
    }

    #[test]
    fn test_missing_foreign_key_column() {
        let mut schema = Schema::default();
        schema.tables.push(owner());
        schema.tables.push(
            Table::new("pet", "", vec![Column::new(0, "owner_id", None)])
                .with_foreign_key(ForeignKey::new("owner_id", "owner", Some("uuid"))),
        );
        assert_eq!(
            validate_schema(&schema),
            vec![ValidationError::MissingForeignKeyColumn {
                table: "pet".to_string(),
                destination: "owner".to_string(),
                column: "uuid".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_view_columns() {
        let mut schema = Schema::default();
        schema.views.push(View::new(
            "pairs",
            "CREATE VIEW pairs AS SELECT 1 AS x, 2 AS X",
            vec![Column::new(0, "x", None), Column::new(1, "X", None)],
        ));
        assert_eq!(
            validate_schema(&schema),
            vec![ValidationError::DuplicateColumn {
                entity: "pairs".to_string(),
                column: "X".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_entity_across_tables_and_views() {
        let mut schema = Schema::default();
        schema.tables.push(owner());
        schema.views.push(View::new("Owner", "", Vec::new()));
        assert_eq!(
            validate_schema(&schema),
            vec![ValidationError::DuplicateEntity("Owner".to_string())]
        );
    }
}
