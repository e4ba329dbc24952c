//! SQL statement text for synthesized operations.
//!
//! Identifiers are always double-quoted; parameters are numbered `?1..?N`
//! in bind order.

use sqlsynth_core::{Entity, Property};

/// Quotes an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(properties: &[&Property]) -> String {
    properties
        .iter()
        .map(|p| quote_identifier(&p.external_name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn all_columns(entity: &Entity) -> String {
    column_list(&entity.properties.iter().collect::<Vec<_>>())
}

/// `"a" = ?n AND "b" = ?n+1 ...` starting at parameter `first`.
fn equality_list(properties: &[&Property], first: usize, separator: &str) -> String {
    properties
        .iter()
        .enumerate()
        .map(|(offset, p)| format!("{} = ?{}", quote_identifier(&p.external_name), first + offset))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Canonical select of every column in ordinal order.
pub fn select_all(entity: &Entity) -> String {
    format!(
        "SELECT {} FROM {}",
        all_columns(entity),
        quote_identifier(&entity.external_name)
    )
}

/// Canonical select filtered by one column bound to `?1`.
pub fn select_where(entity: &Entity, filter: &Property) -> String {
    format!(
        "{} WHERE {} = ?1",
        select_all(entity),
        quote_identifier(&filter.external_name)
    )
}

pub fn insert(entity: &Entity) -> String {
    let placeholders: Vec<String> = (1..=entity.properties.len()).map(|n| format!("?{n}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(&entity.external_name),
        all_columns(entity),
        placeholders.join(", ")
    )
}

pub fn insert_returning(entity: &Entity) -> String {
    format!("{} RETURNING {}", insert(entity), all_columns(entity))
}

/// Reads back the row just inserted through its rowid.
pub fn select_last_inserted(entity: &Entity) -> String {
    format!("{} WHERE rowid = last_insert_rowid()", select_all(entity))
}

/// Sets every non-key column, keyed by the primary key.
pub fn update(entity: &Entity) -> String {
    let values = entity.non_key_properties();
    let keys = entity.primary_key_properties();
    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_identifier(&entity.external_name),
        equality_list(&values, 1, ", "),
        equality_list(&keys, values.len() + 1, " AND ")
    )
}

pub fn delete(entity: &Entity) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        quote_identifier(&entity.external_name),
        equality_list(&entity.primary_key_properties(), 1, " AND ")
    )
}
