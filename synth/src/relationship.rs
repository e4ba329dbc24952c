//! Relationship accessor synthesis.
//!
//! A to-one accessor ("find") looks up the destination row whose key equals
//! the source's foreign-key value; binding a null key matches nothing and
//! reads as "not found". A to-many accessor ("fetch") lists the source rows
//! pointing at a destination row. Both reuse the canonical select, bind
//! chains and extract expressions of the entity they read.

use serde::{Deserialize, Serialize};
use sqlsynth_core::{Entity, GeneratorConfig, Property, ToManyRelationship, ToOneRelationship};

use crate::bind::{BindBlock, Terminal, bind_chain};
use crate::error::{Result, SynthError};
use crate::extract::{ExtractExpr, extract_exprs};
use crate::index::StaticIndexTable;
use crate::sql;

/// Single-row lookup of a destination entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToOneAccessor {
    pub name: String,
    /// Property of the owning entity whose value is bound.
    pub source_property: String,
    pub destination_entity: String,
    pub destination_property: String,
    pub sql: String,
    pub bind: BindBlock,
    /// Extract expressions of the destination entity.
    pub extract: Vec<ExtractExpr>,
}

/// Filtered select of source rows pointing at the owning entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToManyAccessor {
    pub name: String,
    pub source_entity: String,
    pub source_property: String,
    /// Property of the owning entity whose value is bound.
    pub destination_property: String,
    pub sql: String,
    pub bind: BindBlock,
    /// Extract expressions of the source entity.
    pub extract: Vec<ExtractExpr>,
}

impl ToManyAccessor {
    /// Statement text with raw `ORDER BY` and `LIMIT` fragments appended
    /// verbatim. The fragments are not checked.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sqlsynth_synth::{BindBlock, Terminal, ToManyAccessor};
    /// let accessor = ToManyAccessor {
    ///     name: "pet".into(),
    ///     source_entity: "pet".into(),
    ///     source_property: "owner_id".into(),
    ///     destination_property: "id".into(),
    ///     sql: r#"SELECT "id" FROM "pet" WHERE "owner_id" = ?1"#.into(),
    ///     bind: BindBlock::build(Vec::new(), Terminal::Continuation),
    ///     extract: Vec::new(),
    /// };
    /// assert_eq!(
    ///     accessor.sql_with(Some("\"id\" DESC"), Some("10")),
    ///     r#"SELECT "id" FROM "pet" WHERE "owner_id" = ?1 ORDER BY "id" DESC LIMIT 10"#
    /// );
    /// ```
    pub fn sql_with(&self, order_by: Option<&str>, limit: Option<&str>) -> String {
        let mut sql = self.sql.clone();
        if let Some(order_by) = order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ");
            sql.push_str(limit);
        }
        sql
    }
}

/// Resolves an entity named by a relationship.
fn entity_named<'a>(entities: &'a [Entity], name: &str) -> Result<&'a Entity> {
    entities
        .iter()
        .find(|e| e.name == name)
        .ok_or_else(|| SynthError::UnknownEntity(name.to_string()))
}

fn property_of<'a>(entity: &'a Entity, name: &str) -> Result<&'a Property> {
    entity
        .property(name)
        .ok_or_else(|| SynthError::UnknownEntity(format!("{}.{name}", entity.name)))
}

pub fn to_one_accessor(
    source: &Entity,
    relationship: &ToOneRelationship,
    entities: &[Entity],
    config: &GeneratorConfig,
) -> Result<ToOneAccessor> {
    let destination = entity_named(entities, &relationship.destination_entity)?;
    let key = property_of(destination, &relationship.destination_property)?;
    let value = property_of(source, &relationship.source_property)?;

    // A null foreign key binds NULL, which matches nothing.
    let bind = bind_chain(source, [value], config, Terminal::Continuation, |_| true)?;
    let static_indices = StaticIndexTable::for_entity(destination);

    Ok(ToOneAccessor {
        name: relationship.name.clone(),
        source_property: relationship.source_property.clone(),
        destination_entity: destination.name.clone(),
        destination_property: relationship.destination_property.clone(),
        sql: format!("{} LIMIT 1", sql::select_where(destination, key)),
        bind,
        extract: extract_exprs(destination, &static_indices, config)?,
    })
}

pub fn to_many_accessor(
    destination: &Entity,
    relationship: &ToManyRelationship,
    entities: &[Entity],
    config: &GeneratorConfig,
) -> Result<ToManyAccessor> {
    let source = entity_named(entities, &relationship.source_entity)?;
    let foreign_key = property_of(source, &relationship.source_property)?;
    let key = property_of(destination, &relationship.destination_property)?;

    let bind = bind_chain(destination, [key], config, Terminal::Continuation, |p| p.is_nullable())?;
    let static_indices = StaticIndexTable::for_entity(source);

    Ok(ToManyAccessor {
        name: relationship.name.clone(),
        source_entity: source.name.clone(),
        source_property: relationship.source_property.clone(),
        destination_property: relationship.destination_property.clone(),
        sql: sql::select_where(source, foreign_key),
        bind,
        extract: extract_exprs(source, &static_indices, config)?,
    })
}
