//! Per-entity operation bundles and the synthesis driver.

use serde::{Deserialize, Serialize};
use sqlsynth_core::{ColumnType, Entity, EntityKind, GeneratorConfig, Property, Schema};
use tracing::{debug, info};

use crate::bind::{BindBlock, Terminal, bind_chain};
use crate::diagnostics::{Diagnostic, DiagnosticCode, SynthesisReport};
use crate::error::{Result, SynthError};
use crate::extract::{ExtractExpr, extract_exprs};
use crate::index::{DynamicIndexLookup, StaticIndexTable};
use crate::model::{build_model, push};
use crate::namer::Namer;
use crate::relationship::{ToManyAccessor, ToOneAccessor, to_many_accessor, to_one_accessor};
use crate::sql;

/// A write statement and the chain binding its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOperation {
    pub sql: String,
    pub bind: BindBlock,
}

/// Insert that hands back the stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReturning {
    /// `INSERT ... RETURNING` with the canonical column list.
    pub sql: String,
    pub bind: BindBlock,
    /// Rowid-based select for engines without `RETURNING`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_select: Option<String>,
}

/// Everything an emitter needs for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBundle {
    pub entity: Entity,
    pub static_indices: StaticIndexTable,
    pub dynamic_lookup: DynamicIndexLookup,
    pub extract: Vec<ExtractExpr>,
    pub insert: Option<WriteOperation>,
    pub insert_returning: Option<InsertReturning>,
    pub update: Option<WriteOperation>,
    pub delete: Option<WriteOperation>,
    pub to_one: Vec<ToOneAccessor>,
    pub to_many: Vec<ToManyAccessor>,
}

impl EntityBundle {
    pub fn to_one(&self, name: &str) -> Option<&ToOneAccessor> {
        self.to_one.iter().find(|a| a.name == name)
    }

    pub fn to_many(&self, name: &str) -> Option<&ToManyAccessor> {
        self.to_many.iter().find(|a| a.name == name)
    }

    fn write_operations(&self) -> usize {
        [self.insert.is_some(), self.update.is_some(), self.delete.is_some()]
            .iter()
            .filter(|present| **present)
            .count()
    }
}

/// Output of one synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutput {
    pub schema_version: i64,
    pub user_version: i64,
    pub bundles: Vec<EntityBundle>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SynthesisOutput {
    pub fn bundle(&self, entity: &str) -> Option<&EntityBundle> {
        self.bundles.iter().find(|b| b.entity.name == entity)
    }

    pub fn report(&self) -> SynthesisReport {
        SynthesisReport {
            entities: self.bundles.len(),
            properties: self.bundles.iter().map(|b| b.entity.properties.len()).sum(),
            write_operations: self.bundles.iter().map(EntityBundle::write_operations).sum(),
            to_one_accessors: self.bundles.iter().map(|b| b.to_one.len()).sum(),
            to_many_accessors: self.bundles.iter().map(|b| b.to_many.len()).sum(),
            diagnostics: self.diagnostics.len(),
        }
    }
}

/// Synthesizes a bundle for every entity of `schema`.
///
/// Entities are synthesized in parallel and collected in catalog order, so
/// the output is identical from run to run.
///
/// # Errors
///
/// Returns the first [`SynthError`] of any entity; nothing is emitted then.
pub fn synthesize(schema: &Schema, config: &GeneratorConfig, namer: &dyn Namer) -> Result<SynthesisOutput> {
    use rayon::prelude::*;

    let model = build_model(schema, config, namer)?;
    let entities = model.entities.as_slice();

    let results: Vec<(EntityBundle, Vec<Diagnostic>)> = entities
        .par_iter()
        .map(|entity| synthesize_entity(entity, entities, config))
        .collect::<Result<Vec<_>>>()?;

    let mut diagnostics = model.diagnostics.clone();
    let mut bundles = Vec::with_capacity(results.len());
    for (bundle, findings) in results {
        for diagnostic in findings {
            push(&mut diagnostics, diagnostic);
        }
        bundles.push(bundle);
    }

    let output = SynthesisOutput {
        schema_version: schema.version,
        user_version: schema.user_version,
        bundles,
        diagnostics,
    };
    info!(summary = %output.report().summary(), "Synthesis complete");
    Ok(output)
}

/// Synthesizes the bundle of one entity of an already built model.
pub fn synthesize_entity(
    entity: &Entity,
    entities: &[Entity],
    config: &GeneratorConfig,
) -> Result<(EntityBundle, Vec<Diagnostic>)> {
    let mut findings = Vec::new();
    let static_indices = StaticIndexTable::for_entity(entity);
    let extract = extract_exprs(entity, &static_indices, config)?;

    let (insert, insert_returning) = if entity.can_insert {
        let insert = insert_operation(entity, config)?;
        let fallback_select = match (config.insert_returning_fallback, entity.without_rowid) {
            (false, _) => None,
            (true, false) => Some(sql::select_last_inserted(entity)),
            (true, true) => {
                findings.push(Diagnostic::entity(
                    &entity.name,
                    DiagnosticCode::ReturningFallbackUnavailable,
                    "WITHOUT ROWID table has no last_insert_rowid()",
                ));
                None
            }
        };
        let returning = InsertReturning {
            sql: sql::insert_returning(entity),
            bind: insert.bind.clone(),
            fallback_select,
        };
        (Some(insert), Some(returning))
    } else {
        (None, None)
    };

    let update = entity
        .can_update
        .then(|| update_operation(entity, config))
        .transpose()?;
    let delete = entity
        .can_delete
        .then(|| delete_operation(entity, config))
        .transpose()?;

    let to_one = entity
        .to_one
        .iter()
        .map(|relationship| to_one_accessor(entity, relationship, entities, config))
        .collect::<Result<Vec<_>>>()?;
    let to_many = entity
        .to_many
        .iter()
        .map(|relationship| to_many_accessor(entity, relationship, entities, config))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        entity = %entity.name,
        kind = ?entity.kind,
        to_one = to_one.len(),
        to_many = to_many.len(),
        "Synthesized entity"
    );

    let bundle = EntityBundle {
        entity: entity.clone(),
        static_indices,
        dynamic_lookup: DynamicIndexLookup::for_entity(entity),
        extract,
        insert,
        insert_returning,
        update,
        delete,
        to_one,
        to_many,
    };
    Ok((bundle, findings))
}

/// Whether an insert may bind NULL for the property. A rowid alias is
/// not-null when read but NULL on insert asks the engine for a new rowid.
fn insert_nullable(entity: &Entity, property: &Property) -> bool {
    let rowid_alias = entity.kind == EntityKind::Table
        && !entity.without_rowid
        && property.is_primary_key
        && entity.primary_key_properties().len() == 1
        && property.column_type == Some(ColumnType::Integer);
    property.is_nullable() || rowid_alias
}

fn insert_operation(entity: &Entity, config: &GeneratorConfig) -> Result<WriteOperation> {
    let bind = bind_chain(entity, &entity.properties, config, Terminal::Step, |p| {
        insert_nullable(entity, p)
    })?;
    Ok(WriteOperation {
        sql: sql::insert(entity),
        bind,
    })
}

fn update_operation(entity: &Entity, config: &GeneratorConfig) -> Result<WriteOperation> {
    if entity.primary_key.is_none() {
        return Err(SynthError::MissingPrimaryKey(entity.name.clone()));
    }
    let properties = entity
        .non_key_properties()
        .into_iter()
        .chain(entity.primary_key_properties());
    let bind = bind_chain(entity, properties, config, Terminal::Step, Property::is_nullable)?;
    Ok(WriteOperation {
        sql: sql::update(entity),
        bind,
    })
}

fn delete_operation(entity: &Entity, config: &GeneratorConfig) -> Result<WriteOperation> {
    if entity.primary_key.is_none() {
        return Err(SynthError::MissingPrimaryKey(entity.name.clone()));
    }
    let bind = bind_chain(
        entity,
        entity.primary_key_properties(),
        config,
        Terminal::Step,
        Property::is_nullable,
    )?;
    Ok(WriteOperation {
        sql: sql::delete(entity),
        bind,
    })
}
