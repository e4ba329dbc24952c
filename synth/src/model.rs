//! Schema model to entity model.
//!
//! Builds one [`Entity`] per included table and view: resolves property
//! types and defaults, marks primary keys, decides write capabilities, and
//! derives to-one/to-many relationships from foreign keys. Relationships
//! name their counterpart entity; a foreign key whose destination cannot be
//! resolved is dropped with a diagnostic rather than guessed at.

use std::collections::{BTreeMap, HashSet};

use sqlsynth_core::{
    Column, ColumnType, Entity, EntityKind, ForeignKey, ForeignKeyRef, GeneratorConfig, PrimaryKey,
    Property, PropertyType, Schema, Table, ToManyRelationship, ToOneRelationship, TypeAffinity, View,
};
use tracing::{debug, warn};

use crate::defaults::resolve_default;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{Result, SynthError};
use crate::namer::Namer;
use crate::resolve::resolve_property_type;

/// Entities of one run plus the findings made while building them.
#[derive(Debug, Clone, Default)]
pub struct EntityModel {
    /// Tables then views, in catalog order.
    pub entities: Vec<Entity>,
    pub diagnostics: Vec<Diagnostic>,
}

impl EntityModel {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

/// Builds the entity model of `schema`.
///
/// # Errors
///
/// Returns [`SynthError::StrictDefault`] when `strict_defaults` is set and
/// a column default has no conversion to its property type.
pub fn build_model(schema: &Schema, config: &GeneratorConfig, namer: &dyn Namer) -> Result<EntityModel> {
    let mut model = EntityModel::default();

    for table in &schema.tables {
        if config.is_excluded(&table.name) {
            push(
                &mut model.diagnostics,
                Diagnostic::entity(&table.name, DiagnosticCode::ExcludedEntity, "excluded by configuration"),
            );
            continue;
        }
        let entity = build_table(table, config, namer, &mut model.diagnostics)?;
        model.entities.push(entity);
    }

    for view in &schema.views {
        if !config.include_views || config.is_excluded(&view.name) {
            push(
                &mut model.diagnostics,
                Diagnostic::entity(&view.name, DiagnosticCode::ExcludedEntity, "excluded by configuration"),
            );
            continue;
        }
        let entity = build_view(view, config, namer, &mut model.diagnostics)?;
        model.entities.push(entity);
    }

    link_relationships(schema, namer, &mut model);

    debug!(
        entities = model.entities.len(),
        diagnostics = model.diagnostics.len(),
        "Built entity model"
    );
    Ok(model)
}

fn build_table(
    table: &Table,
    config: &GeneratorConfig,
    namer: &dyn Namer,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Entity> {
    let name = namer.entity_name(&table.name);
    let without_rowid = table.is_without_rowid();
    let key_columns = table.primary_key_columns();
    let rowid_alias = match key_columns.as_slice() {
        [only] if !without_rowid && only.column_type == Some(ColumnType::Integer) => Some(only.name.as_str()),
        _ => None,
    };

    let mut properties = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        // Rowid aliases and WITHOUT ROWID keys never hold NULL.
        let implicit_not_null = rowid_alias.is_some_and(|alias| alias == column.name)
            || (without_rowid && column.is_primary_key());
        let mut property = build_property(&name, column, implicit_not_null, config, namer, diagnostics)?;
        property.foreign_key = foreign_key_ref(table, &column.name);
        properties.push(property);
    }

    let key_names: Vec<String> = key_columns
        .iter()
        .map(|column| namer.property_name(&column.name))
        .collect();
    let primary_key = match key_names.len() {
        0 => None,
        1 => key_names.into_iter().next().map(PrimaryKey::Simple),
        _ => Some(PrimaryKey::Compound(key_names)),
    };

    let writable = !config.read_only;
    let has_key = primary_key.is_some();
    let has_non_key = properties.iter().any(|p| !p.is_primary_key);

    debug!(entity = %name, properties = properties.len(), without_rowid, "Built table entity");

    Ok(Entity {
        name,
        external_name: table.name.clone(),
        kind: EntityKind::Table,
        properties,
        primary_key,
        to_one: Vec::new(),
        to_many: Vec::new(),
        can_insert: writable,
        can_update: writable && has_key && has_non_key,
        can_delete: writable && has_key,
        without_rowid,
    })
}

fn build_view(
    view: &View,
    config: &GeneratorConfig,
    namer: &dyn Namer,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Entity> {
    let name = namer.entity_name(&view.name);
    let properties = view
        .columns
        .iter()
        .map(|column| build_property(&name, column, false, config, namer, diagnostics))
        .collect::<Result<Vec<_>>>()?;

    debug!(entity = %name, properties = properties.len(), "Built view entity");

    Ok(Entity {
        name,
        external_name: view.name.clone(),
        kind: EntityKind::View,
        properties,
        primary_key: None,
        to_one: Vec::new(),
        to_many: Vec::new(),
        can_insert: false,
        can_update: false,
        can_delete: false,
        without_rowid: false,
    })
}

fn build_property(
    entity: &str,
    column: &Column,
    implicit_not_null: bool,
    config: &GeneratorConfig,
    namer: &dyn Namer,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Property> {
    let name = namer.property_name(&column.name);
    let property_type = resolve_property_type(column, config);
    let is_not_null = column.is_not_null || implicit_not_null;
    let affinity = column.affinity();

    // Numeric affinity turns well-formed decimal text into an integer or a
    // real, which keeps about 15 significant digits.
    if property_type == PropertyType::Decimal && !matches!(affinity, TypeAffinity::Text | TypeAffinity::Blob) {
        push(
            diagnostics,
            Diagnostic::property(
                entity,
                &name,
                DiagnosticCode::DecimalPrecisionLoss,
                format!("{affinity} affinity stores decimal text as a number"),
            ),
        );
    }

    let default_value = match (&column.default_value, &column.default_sql) {
        (Some(default), _) => match resolve_default(default, &property_type, is_not_null, config) {
            Ok(literal) => Some(literal),
            Err(unsupported) if config.strict_defaults => {
                return Err(SynthError::StrictDefault {
                    entity: entity.to_string(),
                    property: name,
                    kind: unsupported.kind,
                    property_type: unsupported.property_type,
                });
            }
            Err(unsupported) => {
                push(
                    diagnostics,
                    Diagnostic::property(entity, &name, DiagnosticCode::UnsupportedDefault, unsupported.to_string()),
                );
                None
            }
        },
        (None, Some(sql)) => {
            push(
                diagnostics,
                Diagnostic::property(
                    entity,
                    &name,
                    DiagnosticCode::UnparseableDefault,
                    format!("default {sql} is not a literal"),
                ),
            );
            None
        }
        (None, None) => None,
    };

    Ok(Property {
        name,
        external_name: column.name.clone(),
        property_type,
        column_type: column.column_type.clone(),
        affinity,
        is_not_null,
        is_primary_key: column.is_primary_key(),
        default_value,
        foreign_key: None,
    })
}

fn foreign_key_ref(table: &Table, column: &str) -> Option<ForeignKeyRef> {
    let foreign_key = table
        .foreign_keys
        .iter()
        .find(|fk| fk.source_column.eq_ignore_ascii_case(column))?;
    let parts = table.foreign_keys.iter().filter(|fk| fk.id == foreign_key.id).count();
    Some(ForeignKeyRef {
        constraint_id: foreign_key.id,
        destination_table: foreign_key.destination_table.clone(),
        destination_column: foreign_key.destination_column.clone(),
        is_compound: parts > 1,
    })
}

/// A foreign key that survived every relationship check.
struct Link {
    source_entity: usize,
    source_property: String,
    source_column: String,
    destination_entity: usize,
    destination_property: String,
}

fn link_relationships(schema: &Schema, namer: &dyn Namer, model: &mut EntityModel) {
    let mut links = Vec::new();
    let mut findings = Vec::new();

    for (source_index, entity) in model.entities.iter().enumerate() {
        if entity.kind != EntityKind::Table {
            continue;
        }
        let Some(table) = schema.table(&entity.external_name) else {
            continue;
        };

        let mut constraints: BTreeMap<i64, Vec<&ForeignKey>> = BTreeMap::new();
        for foreign_key in &table.foreign_keys {
            constraints.entry(foreign_key.id).or_default().push(foreign_key);
        }

        for parts in constraints.values() {
            match check_link(model, source_index, parts) {
                Ok(link) => links.push(link),
                Err(diagnostic) => findings.push(diagnostic),
            }
        }
    }
    for diagnostic in findings {
        push(&mut model.diagnostics, diagnostic);
    }

    // Several links from one entity to the same destination need
    // disambiguated to-many names.
    let mut fan_out: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for link in &links {
        *fan_out.entry((link.source_entity, link.destination_entity)).or_default() += 1;
    }

    let mut taken: Vec<HashSet<String>> = model
        .entities
        .iter()
        .map(|e| e.properties.iter().map(|p| p.name.clone()).collect())
        .collect();

    for link in links {
        let source_name = model.entities[link.source_entity].name.clone();
        let destination_name = model.entities[link.destination_entity].name.clone();

        let to_one_name = unique_name(
            namer.to_one_name(&link.source_column, &destination_name),
            &mut taken[link.source_entity],
        );
        model.entities[link.source_entity].to_one.push(ToOneRelationship {
            name: to_one_name,
            source_property: link.source_property.clone(),
            destination_entity: destination_name,
            destination_property: link.destination_property.clone(),
        });

        let ambiguous = fan_out[&(link.source_entity, link.destination_entity)] > 1;
        let by_column = ambiguous.then_some(link.source_column.as_str());
        let to_many_name = unique_name(
            namer.to_many_name(&source_name, by_column),
            &mut taken[link.destination_entity],
        );
        model.entities[link.destination_entity].to_many.push(ToManyRelationship {
            name: to_many_name,
            source_entity: source_name,
            source_property: link.source_property,
            destination_property: link.destination_property,
        });
    }
}

fn check_link(
    model: &EntityModel,
    source_index: usize,
    parts: &[&ForeignKey],
) -> std::result::Result<Link, Diagnostic> {
    let source = &model.entities[source_index];
    let first = parts[0];

    if parts.len() > 1 {
        let columns: Vec<&str> = parts.iter().map(|fk| fk.source_column.as_str()).collect();
        return Err(Diagnostic::entity(
            &source.name,
            DiagnosticCode::CompoundKey,
            format!("foreign key ({}) references {}", columns.join(", "), first.destination_table),
        ));
    }

    let unresolved = |detail: String| {
        Diagnostic::property(
            &source.name,
            &first.source_column,
            DiagnosticCode::UnresolvedRelationship,
            detail,
        )
    };

    let source_property = source
        .property_by_column(&first.source_column)
        .ok_or_else(|| unresolved(format!("no column {}", first.source_column)))?;

    let destination_index = model
        .entities
        .iter()
        .position(|e| e.kind == EntityKind::Table && e.external_name.eq_ignore_ascii_case(&first.destination_table))
        .ok_or_else(|| unresolved(format!("table {} is not part of the run", first.destination_table)))?;
    let destination = &model.entities[destination_index];

    let destination_property = match &first.destination_column {
        Some(column) => destination
            .property_by_column(column)
            .ok_or_else(|| unresolved(format!("{} has no column {column}", destination.external_name)))?,
        None => match &destination.primary_key {
            Some(PrimaryKey::Simple(key)) => destination
                .property(key)
                .ok_or_else(|| unresolved(format!("{} has no property {key}", destination.name)))?,
            Some(PrimaryKey::Compound(_)) => {
                return Err(Diagnostic::property(
                    &source.name,
                    &source_property.name,
                    DiagnosticCode::CompoundKey,
                    format!("{} has a compound primary key", destination.name),
                ));
            }
            None => return Err(unresolved(format!("{} has no primary key", destination.name))),
        },
    };

    let bindable = matches!(
        (&source_property.property_type, &destination_property.property_type),
        (PropertyType::Integer, PropertyType::Integer) | (PropertyType::String, PropertyType::String)
    );
    if !bindable {
        return Err(Diagnostic::property(
            &source.name,
            &source_property.name,
            DiagnosticCode::UnsupportedRelationshipKey,
            format!(
                "{} key referencing {}.{} ({})",
                source_property.property_type,
                destination.name,
                destination_property.name,
                destination_property.property_type
            ),
        ));
    }

    Ok(Link {
        source_entity: source_index,
        source_property: source_property.name.clone(),
        source_column: source_property.external_name.clone(),
        destination_entity: destination_index,
        destination_property: destination_property.name.clone(),
    })
}

fn unique_name(mut candidate: String, taken: &mut HashSet<String>) -> String {
    while taken.contains(&candidate) {
        candidate.push_str("_record");
    }
    taken.insert(candidate.clone());
    candidate
}

pub(crate) fn push(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    warn!(
        entity = %diagnostic.entity,
        property = ?diagnostic.property,
        code = %diagnostic.code,
        "{}",
        diagnostic.detail
    );
    diagnostics.push(diagnostic);
}

#[cfg(test)]
mod tests {
    use sqlsynth_core::{DefaultValue, Literal};

    use super::*;
    use crate::namer::VerbatimNamer;

    fn integer(id: i64, name: &str) -> Column {
        Column::new(id, name, Some(ColumnType::Integer))
    }

    fn text(id: i64, name: &str) -> Column {
        Column::new(id, name, Some(ColumnType::Text))
    }

    fn pets_schema() -> Schema {
        let mut schema = Schema::default();
        schema.tables.push(Table::new(
            "person",
            "CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            vec![integer(0, "id").primary_key(1), text(1, "name").not_null()],
        ));
        schema.tables.push(
            Table::new(
                "pet",
                "CREATE TABLE pet (id INTEGER PRIMARY KEY, owner_id INTEGER REFERENCES person, sitter_id INTEGER REFERENCES person(id))",
                vec![integer(0, "id").primary_key(1), integer(1, "owner_id"), integer(2, "sitter_id")],
            )
            .with_foreign_key(ForeignKey::new("owner_id", "person", None))
            .with_foreign_key({
                let mut fk = ForeignKey::new("sitter_id", "person", Some("id"));
                fk.id = 1;
                fk
            }),
        );
        schema
    }

    fn build(schema: &Schema, config: &GeneratorConfig) -> EntityModel {
        build_model(schema, config, &VerbatimNamer).unwrap()
    }

    #[test]
    fn test_rowid_alias_is_not_null() {
        let model = build(&pets_schema(), &GeneratorConfig::default());
        let person = model.entity("person").unwrap();
        let id = person.property("id").unwrap();
        assert!(id.is_not_null);
        assert!(id.is_primary_key);
        assert_eq!(person.primary_key, Some(PrimaryKey::Simple("id".into())));
        assert!(person.can_insert && person.can_update && person.can_delete);
    }

    #[test]
    fn test_relationships_are_linked_by_name() {
        let model = build(&pets_schema(), &GeneratorConfig::default());
        let pet = model.entity("pet").unwrap();
        let names: Vec<&str> = pet.to_one.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["owner", "sitter"]);
        assert_eq!(pet.to_one[0].destination_entity, "person");
        assert_eq!(pet.to_one[0].destination_property, "id");
        assert!(pet.property("owner_id").unwrap().foreign_key.is_some());

        let person = model.entity("person").unwrap();
        let names: Vec<&str> = person.to_many.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["pet_by_owner_id", "pet_by_sitter_id"]);
        assert!(model.diagnostics.is_empty());
    }

    #[test]
    fn test_excluded_destination_drops_relationship() {
        let config = GeneratorConfig {
            exclude_tables: vec!["person".to_string()],
            ..GeneratorConfig::default()
        };
        let model = build(&pets_schema(), &config);
        assert!(model.entity("person").is_none());
        assert!(model.entity("pet").unwrap().to_one.is_empty());

        let codes: Vec<DiagnosticCode> = model.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::ExcludedEntity,
                DiagnosticCode::UnresolvedRelationship,
                DiagnosticCode::UnresolvedRelationship,
            ]
        );
    }

    #[test]
    fn test_compound_foreign_key_is_skipped() {
        let mut schema = Schema::default();
        schema.tables.push(Table::new(
            "pair",
            "CREATE TABLE pair (a INTEGER, b INTEGER, PRIMARY KEY (a, b))",
            vec![integer(0, "a").primary_key(1), integer(1, "b").primary_key(2)],
        ));
        schema.tables.push(
            Table::new("link", "", vec![integer(0, "a"), integer(1, "b")])
                .with_foreign_key(ForeignKey::new("a", "pair", Some("a")))
                .with_foreign_key({
                    let mut fk = ForeignKey::new("b", "pair", Some("b"));
                    fk.seq = 1;
                    fk
                }),
        );

        let model = build(&schema, &GeneratorConfig::default());
        let link = model.entity("link").unwrap();
        assert!(link.to_one.is_empty());
        assert!(link.property("a").unwrap().foreign_key.as_ref().unwrap().is_compound);
        assert_eq!(model.diagnostics.len(), 1);
        assert_eq!(model.diagnostics[0].code, DiagnosticCode::CompoundKey);

        let pair = model.entity("pair").unwrap();
        assert_eq!(pair.primary_key, Some(PrimaryKey::Compound(vec!["a".into(), "b".into()])));
        assert!(!pair.can_update);
        assert!(pair.can_delete);
    }

    #[test]
    fn test_mismatched_key_types_are_unsupported() {
        let mut schema = Schema::default();
        schema.tables.push(Table::new(
            "doc",
            "",
            vec![Column::new(0, "code", Some(ColumnType::Blob)).primary_key(1)],
        ));
        schema.tables.push(
            Table::new("ref", "", vec![Column::new(0, "doc_code", Some(ColumnType::Blob))])
                .with_foreign_key(ForeignKey::new("doc_code", "doc", None)),
        );

        let model = build(&schema, &GeneratorConfig::default());
        assert_eq!(model.diagnostics.len(), 1);
        assert_eq!(model.diagnostics[0].code, DiagnosticCode::UnsupportedRelationshipKey);
        assert_eq!(model.diagnostics[0].property.as_deref(), Some("doc_code"));
    }

    #[test]
    fn test_unsupported_default_degrades() {
        let mut schema = Schema::default();
        schema.tables.push(Table::new(
            "flags",
            "",
            vec![
                Column::new(0, "on", Some(ColumnType::Boolean)).not_null().with_default_sql("'true'"),
                Column::new(1, "maybe", Some(ColumnType::Boolean)).not_null().with_default_sql("'maybe'"),
                Column::new(2, "stamp", Some(ColumnType::Text)).with_default_sql("(datetime('now'))"),
            ],
        ));

        let model = build(&schema, &GeneratorConfig::default());
        let flags = model.entity("flags").unwrap();
        assert_eq!(flags.property("on").unwrap().default_value, Some(Literal::Bool(true)));
        assert_eq!(flags.property("maybe").unwrap().default_value, None);
        assert_eq!(flags.property("stamp").unwrap().default_value, None);

        let codes: Vec<DiagnosticCode> = model.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![DiagnosticCode::UnsupportedDefault, DiagnosticCode::UnparseableDefault]
        );
    }

    #[test]
    fn test_decimal_on_numeric_affinity_is_reported() {
        let mut schema = Schema::default();
        schema.tables.push(Table::new(
            "ledger",
            "",
            vec![
                Column::new(0, "amount", Some(ColumnType::Decimal)),
                Column::new(1, "memo", Some(ColumnType::Text)),
            ],
        ));

        let model = build(&schema, &GeneratorConfig::default());
        let amount = model.entity("ledger").unwrap().property("amount").unwrap();
        assert_eq!(amount.property_type, PropertyType::Decimal);
        assert_eq!(model.diagnostics.len(), 1);
        assert_eq!(model.diagnostics[0].code, DiagnosticCode::DecimalPrecisionLoss);
        assert_eq!(model.diagnostics[0].property.as_deref(), Some("amount"));
    }

    #[test]
    fn test_strict_defaults_fail() {
        let mut schema = Schema::default();
        let mut column = Column::new(0, "data", Some(ColumnType::Integer));
        column.default_value = Some(DefaultValue::Blob(vec![1]));
        schema.tables.push(Table::new("t", "", vec![column]));

        let config = GeneratorConfig {
            strict_defaults: true,
            ..GeneratorConfig::default()
        };
        let err = build_model(&schema, &config, &VerbatimNamer).unwrap_err();
        assert!(matches!(err, SynthError::StrictDefault { .. }));
    }

    #[test]
    fn test_read_only_and_views() {
        let mut schema = pets_schema();
        schema.views.push(View::new("names", "CREATE VIEW names AS SELECT name FROM person", vec![text(0, "name")]));

        let config = GeneratorConfig {
            read_only: true,
            ..GeneratorConfig::default()
        };
        let model = build(&schema, &config);
        assert!(model.entities.iter().all(|e| !e.can_insert && !e.can_update && !e.can_delete));
        assert_eq!(model.entity("names").unwrap().kind, EntityKind::View);

        let config = GeneratorConfig {
            include_views: false,
            ..GeneratorConfig::default()
        };
        assert!(build(&schema, &config).entity("names").is_none());
    }
}
