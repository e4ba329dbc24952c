//! Boundary to identifier normalization.
//!
//! Turning `person_id` into whatever casing the target language prefers is
//! the emitter's business. Synthesis only needs stable, unique names, and
//! asks a [`Namer`] for them.

/// Supplies names for entities, properties and relationships.
pub trait Namer: Sync {
    fn entity_name(&self, table: &str) -> String;

    fn property_name(&self, column: &str) -> String;

    /// Name of the to-one accessor for foreign-key column `source_column`.
    fn to_one_name(&self, source_column: &str, destination_entity: &str) -> String;

    /// Name of the to-many accessor listing `source_entity` rows.
    /// `by_column` is set when several foreign keys of `source_entity`
    /// point at the same entity and the name must be disambiguated.
    fn to_many_name(&self, source_entity: &str, by_column: Option<&str>) -> String;
}

/// Keeps catalog names as they are.
///
/// To-one accessors drop a key suffix from the column name (falling back to
/// the destination entity); to-many accessors are named after the source
/// entity.
///
/// # Examples
///
/// ```
/// use sqlsynth_synth::{Namer, VerbatimNamer};
///
/// let namer = VerbatimNamer;
/// assert_eq!(namer.to_one_name("owner_id", "person"), "owner");
/// assert_eq!(namer.to_one_name("id", "person"), "person");
/// assert_eq!(namer.to_one_name("guid", "token"), "token");
/// assert_eq!(namer.to_many_name("pet", Some("owner_id")), "pet_by_owner_id");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimNamer;

impl Namer for VerbatimNamer {
    fn entity_name(&self, table: &str) -> String {
        table.to_string()
    }

    fn property_name(&self, column: &str) -> String {
        column.to_string()
    }

    fn to_one_name(&self, source_column: &str, destination_entity: &str) -> String {
        match key_stem(source_column) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => destination_entity.to_string(),
        }
    }

    fn to_many_name(&self, source_entity: &str, by_column: Option<&str>) -> String {
        match by_column {
            Some(column) => format!("{source_entity}_by_{column}"),
            None => source_entity.to_string(),
        }
    }
}

/// Column name without its key suffix: `_id` in any case, or `Id`/`ID`
/// right after a lowercase letter.
fn key_stem(column: &str) -> Option<&str> {
    let split = column.len().checked_sub(2)?;
    let (head, suffix) = (column.get(..split)?, column.get(split..)?);
    if !suffix.eq_ignore_ascii_case("id") {
        return None;
    }
    if let Some(stem) = head.strip_suffix('_') {
        return Some(stem.trim_end_matches('_'));
    }
    let camel = suffix.starts_with('I') && head.chars().last().is_some_and(char::is_lowercase);
    camel.then_some(head)
}
