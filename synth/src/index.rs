//! Column index resolution.
//!
//! The canonical select lists every column in ordinal order, so its index
//! table is a constant. Any other statement is resolved by name at run
//! time: each property looks for a result column whose name equals its
//! external name exactly.

use serde::{Deserialize, Serialize};
use sqlsynth_core::Entity;

use crate::sql;

/// Index of a property absent from a result set.
pub const INDEX_UNMATCHED: i32 = -1;

/// Where one property sits in the canonical select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticIndexEntry {
    pub property: String,
    pub column: String,
    pub index: i32,
}

/// Constant index table of the canonical select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticIndexTable {
    pub sql: String,
    pub entries: Vec<StaticIndexEntry>,
}

impl StaticIndexTable {
    pub fn for_entity(entity: &Entity) -> Self {
        let entries = entity
            .properties
            .iter()
            .enumerate()
            .map(|(ordinal, property)| StaticIndexEntry {
                property: property.name.clone(),
                column: property.external_name.clone(),
                index: ordinal as i32,
            })
            .collect();
        Self {
            sql: sql::select_all(entity),
            entries,
        }
    }

    pub fn index_of(&self, property: &str) -> i32 {
        self.entries
            .iter()
            .find(|e| e.property == property)
            .map_or(INDEX_UNMATCHED, |e| e.index)
    }
}

/// One property and the column name it answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTarget {
    pub property: String,
    pub external_name: String,
}

/// Name-based index lookup for arbitrary statements.
///
/// # Examples
///
/// ```
/// use sqlsynth_synth::{DynamicIndexLookup, LookupTarget};
///
/// let lookup = DynamicIndexLookup {
///     targets: vec![
///         LookupTarget { property: "id".into(), external_name: "id".into() },
///         LookupTarget { property: "name".into(), external_name: "name".into() },
///     ],
/// };
/// let resolved = lookup.resolve(&["name"]);
/// assert_eq!(resolved.get("name"), Some(0));
/// assert_eq!(resolved.get("id"), Some(-1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicIndexLookup {
    pub targets: Vec<LookupTarget>,
}

impl DynamicIndexLookup {
    pub fn for_entity(entity: &Entity) -> Self {
        Self {
            targets: entity
                .properties
                .iter()
                .map(|p| LookupTarget {
                    property: p.name.clone(),
                    external_name: p.external_name.clone(),
                })
                .collect(),
        }
    }

    /// Assigns each property the position of the first result column named
    /// exactly like it, or [`INDEX_UNMATCHED`].
    pub fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> ResolvedIndices {
        let assignments = self
            .targets
            .iter()
            .map(|target| {
                let index = columns
                    .iter()
                    .position(|column| column.as_ref() == target.external_name)
                    .map_or(INDEX_UNMATCHED, |position| position as i32);
                IndexAssignment {
                    property: target.property.clone(),
                    index,
                }
            })
            .collect();
        ResolvedIndices { assignments }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexAssignment {
    pub property: String,
    pub index: i32,
}

/// Result of one dynamic resolution, in property order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIndices {
    pub assignments: Vec<IndexAssignment>,
}

impl ResolvedIndices {
    pub fn get(&self, property: &str) -> Option<i32> {
        self.assignments
            .iter()
            .find(|a| a.property == property)
            .map(|a| a.index)
    }

    /// Pairs as `(property, index)`.
    pub fn pairs(&self) -> Vec<(&str, i32)> {
        self.assignments
            .iter()
            .map(|a| (a.property.as_str(), a.index))
            .collect()
    }
}
