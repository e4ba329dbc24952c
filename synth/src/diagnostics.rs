//! Entity-local findings that degrade synthesis without aborting it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What went wrong, in a stable machine-readable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// A literal default has no mapping to the property type.
    UnsupportedDefault,
    /// A `DEFAULT` clause is an expression, not a literal.
    UnparseableDefault,
    /// A foreign key spans several columns.
    CompoundKey,
    /// A foreign key's column type is not naturally bindable.
    UnsupportedRelationshipKey,
    /// A foreign key's destination table or column does not exist.
    UnresolvedRelationship,
    /// A table or view left out of the run by configuration.
    ExcludedEntity,
    /// Insert-and-return has no select fallback (table has no rowid).
    ReturningFallbackUnavailable,
    /// Decimal text stored under numeric affinity is coerced to a number.
    DecimalPrecisionLoss,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDefault => write!(f, "unsupported_default"),
            Self::UnparseableDefault => write!(f, "unparseable_default"),
            Self::CompoundKey => write!(f, "compound_key"),
            Self::UnsupportedRelationshipKey => write!(f, "unsupported_relationship_key"),
            Self::UnresolvedRelationship => write!(f, "unresolved_relationship"),
            Self::ExcludedEntity => write!(f, "excluded_entity"),
            Self::ReturningFallbackUnavailable => write!(f, "returning_fallback_unavailable"),
            Self::DecimalPrecisionLoss => write!(f, "decimal_precision_loss"),
        }
    }
}

/// One finding about an entity or one of its properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    pub code: DiagnosticCode,
    pub detail: String,
}

impl Diagnostic {
    pub fn entity(entity: &str, code: DiagnosticCode, detail: impl Into<String>) -> Self {
        Self {
            entity: entity.to_string(),
            property: None,
            code,
            detail: detail.into(),
        }
    }

    pub fn property(entity: &str, property: &str, code: DiagnosticCode, detail: impl Into<String>) -> Self {
        Self {
            entity: entity.to_string(),
            property: Some(property.to_string()),
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property {
            Some(property) => write!(f, "{}.{}: [{}] {}", self.entity, property, self.code, self.detail),
            None => write!(f, "{}: [{}] {}", self.entity, self.code, self.detail),
        }
    }
}

/// Per-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub entities: usize,
    pub properties: usize,
    pub write_operations: usize,
    pub to_one_accessors: usize,
    pub to_many_accessors: usize,
    pub diagnostics: usize,
}

impl SynthesisReport {
    pub fn summary(&self) -> String {
        format!(
            "{} entities, {} properties, {} write operations, {} to-one and {} to-many accessors, {} diagnostics",
            self.entities,
            self.properties,
            self.write_operations,
            self.to_one_accessors,
            self.to_many_accessors,
            self.diagnostics
        )
    }
}
