//! Declared column type to target property type.

use sqlsynth_core::{
    BlobRepresentation, Column, ColumnType, GeneratorConfig, PropertyType, TypeAffinity,
};

/// Resolves the target type of a column.
///
/// A configured custom type wins over everything else. Dedicated column
/// types map to their natural target; custom declarations fall back to
/// their affinity; a column without a declared type is a string. Text and
/// blob columns are promoted to UUID or URL by name suffix.
///
/// # Examples
///
/// ```
/// use sqlsynth_core::{Column, ColumnType, GeneratorConfig, PropertyType};
/// use sqlsynth_synth::resolve_property_type;
///
/// let config = GeneratorConfig::default();
/// let column = Column::new(0, "id", Some(ColumnType::parse("BIGINT")));
/// assert_eq!(resolve_property_type(&column, &config), PropertyType::Integer);
///
/// let column = Column::new(1, "homepage_url", Some(ColumnType::Text));
/// assert_eq!(resolve_property_type(&column, &config), PropertyType::Url);
/// ```
pub fn resolve_property_type(column: &Column, config: &GeneratorConfig) -> PropertyType {
    let Some(column_type) = &column.column_type else {
        return PropertyType::String;
    };

    if let Some(custom) = config.custom_type(&column_type.to_string()) {
        return PropertyType::Custom(custom.name.clone());
    }

    match column_type {
        ColumnType::Integer => PropertyType::Integer,
        ColumnType::Real => PropertyType::Double,
        ColumnType::Text | ColumnType::Varchar(_) | ColumnType::Any => text_like(&column.name, config),
        ColumnType::Blob => blob_like(&column.name, config),
        ColumnType::Boolean => PropertyType::Bool,
        ColumnType::Date | ColumnType::Datetime | ColumnType::Timestamp => PropertyType::Date,
        ColumnType::Decimal => PropertyType::Decimal,
        ColumnType::Custom(_) => match column_type.affinity() {
            TypeAffinity::Integer => PropertyType::Integer,
            TypeAffinity::Text => text_like(&column.name, config),
            TypeAffinity::Blob => blob_like(&column.name, config),
            TypeAffinity::Real | TypeAffinity::Numeric => PropertyType::Double,
        },
    }
}

fn text_like(column: &str, config: &GeneratorConfig) -> PropertyType {
    if GeneratorConfig::has_suffix(column, &config.uuid_column_suffixes) {
        PropertyType::Uuid
    } else if GeneratorConfig::has_suffix(column, &config.url_column_suffixes) {
        PropertyType::Url
    } else {
        PropertyType::String
    }
}

fn blob_like(column: &str, config: &GeneratorConfig) -> PropertyType {
    if GeneratorConfig::has_suffix(column, &config.uuid_column_suffixes) {
        return PropertyType::Uuid;
    }
    match config.blob_representation {
        BlobRepresentation::ByteArray => PropertyType::ByteArray,
        BlobRepresentation::BinaryData => PropertyType::BinaryData,
    }
}

#[cfg(test)]
mod tests {
    use sqlsynth_core::CustomTypeConfig;

    use super::*;

    fn resolve(name: &str, declared: Option<&str>) -> PropertyType {
        resolve_with(name, declared, &GeneratorConfig::default())
    }

    fn resolve_with(name: &str, declared: Option<&str>, config: &GeneratorConfig) -> PropertyType {
        let column = Column::new(0, name, ColumnType::parse_declared(declared));
        resolve_property_type(&column, config)
    }

    #[test]
    fn test_dedicated_types() {
        assert_eq!(resolve("a", Some("INTEGER")), PropertyType::Integer);
        assert_eq!(resolve("a", Some("double")), PropertyType::Double);
        assert_eq!(resolve("a", Some("TEXT")), PropertyType::String);
        assert_eq!(resolve("a", Some("VARCHAR(40)")), PropertyType::String);
        assert_eq!(resolve("a", Some("ANY")), PropertyType::String);
        assert_eq!(resolve("a", Some("BLOB")), PropertyType::ByteArray);
        assert_eq!(resolve("a", Some("BOOL")), PropertyType::Bool);
        assert_eq!(resolve("a", Some("DATETIME")), PropertyType::Date);
        assert_eq!(resolve("a", Some("TIMESTAMP")), PropertyType::Date);
        assert_eq!(resolve("a", Some("DECIMAL(10,2)")), PropertyType::Decimal);
    }

    #[test]
    fn test_custom_falls_back_to_affinity() {
        assert_eq!(resolve("a", Some("BIGINT")), PropertyType::Integer);
        assert_eq!(resolve("a", Some("CLOB")), PropertyType::String);
        assert_eq!(resolve("a", Some("NVARCHAR(12)")), PropertyType::String);
        assert_eq!(resolve("a", Some("FLOAT")), PropertyType::Double);
        assert_eq!(resolve("a", Some("NUMERIC")), PropertyType::Double);
    }

    #[test]
    fn test_missing_declaration_is_string() {
        assert_eq!(resolve("a", None), PropertyType::String);
        assert_eq!(resolve("a", Some("  ")), PropertyType::String);
    }

    #[test]
    fn test_suffix_promotion() {
        assert_eq!(resolve("avatar_url", Some("TEXT")), PropertyType::Url);
        assert_eq!(resolve("session_uuid", Some("TEXT")), PropertyType::Uuid);
        assert_eq!(resolve("session_uuid", Some("BLOB")), PropertyType::Uuid);
        assert_eq!(resolve("avatar_url", Some("BLOB")), PropertyType::ByteArray);
        assert_eq!(resolve("avatar_url", Some("INTEGER")), PropertyType::Integer);
    }

    #[test]
    fn test_binary_data_representation() {
        let config = GeneratorConfig {
            blob_representation: BlobRepresentation::BinaryData,
            ..GeneratorConfig::default()
        };
        assert_eq!(resolve_with("payload", Some("BLOB"), &config), PropertyType::BinaryData);
    }

    #[test]
    fn test_configured_custom_type_wins() {
        let mut config = GeneratorConfig::default();
        config.custom_types.insert(
            "MONEY".to_string(),
            CustomTypeConfig {
                name: "Money".to_string(),
                storage: None,
            },
        );
        assert_eq!(
            resolve_with("price", Some("money"), &config),
            PropertyType::Custom("Money".to_string())
        );
    }
}
