//! Integration tests for the sqlsynth-sqlite crate.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use rusqlite::Connection;
use sqlsynth_core::{
    CustomStorage, CustomTypeConfig, DateStorage, EntityKind, GeneratorConfig, PropertyType, UuidStorage,
};
use sqlsynth_sqlite::{CatalogError, FieldValue, Record, Replay, load_schema, load_schema_from_path};
use sqlsynth_synth::{DiagnosticCode, SynthesisOutput, VerbatimNamer, synthesize};
use url::Url;
use uuid::Uuid;

const SAMPLE_SQL: &str = "
CREATE TABLE sample (
    id INTEGER PRIMARY KEY,
    ratio REAL,
    label TEXT,
    payload BLOB,
    enabled BOOLEAN,
    created DATETIME,
    price DECIMAL,
    homepage_url TEXT,
    token_uuid TEXT,
    amount MONEY
);";

const PETS_SQL: &str = "
CREATE TABLE person (person_id INTEGER PRIMARY KEY, firstname TEXT, lastname TEXT NOT NULL);
CREATE TABLE pet (
    id INTEGER PRIMARY KEY,
    owner_id INTEGER REFERENCES person(person_id) ON DELETE CASCADE,
    name TEXT NOT NULL
);
CREATE VIEW named_pets AS SELECT pet.name AS name, person.lastname AS owner FROM pet JOIN person ON pet.owner_id = person.person_id;
CREATE INDEX pet_owner ON pet(owner_id);
PRAGMA user_version = 3;
";

fn open(sql: &str) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(sql).unwrap();
    conn
}

fn money_config() -> GeneratorConfig {
    let mut config = GeneratorConfig::default();
    config.custom_types.insert(
        "MONEY".to_string(),
        CustomTypeConfig {
            name: "Money".to_string(),
            storage: Some(CustomStorage::Integer),
        },
    );
    config
}

fn synthesize_for(conn: &Connection, config: &GeneratorConfig) -> SynthesisOutput {
    let schema = load_schema(conn).unwrap();
    synthesize(&schema, config, &VerbatimNamer).unwrap()
}

fn record(fields: &[(&str, FieldValue)]) -> Record {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

fn sample_record(created: f64) -> Record {
    record(&[
        ("id", FieldValue::Integer(7)),
        ("ratio", FieldValue::Double(2.5)),
        ("label", text("hello")),
        ("payload", FieldValue::Bytes(vec![0, 1, 254, 255])),
        ("enabled", FieldValue::Bool(true)),
        ("created", FieldValue::Date(created)),
        ("price", FieldValue::Decimal("12.5".to_string())),
        ("homepage_url", FieldValue::Url(Url::parse("https://example.com/a?b=c").unwrap())),
        ("token_uuid", FieldValue::Uuid(Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef))),
        (
            "amount",
            FieldValue::Custom("Money".to_string(), Box::new(FieldValue::Integer(250))),
        ),
    ])
}

// =========================================================================
// Catalog to schema
// =========================================================================

#[test]
fn test_schema_from_catalog() {
    let conn = open(PETS_SQL);
    let schema = load_schema(&conn).unwrap();

    assert_eq!(schema.user_version, 3);
    assert!(schema.version > 0);
    assert_eq!(schema.entity_names(), vec!["person", "pet", "named_pets"]);

    let pet = schema.table("pet").unwrap();
    assert_eq!(pet.foreign_keys.len(), 1);
    assert_eq!(pet.foreign_keys[0].destination_table, "person");
    assert_eq!(pet.foreign_keys[0].destination_column.as_deref(), Some("person_id"));
    assert_eq!(schema.indices_of("pet")[0].name, "pet_owner");

    let view = schema.view("named_pets").unwrap();
    let columns: Vec<&str> = view.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["name", "owner"]);
}

#[test]
fn test_schema_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pets.db");
    Connection::open(&path).unwrap().execute_batch(PETS_SQL).unwrap();

    let schema = load_schema_from_path(&path).unwrap();
    assert_eq!(schema.tables.len(), 2);
    assert_eq!(schema.views.len(), 1);
}

#[test]
fn test_missing_file_is_a_database_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_schema_from_path(dir.path().join("absent.db")).unwrap_err();
    assert!(matches!(err, CatalogError::DatabaseError(_)));
}

#[test]
fn test_person_model_from_catalog() {
    let conn = open(PETS_SQL);
    let output = synthesize_for(&conn, &GeneratorConfig::default());

    let person = output.bundle("person").unwrap();
    let resolved = person.dynamic_lookup.resolve(&["lastname", "person_id"]);
    assert_eq!(
        resolved.pairs(),
        vec![("person_id", 1), ("firstname", -1), ("lastname", 0)]
    );

    let view = output.bundle("named_pets").unwrap();
    assert_eq!(view.entity.kind, EntityKind::View);
    assert!(view.insert.is_none() && view.update.is_none() && view.delete.is_none());

    let pet = output.bundle("pet").unwrap();
    assert_eq!(pet.to_one[0].name, "owner");
    assert_eq!(person.to_many[0].name, "pet");
}

// =========================================================================
// Round trips
// =========================================================================

#[test]
fn test_round_trip_every_property_type() {
    let conn = open(SAMPLE_SQL);
    let config = money_config();
    let output = synthesize_for(&conn, &config);

    let entity = &output.bundle("sample").unwrap().entity;
    assert_eq!(entity.property("amount").unwrap().property_type, PropertyType::Custom("Money".into()));
    assert_eq!(entity.property("token_uuid").unwrap().property_type, PropertyType::Uuid);

    let replay = Replay::new(&conn, &output);
    let written = sample_record(1_700_000_000.25);
    assert_eq!(replay.insert("sample", &written).unwrap(), 1);

    let rows = replay.select_all("sample").unwrap();
    assert_eq!(rows, vec![written]);
}

#[test]
fn test_round_trip_nulls() {
    let conn = open(SAMPLE_SQL);
    let output = synthesize_for(&conn, &money_config());
    let replay = Replay::new(&conn, &output);

    replay.insert("sample", &record(&[("id", FieldValue::Integer(1))])).unwrap();
    let rows = replay.select_all("sample").unwrap();
    assert_eq!(rows.len(), 1);
    for (name, value) in &rows[0] {
        if name == "id" {
            assert_eq!(*value, FieldValue::Integer(1));
        } else {
            assert!(value.is_null(), "{name} read {value:?}");
        }
    }
}

#[test]
fn test_round_trip_text_dates_and_blob_uuids() {
    let conn = open(SAMPLE_SQL);
    let config = GeneratorConfig {
        date_storage: DateStorage::FormattedText,
        uuid_storage: UuidStorage::Blob,
        ..money_config()
    };
    let output = synthesize_for(&conn, &config);
    let replay = Replay::new(&conn, &output);

    // 2024-01-02 03:04:05 UTC
    let written = sample_record(1_704_164_645.0);
    replay.insert("sample", &written).unwrap();

    let stored: (String, Vec<u8>) = conn
        .query_row("SELECT created, token_uuid FROM sample", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(stored.0, "2024-01-02 03:04:05");
    assert_eq!(stored.1.len(), 16);

    assert_eq!(replay.select_all("sample").unwrap(), vec![written]);
}

#[test]
fn test_epoch_date_reads_engine_default_timestamp() {
    let conn = open("CREATE TABLE ev (id INTEGER PRIMARY KEY, created DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP)");
    conn.execute_batch(
        "INSERT INTO ev (id, created) VALUES (1, '2001-02-03 04:05:06');
         INSERT INTO ev (id) VALUES (2);",
    )
    .unwrap();
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let extract = &output.bundle("ev").unwrap().extract;
    assert!(extract.iter().find(|e| e.property == "created").unwrap().fallible);

    let replay = Replay::new(&conn, &output);
    let rows = replay.select_all("ev").unwrap();
    assert_eq!(rows[0]["created"], FieldValue::Date(981_173_106.0));

    let engine_seconds: i64 = conn
        .query_row("SELECT CAST(strftime('%s', created) AS INTEGER) FROM ev WHERE id = 2", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(rows[1]["created"], FieldValue::Date(engine_seconds as f64));
}

#[test]
fn test_decimal_under_numeric_affinity_is_reported() {
    let conn = open("CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount DECIMAL, memo TEXT)");
    let output = synthesize_for(&conn, &GeneratorConfig::default());

    let codes: Vec<(Option<&str>, DiagnosticCode)> = output
        .diagnostics
        .iter()
        .map(|d| (d.property.as_deref(), d.code))
        .collect();
    assert_eq!(codes, vec![(Some("amount"), DiagnosticCode::DecimalPrecisionLoss)]);

    // The stored value is a real, so digits past double precision are gone.
    let replay = Replay::new(&conn, &output);
    let wide = FieldValue::Decimal("12345678901234567890.12".to_string());
    replay
        .insert("ledger", &record(&[("id", FieldValue::Integer(1)), ("amount", wide.clone())]))
        .unwrap();
    let rows = replay.select_all("ledger").unwrap();
    assert!(matches!(rows[0]["amount"], FieldValue::Decimal(_)));
    assert_ne!(rows[0]["amount"], wide);
}

#[test]
fn test_value_mismatch_is_rejected() {
    let conn = open(SAMPLE_SQL);
    let output = synthesize_for(&conn, &money_config());
    let replay = Replay::new(&conn, &output);

    let err = replay
        .insert("sample", &record(&[("ratio", text("2.5"))]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::ValueMismatch { ref property, .. } if property == "ratio"));
}

// =========================================================================
// Writes
// =========================================================================

#[test]
fn test_insert_update_delete() {
    let conn = open(PETS_SQL);
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let replay = Replay::new(&conn, &output);

    replay
        .insert("person", &record(&[("firstname", text("Ada")), ("lastname", text("Byron"))]))
        .unwrap();
    let mut ada = replay.select_all("person").unwrap().remove(0);
    assert_eq!(ada["person_id"], FieldValue::Integer(1));

    ada.insert("lastname".to_string(), text("Lovelace"));
    assert_eq!(replay.update("person", &ada).unwrap(), 1);
    assert_eq!(replay.select_all("person").unwrap(), vec![ada.clone()]);

    assert_eq!(replay.delete("person", &ada).unwrap(), 1);
    assert!(replay.select_all("person").unwrap().is_empty());
}

#[test]
fn test_insert_returning() {
    let conn = open(PETS_SQL);
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let replay = Replay::new(&conn, &output);

    let stored = replay
        .insert_returning("person", &record(&[("lastname", text("Hopper"))]))
        .unwrap()
        .unwrap();
    assert_eq!(stored["person_id"], FieldValue::Integer(1));
    assert_eq!(stored["firstname"], FieldValue::Null);
    assert_eq!(stored["lastname"], text("Hopper"));

    let err = replay
        .insert_then_select("person", &record(&[("lastname", text("Hopper"))]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::OperationUnavailable { .. }));
}

#[test]
fn test_insert_then_select_fallback() {
    let conn = open(PETS_SQL);
    let config = GeneratorConfig {
        insert_returning_fallback: true,
        ..GeneratorConfig::default()
    };
    let output = synthesize_for(&conn, &config);
    let replay = Replay::new(&conn, &output);

    replay.insert("person", &record(&[("lastname", text("First"))])).unwrap();
    let stored = replay
        .insert_then_select("person", &record(&[("lastname", text("Second"))]))
        .unwrap()
        .unwrap();
    assert_eq!(stored["person_id"], FieldValue::Integer(2));
    assert_eq!(stored["lastname"], text("Second"));
}

#[test]
fn test_compound_key_without_rowid() {
    let conn = open(
        "CREATE TABLE membership (
             team TEXT, member INTEGER, role TEXT,
             PRIMARY KEY (team, member)
         ) WITHOUT ROWID;",
    );
    let config = GeneratorConfig {
        insert_returning_fallback: true,
        ..GeneratorConfig::default()
    };
    let output = synthesize_for(&conn, &config);
    assert_eq!(output.diagnostics[0].code, DiagnosticCode::ReturningFallbackUnavailable);

    let replay = Replay::new(&conn, &output);
    let mut row = record(&[
        ("team", text("core")),
        ("member", FieldValue::Integer(4)),
        ("role", text("reviewer")),
    ]);
    replay.insert("membership", &row).unwrap();

    row.insert("role".to_string(), text("maintainer"));
    assert_eq!(replay.update("membership", &row).unwrap(), 1);
    assert_eq!(replay.select_all("membership").unwrap(), vec![row.clone()]);

    // key parts are not nullable
    let err = replay
        .delete("membership", &record(&[("team", text("core"))]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::ValueMismatch { ref property, .. } if property == "member"));
    assert_eq!(replay.delete("membership", &row).unwrap(), 1);
}

#[test]
fn test_read_only_run_has_no_writes() {
    let conn = open(PETS_SQL);
    let config = GeneratorConfig {
        read_only: true,
        ..GeneratorConfig::default()
    };
    let output = synthesize_for(&conn, &config);
    let replay = Replay::new(&conn, &output);

    let err = replay
        .insert("person", &record(&[("lastname", text("x"))]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::OperationUnavailable { ref operation, .. } if operation == "insert"));
}

// =========================================================================
// Reads
// =========================================================================

fn seeded_pets() -> Connection {
    let conn = open(PETS_SQL);
    conn.execute_batch(
        "INSERT INTO person VALUES (1, 'Ada', 'Lovelace');
         INSERT INTO person VALUES (2, NULL, 'Hopper');
         INSERT INTO pet VALUES (10, 1, 'Rex');
         INSERT INTO pet VALUES (11, 1, 'Tom');
         INSERT INTO pet VALUES (12, NULL, 'Stray');",
    )
    .unwrap();
    conn
}

#[test]
fn test_dynamic_select_resolves_by_name() {
    let conn = seeded_pets();
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let replay = Replay::new(&conn, &output);

    let rows = replay
        .select_with("person", "SELECT lastname, person_id FROM person ORDER BY person_id")
        .unwrap();
    assert_eq!(rows[0]["person_id"], FieldValue::Integer(1));
    assert_eq!(rows[0]["lastname"], text("Lovelace"));
    // absent nullable column
    assert_eq!(rows[0]["firstname"], FieldValue::Null);
}

#[test]
fn test_absent_and_null_not_null_columns_fall_back() {
    let conn = seeded_pets();
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let replay = Replay::new(&conn, &output);

    let rows = replay.select_with("person", "SELECT person_id FROM person").unwrap();
    assert_eq!(rows[0]["lastname"], text(""));

    let rows = replay
        .select_with("person", "SELECT person_id, NULL AS lastname FROM person")
        .unwrap();
    assert_eq!(rows[0]["lastname"], text(""));
}

#[test]
fn test_unconvertible_value_falls_back() {
    let conn = open("CREATE TABLE token (id INTEGER PRIMARY KEY, ref_uuid TEXT NOT NULL, home_url TEXT)");
    conn.execute_batch("INSERT INTO token VALUES (1, 'garbage', 'not a url')").unwrap();
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let replay = Replay::new(&conn, &output);

    let rows = replay.select_all("token").unwrap();
    assert_eq!(rows[0]["ref_uuid"], FieldValue::Uuid(Uuid::nil()));
    assert_eq!(rows[0]["home_url"], FieldValue::Null);
}

#[test]
fn test_find_follows_foreign_key() {
    let conn = seeded_pets();
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let replay = Replay::new(&conn, &output);

    let pets = replay.select_all("pet").unwrap();
    let owner = replay.find("pet", "owner", &pets[0]).unwrap().unwrap();
    assert_eq!(owner["lastname"], text("Lovelace"));

    // a null foreign key matches nothing
    let stray = pets.iter().find(|p| p["name"] == text("Stray")).unwrap();
    assert_eq!(replay.find("pet", "owner", stray).unwrap(), None);
}

#[test]
fn test_fetch_lists_referencing_rows() {
    let conn = seeded_pets();
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let replay = Replay::new(&conn, &output);

    let ada = record(&[("person_id", FieldValue::Integer(1))]);
    let names: Vec<FieldValue> = replay
        .fetch("person", "pet", &ada, Some("\"name\" DESC"), None)
        .unwrap()
        .into_iter()
        .map(|mut pet| pet.remove("name").unwrap())
        .collect();
    assert_eq!(names, vec![text("Tom"), text("Rex")]);

    let limited = replay.fetch("person", "pet", &ada, None, Some("1")).unwrap();
    assert_eq!(limited.len(), 1);

    let hopper = record(&[("person_id", FieldValue::Integer(2))]);
    assert!(replay.fetch("person", "pet", &hopper, None, None).unwrap().is_empty());
}

#[test]
fn test_unknown_entity_and_accessor() {
    let conn = seeded_pets();
    let output = synthesize_for(&conn, &GeneratorConfig::default());
    let replay = Replay::new(&conn, &output);

    assert!(matches!(replay.select_all("nobody"), Err(CatalogError::Synthesis(_))));
    assert!(matches!(
        replay.find("pet", "vet", &BTreeMap::new()),
        Err(CatalogError::OperationUnavailable { .. })
    ));
}
