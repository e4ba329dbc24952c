use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SCHEMA_SQL: &str = "
CREATE TABLE person (person_id INTEGER PRIMARY KEY, firstname TEXT, lastname TEXT NOT NULL);
CREATE TABLE pet (
    id INTEGER PRIMARY KEY,
    owner_id INTEGER REFERENCES person(person_id),
    name TEXT NOT NULL DEFAULT 'unnamed'
);
CREATE TABLE flags (id INTEGER PRIMARY KEY, b BOOLEAN NOT NULL DEFAULT 'maybe');
";

fn sqlsynth(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sqlsynth"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run sqlsynth")
}

fn write_sql(dir: &Path) -> PathBuf {
    let path = dir.join("schema.sql");
    fs::write(&path, SCHEMA_SQL).expect("failed to write schema script");
    path
}

fn write_db(dir: &Path) -> PathBuf {
    let path = dir.join("schema.db");
    rusqlite::Connection::open(&path)
        .and_then(|conn| conn.execute_batch(SCHEMA_SQL))
        .expect("failed to create database");
    path
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[test]
fn generate_from_sql_writes_json_bundles() {
    let dir = tempfile::tempdir().unwrap();
    let sql = write_sql(dir.path());
    let out = dir.path().join("nested").join("bundles.json");

    let output = sqlsynth(&[
        "generate",
        "--sql",
        sql.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let bundles = json["bundles"].as_array().unwrap();
    let names: Vec<&str> = bundles
        .iter()
        .map(|b| b["entity"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["person", "pet", "flags"]);
    assert_eq!(bundles[1]["to_one"][0]["name"], "owner");
    assert_eq!(json["diagnostics"][0]["code"], "unsupported_default");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[unsupported_default]"), "stderr: {stderr}");
}

#[test]
fn generate_from_db_prints_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let db = write_db(dir.path());

    let output = sqlsynth(&["generate", "--db", db.to_str().unwrap(), "--format", "yaml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bundles:"), "stdout: {stdout}");
    assert!(stdout.contains("INSERT INTO"), "stdout: {stdout}");
}

#[test]
fn generate_honors_config() {
    let dir = tempfile::tempdir().unwrap();
    let sql = write_sql(dir.path());
    let config = dir.path().join("config.yaml");
    fs::write(&config, "read_only: true\nexclude_tables: [flags]\n").unwrap();

    let output = sqlsynth(&[
        "generate",
        "--sql",
        sql.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let bundles = json["bundles"].as_array().unwrap();
    assert_eq!(bundles.len(), 2);
    assert!(bundles.iter().all(|b| b["insert"].is_null()));
}

#[test]
fn generate_strict_defaults_fails() {
    let dir = tempfile::tempdir().unwrap();
    let sql = write_sql(dir.path());
    let config = dir.path().join("strict.yaml");
    fs::write(&config, "strict_defaults: true\n").unwrap();

    let output = sqlsynth(&[
        "generate",
        "--sql",
        sql.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn generate_requires_one_source() {
    assert!(!sqlsynth(&["generate"]).status.success());

    let dir = tempfile::tempdir().unwrap();
    let sql = write_sql(dir.path());
    let db = write_db(dir.path());
    let output = sqlsynth(&[
        "generate",
        "--sql",
        sql.to_str().unwrap(),
        "--db",
        db.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
}

#[test]
fn generate_missing_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.db");
    let output = sqlsynth(&["generate", "--db", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

#[test]
fn inspect_prints_schema_model() {
    let dir = tempfile::tempdir().unwrap();
    let sql = write_sql(dir.path());

    let output = sqlsynth(&["inspect", "--sql", sql.to_str().unwrap()]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tables"][0]["name"], "person");
    assert_eq!(json["tables"][1]["foreign_keys"][0]["destination_table"], "person");
}

// ---------------------------------------------------------------------------
// lookup
// ---------------------------------------------------------------------------

#[test]
fn lookup_resolves_statement_columns() {
    let dir = tempfile::tempdir().unwrap();
    let db = write_db(dir.path());

    let output = sqlsynth(&[
        "lookup",
        "--db",
        db.to_str().unwrap(),
        "--entity",
        "person",
        "--query",
        "SELECT lastname, person_id FROM person",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "person_id\t1\nfirstname\t-1\nlastname\t0\n"
    );
}

#[test]
fn lookup_unknown_entity_fails() {
    let dir = tempfile::tempdir().unwrap();
    let sql = write_sql(dir.path());

    let output = sqlsynth(&[
        "lookup",
        "--sql",
        sql.to_str().unwrap(),
        "--entity",
        "nobody",
        "--query",
        "SELECT 1",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown entity 'nobody'"));
}
