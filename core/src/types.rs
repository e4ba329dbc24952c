//! Schema model built from the SQLite catalog.
//!
//! These types mirror what the catalog reports and nothing more: typing
//! decisions for generated code live in the entity model
//! ([`Entity`](crate::Entity)). A [`Schema`] is built once per generation
//! run and never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column_type::{ColumnType, TypeAffinity};
use crate::default_value::DefaultValue;

/// Complete catalog snapshot of one database.
///
/// # Examples
///
/// ```
/// use sqlsynth_core::{Column, ColumnType, Schema, Table};
///
/// let mut schema = Schema::default();
/// schema.tables.push(Table::new(
///     "person",
///     "CREATE TABLE person (person_id INTEGER PRIMARY KEY)",
///     vec![Column::new(0, "person_id", Some(ColumnType::Integer)).primary_key(1)],
/// ));
///
/// assert!(schema.table("PERSON").is_some());
/// assert_eq!(schema.entity_names(), vec!["person"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Engine-maintained change counter (`PRAGMA schema_version`).
    pub version: i64,
    /// Client-settable version (`PRAGMA user_version`).
    pub user_version: i64,
    /// Tables in catalog order.
    pub tables: Vec<Table>,
    /// Views in catalog order.
    pub views: Vec<View>,
    /// Indices keyed by the table they belong to.
    pub indices: BTreeMap<String, Vec<Index>>,
    /// Triggers keyed by the table they belong to.
    pub triggers: BTreeMap<String, Vec<Trigger>>,
}

impl Schema {
    /// Finds a table by name. SQLite identifiers are case-insensitive.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Finds a view by name, case-insensitively.
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }

    /// Names of all tables followed by all views, in catalog order.
    pub fn entity_names(&self) -> Vec<&str> {
        self.tables
            .iter()
            .map(|t| t.name.as_str())
            .chain(self.views.iter().map(|v| v.name.as_str()))
            .collect()
    }

    /// Indices of a table (empty when it has none).
    pub fn indices_of(&self, table: &str) -> &[Index] {
        self.indices.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Triggers of a table (empty when it has none).
    pub fn triggers_of(&self, table: &str) -> &[Trigger] {
        self.triggers.get(table).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A table and its columns and foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Catalog object name.
    pub name: String,
    /// Name as declared in the schema (`tbl_name` in the catalog).
    pub external_name: String,
    /// The `CREATE TABLE` statement.
    pub creation_sql: String,
    /// Columns in ordinal order.
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: &str, creation_sql: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.to_string(),
            external_name: name.to_string(),
            creation_sql: creation_sql.to_string(),
            columns,
            foreign_keys: Vec::new(),
        }
    }

    /// Adds a foreign key.
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Primary-key columns ordered by their position in the key.
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        let mut key: Vec<&Column> = self.columns.iter().filter(|c| c.is_primary_key()).collect();
        key.sort_by_key(|c| c.primary_key_position);
        key
    }

    /// Whether the table was declared `WITHOUT ROWID`.
    pub fn is_without_rowid(&self) -> bool {
        let upper = strip_comments(&self.creation_sql).to_ascii_uppercase();
        let tail = upper.trim_end().trim_end_matches(';').trim_end();
        tail.rsplit(')')
            .next()
            .is_some_and(|options| {
                options
                    .split(',')
                    .any(|option| option.split_whitespace().collect::<Vec<_>>() == ["WITHOUT", "ROWID"])
            })
    }
}

/// A view. Views carry no foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub external_name: String,
    /// The `CREATE VIEW` statement.
    pub creation_sql: String,
    pub columns: Vec<Column>,
}

impl View {
    pub fn new(name: &str, creation_sql: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.to_string(),
            external_name: name.to_string(),
            creation_sql: creation_sql.to_string(),
            columns,
        }
    }
}

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Catalog ordinal (`cid`).
    pub id: i64,
    pub name: String,
    /// Parsed declaration; `None` when the column declares no type.
    pub column_type: Option<ColumnType>,
    pub is_not_null: bool,
    /// Literal default; `None` when there is no default or it is not a literal.
    pub default_value: Option<DefaultValue>,
    /// Raw SQL text of the `DEFAULT` clause.
    pub default_sql: Option<String>,
    /// 1-based position inside the primary key, if part of it.
    pub primary_key_position: Option<u32>,
}

impl Column {
    pub fn new(id: i64, name: &str, column_type: Option<ColumnType>) -> Self {
        Self {
            id,
            name: name.to_string(),
            column_type,
            is_not_null: false,
            default_value: None,
            default_sql: None,
            primary_key_position: None,
        }
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.is_not_null = true;
        self
    }

    /// Sets the default from its SQL text, parsing the literal if possible.
    pub fn with_default_sql(mut self, sql: &str) -> Self {
        self.default_value = DefaultValue::parse(sql);
        self.default_sql = Some(sql.to_string());
        self
    }

    /// Marks the column as part of the primary key at `position` (1-based).
    pub fn primary_key(mut self, position: u32) -> Self {
        self.primary_key_position = Some(position);
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key_position.is_some()
    }

    pub fn affinity(&self) -> TypeAffinity {
        TypeAffinity::of_declaration(self.column_type.as_ref())
    }
}

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl ForeignKeyAction {
    /// Parses the action text reported by `PRAGMA foreign_key_list`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" | "" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            "CASCADE" => Some(Self::Cascade),
            _ => None,
        }
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAction => write!(f, "NO ACTION"),
            Self::Restrict => write!(f, "RESTRICT"),
            Self::SetNull => write!(f, "SET NULL"),
            Self::SetDefault => write!(f, "SET DEFAULT"),
            Self::Cascade => write!(f, "CASCADE"),
        }
    }
}

/// `MATCH` clause of a foreign key. SQLite parses but does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    None,
    Simple,
    Partial,
    Full,
}

impl MatchMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NONE" | "" => Some(Self::None),
            "SIMPLE" => Some(Self::Simple),
            "PARTIAL" => Some(Self::Partial),
            "FULL" => Some(Self::Full),
            _ => None,
        }
    }
}

/// One row of `PRAGMA foreign_key_list`.
///
/// Compound keys are reported as several rows sharing an `id`, ordered by
/// `seq`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub id: i64,
    pub seq: i64,
    pub source_column: String,
    pub destination_table: String,
    /// `None` when the constraint references the destination's primary key
    /// implicitly (`REFERENCES parent` without a column list).
    pub destination_column: Option<String>,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
    pub match_mode: MatchMode,
}

impl ForeignKey {
    /// Creates a single-column foreign key with default actions.
    pub fn new(source_column: &str, destination_table: &str, destination_column: Option<&str>) -> Self {
        Self {
            id: 0,
            seq: 0,
            source_column: source_column.to_string(),
            destination_table: destination_table.to_string(),
            destination_column: destination_column.map(String::from),
            on_update: ForeignKeyAction::NoAction,
            on_delete: ForeignKeyAction::NoAction,
            match_mode: MatchMode::None,
        }
    }
}

/// An index definition. Automatic indices have no SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub table_name: String,
    pub creation_sql: Option<String>,
}

/// A trigger definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,
    pub table_name: String,
    pub creation_sql: String,
}

/// Copies `sql` without its `--` and `/* */` comments. Quoted text and
/// bracketed identifiers are kept as written.
fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut closing: Option<char> = None;
    while let Some(c) = chars.next() {
        if let Some(close) = closing {
            out.push(c);
            if c == close {
                closing = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                closing = Some(c);
                out.push(c);
            }
            '[' => {
                closing = Some(']');
                out.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                if chars.by_ref().any(|next| next == '\n') {
                    out.push('\n');
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}
