//! Reference interpreter for synthesized bundles.
//!
//! [`Replay`] executes the statements, bind chains and extract expressions
//! of a [`SynthesisOutput`] against a live connection, the way generated
//! code would. Scoped binds hold their encoded buffer on the stack of a
//! recursive call and only release it once the nested body, terminal
//! included, has returned.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Row, Statement};
use sqlsynth_core::{CustomStorage, Literal};
use sqlsynth_synth::{
    BindBlock, BindOp, BindTail, Binder, DynamicIndexLookup, EntityBundle, ExtractExpr, INDEX_UNMATCHED,
    ReadDecision, Reader, SynthError, SynthesisOutput, Terminal, parse_date, parse_decimal,
    parse_engine_date,
};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::{CatalogError, Result};

/// A property value as generated code would hold it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    /// Seconds since the Unix epoch.
    Date(f64),
    Url(Url),
    Uuid(Uuid),
    /// Canonical decimal text.
    Decimal(String),
    /// Custom type name and its stored representation.
    Custom(String, Box<FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One record, keyed by property name.
pub type Record = BTreeMap<String, FieldValue>;

/// Runs synthesized operations on a connection.
pub struct Replay<'a> {
    conn: &'a Connection,
    output: &'a SynthesisOutput,
}

impl<'a> Replay<'a> {
    pub fn new(conn: &'a Connection, output: &'a SynthesisOutput) -> Self {
        Self { conn, output }
    }

    fn bundle(&self, entity: &str) -> Result<&'a EntityBundle> {
        self.output
            .bundle(entity)
            .ok_or_else(|| CatalogError::Synthesis(SynthError::UnknownEntity(entity.to_string())))
    }

    /// Inserts `record`, returning the number of changed rows.
    pub fn insert(&self, entity: &str, record: &Record) -> Result<usize> {
        let bundle = self.bundle(entity)?;
        let operation = bundle
            .insert
            .as_ref()
            .ok_or_else(|| unavailable(entity, "insert"))?;
        self.execute(entity, &operation.sql, &operation.bind, record)
    }

    /// Inserts `record` with `INSERT ... RETURNING` and reads the stored row.
    pub fn insert_returning(&self, entity: &str, record: &Record) -> Result<Option<Record>> {
        let bundle = self.bundle(entity)?;
        let operation = bundle
            .insert_returning
            .as_ref()
            .ok_or_else(|| unavailable(entity, "insert_returning"))?;
        let rows = self.read(entity, &operation.sql, &operation.bind, record, &bundle.extract, None)?;
        Ok(rows.into_iter().next())
    }

    /// Inserts `record`, then reads it back through the rowid select.
    pub fn insert_then_select(&self, entity: &str, record: &Record) -> Result<Option<Record>> {
        let bundle = self.bundle(entity)?;
        let select = bundle
            .insert_returning
            .as_ref()
            .and_then(|operation| operation.fallback_select.as_deref())
            .ok_or_else(|| unavailable(entity, "insert_then_select"))?;
        self.insert(entity, record)?;
        let rows = self.read(entity, select, &unbound(), &Record::new(), &bundle.extract, None)?;
        Ok(rows.into_iter().next())
    }

    /// Updates the row with `record`'s key.
    pub fn update(&self, entity: &str, record: &Record) -> Result<usize> {
        let bundle = self.bundle(entity)?;
        let operation = bundle
            .update
            .as_ref()
            .ok_or_else(|| unavailable(entity, "update"))?;
        self.execute(entity, &operation.sql, &operation.bind, record)
    }

    /// Deletes the row with `record`'s key.
    pub fn delete(&self, entity: &str, record: &Record) -> Result<usize> {
        let bundle = self.bundle(entity)?;
        let operation = bundle
            .delete
            .as_ref()
            .ok_or_else(|| unavailable(entity, "delete"))?;
        self.execute(entity, &operation.sql, &operation.bind, record)
    }

    /// Runs the canonical select, reading through the static index table.
    pub fn select_all(&self, entity: &str) -> Result<Vec<Record>> {
        let bundle = self.bundle(entity)?;
        self.read(
            entity,
            &bundle.static_indices.sql,
            &unbound(),
            &Record::new(),
            &bundle.extract,
            None,
        )
    }

    /// Runs an arbitrary statement, resolving columns by name.
    ///
    /// Properties without a matching result column read their fallback.
    pub fn select_with(&self, entity: &str, sql: &str) -> Result<Vec<Record>> {
        let bundle = self.bundle(entity)?;
        self.read(
            entity,
            sql,
            &unbound(),
            &Record::new(),
            &bundle.extract,
            Some(&bundle.dynamic_lookup),
        )
    }

    /// Follows a to-one accessor of `entity` from `record`.
    pub fn find(&self, entity: &str, accessor: &str, record: &Record) -> Result<Option<Record>> {
        let bundle = self.bundle(entity)?;
        let accessor = bundle
            .to_one(accessor)
            .ok_or_else(|| unavailable(entity, accessor))?;
        let rows = self.read(entity, &accessor.sql, &accessor.bind, record, &accessor.extract, None)?;
        Ok(rows.into_iter().next())
    }

    /// Follows a to-many accessor of `entity` from `record`.
    pub fn fetch(
        &self,
        entity: &str,
        accessor: &str,
        record: &Record,
        order_by: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Vec<Record>> {
        let bundle = self.bundle(entity)?;
        let accessor = bundle
            .to_many(accessor)
            .ok_or_else(|| unavailable(entity, accessor))?;
        let sql = accessor.sql_with(order_by, limit);
        self.read(entity, &sql, &accessor.bind, record, &accessor.extract, None)
    }

    fn execute(&self, entity: &str, sql: &str, bind: &BindBlock, record: &Record) -> Result<usize> {
        let mut stmt = self.conn.prepare(sql)?;
        let changed = bind_block(&mut stmt, entity, bind, record, |stmt| Ok(stmt.raw_execute()?))?;
        debug!(entity, changed, "Executed write");
        Ok(changed)
    }

    fn read(
        &self,
        entity: &str,
        sql: &str,
        bind: &BindBlock,
        record: &Record,
        extract: &[ExtractExpr],
        lookup: Option<&DynamicIndexLookup>,
    ) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len() as i32;
        let resolved = lookup.map(|lookup| lookup.resolve(&columns));
        let slots: Vec<i32> = extract
            .iter()
            .map(|expr| match &resolved {
                Some(resolved) => resolved.get(&expr.property).unwrap_or(INDEX_UNMATCHED),
                None => expr.index_slot,
            })
            .collect();

        let records = bind_block(&mut stmt, entity, bind, record, |stmt| {
            let mut rows = stmt.raw_query();
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(read_row(row, extract, &slots, column_count)?);
            }
            Ok(records)
        })?;
        debug!(entity, rows = records.len(), "Read rows");
        Ok(records)
    }
}

fn unavailable(entity: &str, operation: &str) -> CatalogError {
    CatalogError::OperationUnavailable {
        entity: entity.to_string(),
        operation: operation.to_string(),
    }
}

fn unbound() -> BindBlock {
    BindBlock::build(Vec::new(), Terminal::Continuation)
}

/// Binds the direct ops of `block`, then either opens the scope of its
/// tail op or runs `terminal`.
fn bind_block<T, F>(
    stmt: &mut Statement<'_>,
    entity: &str,
    block: &BindBlock,
    record: &Record,
    terminal: F,
) -> Result<T>
where
    F: FnOnce(&mut Statement<'_>) -> Result<T>,
{
    for op in &block.direct {
        stmt.raw_bind_parameter(op.parameter, encode(entity, op, record.get(&op.property))?)?;
    }
    match &block.tail {
        BindTail::Terminal(_) => terminal(stmt),
        BindTail::Scoped { op, body } => {
            let buffer = encode(entity, op, record.get(&op.property))?;
            stmt.raw_bind_parameter(op.parameter, &buffer)?;
            bind_block(stmt, entity, body, record, terminal)
        }
    }
}

/// Encodes one value for its binder.
fn encode(entity: &str, op: &BindOp, value: Option<&FieldValue>) -> Result<Value> {
    let mismatch = || CatalogError::ValueMismatch {
        entity: entity.to_string(),
        property: op.property.clone(),
        binder: format!("{:?}", op.binder),
    };

    let value = match value {
        None | Some(FieldValue::Null) if op.nullable => return Ok(Value::Null),
        None | Some(FieldValue::Null) => return Err(mismatch()),
        Some(value) => value,
    };

    let encoded = match (&op.binder, value) {
        (Binder::Int64, FieldValue::Integer(i)) => Value::Integer(*i),
        (Binder::Double, FieldValue::Double(d)) => Value::Real(*d),
        (Binder::Bool, FieldValue::Bool(b)) => Value::Integer(i64::from(*b)),
        (Binder::DateEpoch, FieldValue::Date(seconds)) => Value::Real(*seconds),
        (Binder::DateText { format }, FieldValue::Date(seconds)) => {
            Value::Text(format_date(*seconds, format).ok_or_else(mismatch)?)
        }
        (Binder::Text, FieldValue::Text(text)) => Value::Text(text.clone()),
        (Binder::Blob, FieldValue::Bytes(bytes)) => Value::Blob(bytes.clone()),
        (Binder::UuidText, FieldValue::Uuid(uuid)) => Value::Text(uuid.hyphenated().to_string()),
        (Binder::UuidBlob, FieldValue::Uuid(uuid)) => Value::Blob(uuid.as_bytes().to_vec()),
        (Binder::UrlText, FieldValue::Url(url)) => Value::Text(url.as_str().to_string()),
        (Binder::DecimalText, FieldValue::Decimal(text)) => Value::Text(text.clone()),
        (Binder::Custom { name, storage }, FieldValue::Custom(value_name, inner)) if name == value_name => {
            match (storage, inner.as_ref()) {
                (CustomStorage::Integer, FieldValue::Integer(i)) => Value::Integer(*i),
                (CustomStorage::Real, FieldValue::Double(d)) => Value::Real(*d),
                (CustomStorage::Text, FieldValue::Text(text)) => Value::Text(text.clone()),
                (CustomStorage::Blob, FieldValue::Bytes(bytes)) => Value::Blob(bytes.clone()),
                _ => return Err(mismatch()),
            }
        }
        _ => return Err(mismatch()),
    };
    Ok(encoded)
}

fn format_date(seconds: f64, format: &str) -> Option<String> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    let moment: DateTime<Utc> = DateTime::from_timestamp(whole as i64, nanos)?;
    Some(moment.format(format).to_string())
}

fn read_row(row: &Row<'_>, extract: &[ExtractExpr], slots: &[i32], column_count: i32) -> Result<Record> {
    let mut record = Record::new();
    for (expr, &slot) in extract.iter().zip(slots) {
        let value = if (0..column_count).contains(&slot) {
            Some(row.get_ref(slot as usize)?)
        } else {
            None
        };
        let is_null = matches!(value, Some(ValueRef::Null));
        let field = match (expr.decide(slot, column_count, is_null), value) {
            (ReadDecision::Nil, _) => FieldValue::Null,
            (ReadDecision::Read, Some(value)) => {
                decode(&expr.reader, value).unwrap_or_else(|| fallback_value(&expr.fallback, &expr.reader))
            }
            _ => fallback_value(&expr.fallback, &expr.reader),
        };
        record.insert(expr.property.clone(), field);
    }
    Ok(record)
}

/// Converts a stored value; `None` when the conversion rejects it.
///
/// Numeric affinity may store text as a number and whole reals as
/// integers, so every reader accepts the storage classes that can hold
/// its representation.
fn decode(reader: &Reader, value: ValueRef<'_>) -> Option<FieldValue> {
    let decoded = match reader {
        Reader::Int64 => FieldValue::Integer(as_integer(value)?),
        Reader::Double => FieldValue::Double(as_real(value)?),
        Reader::Bool => FieldValue::Bool(as_integer(value)? != 0),
        Reader::DateEpoch => match value {
            ValueRef::Text(_) => FieldValue::Date(parse_engine_date(&as_text(value)?)?),
            _ => FieldValue::Date(as_real(value)?),
        },
        Reader::DateText { format } => match value {
            ValueRef::Text(_) => FieldValue::Date(parse_date(&as_text(value)?, format)?),
            _ => FieldValue::Date(as_real(value)?),
        },
        Reader::Text => FieldValue::Text(as_text(value)?),
        Reader::Blob => FieldValue::Bytes(as_bytes(value)?),
        Reader::UuidText => FieldValue::Uuid(Uuid::parse_str(&as_text(value)?).ok()?),
        Reader::UuidBlob => FieldValue::Uuid(Uuid::from_slice(&as_bytes(value)?).ok()?),
        Reader::UrlText => FieldValue::Url(Url::parse(&as_text(value)?).ok()?),
        Reader::DecimalText => FieldValue::Decimal(parse_decimal(&as_text(value)?)?),
        Reader::Custom { name, storage } => {
            let inner = match storage {
                CustomStorage::Integer => FieldValue::Integer(as_integer(value)?),
                CustomStorage::Real => FieldValue::Double(as_real(value)?),
                CustomStorage::Text => FieldValue::Text(as_text(value)?),
                CustomStorage::Blob => FieldValue::Bytes(as_bytes(value)?),
            };
            FieldValue::Custom(name.clone(), Box::new(inner))
        }
    };
    Some(decoded)
}

fn as_integer(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) if f.is_finite() => Some(f as i64),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).ok()?.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

fn as_real(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Null => None,
    }
}

fn as_bytes(value: ValueRef<'_>) -> Option<Vec<u8>> {
    match value {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Some(bytes.to_vec()),
        _ => None,
    }
}

/// Materializes a fallback literal.
fn fallback_value(literal: &Literal, reader: &Reader) -> FieldValue {
    match literal {
        Literal::Nil => FieldValue::Null,
        Literal::Integer(i) => FieldValue::Integer(*i),
        Literal::Double(d) => FieldValue::Double(*d),
        Literal::String(s) => FieldValue::Text(s.clone()),
        Literal::Bool(b) => FieldValue::Bool(*b),
        Literal::Bytes(bytes) => FieldValue::Bytes(bytes.clone()),
        Literal::Date(seconds) => FieldValue::Date(*seconds),
        Literal::Url(text) => Url::parse(text).map_or(FieldValue::Null, FieldValue::Url),
        Literal::Uuid(uuid) => FieldValue::Uuid(*uuid),
        Literal::Decimal(text) => FieldValue::Decimal(text.clone()),
        Literal::Now(format) => {
            let now = Utc::now();
            match reader {
                Reader::DateEpoch | Reader::DateText { .. } => FieldValue::Date(now.timestamp() as f64),
                _ => FieldValue::Text(now.format(format.chrono_format()).to_string()),
            }
        }
        Literal::Construct(name) => FieldValue::Custom(name.clone(), Box::new(FieldValue::Null)),
    }
}
