//! Logical records - what callers read and write
//!
//! A `Record` carries the system fields (`id`, `metadata`, `createdAt`,
//! `updatedAt`) plus one `Value` per declared field. Relation fields hold a
//! raw id / JSON id list until the relationship engine expands them into
//! nested records.

use crate::column::{ColumnType, RelationKind, ScalarKind};
use crate::record_id::RecordId;
use crate::schema::{is_reserved, DatabaseDeclaration, TableDeclaration};
use crate::Result;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use indexmap::IndexMap;

/// Field name → value map, used for insert input and record bodies.
///
/// Keeps insertion order; hydrated records follow declaration order.
pub type Fields = IndexMap<String, Value>;

/// A single logical field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    Json(JsonValue),
    /// Expanded one-to-one relation
    Record(Box<Record>),
    /// One-to-many input ids or expanded records
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Id this value points at: a bare id, a nested record, or an `{id}` object
    pub fn reference_id(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Record(record) => Some(&record.id),
            Value::Json(JsonValue::Object(obj)) => obj.get("id").and_then(JsonValue::as_str),
            _ => None,
        }
    }

    /// Plain JSON rendering; dates become RFC 3339 strings
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Date(dt) => JsonValue::String(format_date(dt)),
            Value::Json(json) => json.clone(),
            Value::Record(record) => record.to_json(),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// Build a value from JSON input, guided by the declared column type.
    ///
    /// Shapes that do not fit the column are kept as-is so validation can
    /// reject them with the right error.
    pub fn from_json(column: Option<&ColumnType>, json: JsonValue) -> Value {
        match (column, json) {
            (Some(ColumnType::Scalar(ScalarKind::Date)), JsonValue::String(s)) => {
                match DateTime::parse_from_rfc3339(&s) {
                    Ok(dt) => Value::Date(dt.with_timezone(&Utc)),
                    Err(_) => Value::Text(s),
                }
            }
            (Some(ColumnType::Scalar(ScalarKind::Date)), JsonValue::Number(n)) => {
                match n.as_i64().and_then(date_from_millis) {
                    Some(dt) => Value::Date(dt),
                    None => Value::Number(n.as_f64().unwrap_or_default()),
                }
            }
            (Some(ColumnType::Scalar(ScalarKind::Json)), json @ (JsonValue::Object(_) | JsonValue::Array(_))) => {
                Value::Json(json)
            }
            (Some(ColumnType::Relation { kind: RelationKind::OneToMany, .. }), JsonValue::Array(items)) => {
                Value::List(
                    items
                        .into_iter()
                        .map(|item| match item {
                            JsonValue::String(s) => Value::Text(s),
                            other => Value::Json(other),
                        })
                        .collect(),
                )
            }
            (_, json) => Value::from_plain_json(json),
        }
    }

    fn from_plain_json(json: JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            JsonValue::String(s) => Value::Text(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from_plain_json).collect()),
            obj @ JsonValue::Object(_) => Value::Json(obj),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::Date(dt)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Box::new(record))
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::Json(json)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A hydrated record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub metadata: Map<String, JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Fields,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Text value of a field, if it holds one
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Table the record belongs to, from its id
    pub fn table(&self) -> Option<&str> {
        RecordId::table_of(&self.id)
    }

    /// Flat JSON object of system and declared fields
    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::new();
        obj.insert("id".to_string(), JsonValue::String(self.id.clone()));
        obj.insert("metadata".to_string(), JsonValue::Object(self.metadata.clone()));
        obj.insert("createdAt".to_string(), JsonValue::String(format_date(&self.created_at)));
        obj.insert("updatedAt".to_string(), JsonValue::String(format_date(&self.updated_at)));
        for (name, value) in &self.fields {
            obj.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(obj)
    }

    /// Parse a full record (as returned by `to_json`) for an update.
    ///
    /// The table is taken from the `id`; a missing id yields an empty one,
    /// which `update` rejects.
    pub fn from_json(declaration: &DatabaseDeclaration, json: JsonValue) -> Result<Record> {
        let mut obj = expect_object(json)?;

        let id = match obj.shift_remove("id") {
            Some(JsonValue::String(id)) => id,
            _ => String::new(),
        };
        let metadata = match obj.shift_remove("metadata") {
            Some(JsonValue::Object(map)) => map,
            _ => Map::new(),
        };
        let created_at = obj.shift_remove("createdAt").and_then(json_date).unwrap_or_default();
        let updated_at = obj.shift_remove("updatedAt").and_then(json_date).unwrap_or_default();

        let table = match RecordId::table_of(&id) {
            Some(table) => Some(declaration.table(table)?),
            None => None,
        };

        let fields = obj
            .into_iter()
            .map(|(name, value)| {
                let column = table.and_then(|t| t.column(&name));
                let value = Value::from_json(column, value);
                (name, value)
            })
            .collect();

        Ok(Record { id, metadata, created_at, updated_at, fields })
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Build insert input from a JSON object using the table's declared types.
///
/// System fields are dropped; undeclared fields are kept for validation to
/// reject.
pub fn fields_from_json(table: &TableDeclaration, json: JsonValue) -> Result<Fields> {
    let obj = expect_object(json)?;
    Ok(obj
        .into_iter()
        .filter(|(name, _)| !is_reserved(name))
        .map(|(name, value)| {
            let value = Value::from_json(table.column(&name), value);
            (name, value)
        })
        .collect())
}

fn expect_object(json: JsonValue) -> Result<Map<String, JsonValue>> {
    match json {
        JsonValue::Object(obj) => Ok(obj),
        other => Err(<serde_json::Error as serde::de::Error>::custom(format!("expected a JSON object, got {}", other)).into()),
    }
}

fn json_date(json: JsonValue) -> Option<DateTime<Utc>> {
    match json {
        JsonValue::String(s) => DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc)),
        JsonValue::Number(n) => n.as_i64().and_then(date_from_millis),
        _ => None,
    }
}

/// Millisecond timestamp to UTC date
pub fn date_from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
