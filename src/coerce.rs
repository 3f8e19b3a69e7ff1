//! Type coercion between logical values and storage-native values
//!
//! | Declared type | Stored as | Read back | Default |
//! |---|---|---|---|
//! | text / long text / image | TEXT | identity, NULL → `""` | `""` |
//! | date | INTEGER epoch ms | date, NULL → null | now |
//! | json | TEXT | parsed, failure → `{}` | `{}` |
//! | number | REAL | numeric, otherwise `0` | `0` |
//! | bool | INTEGER 0/1 | `== 1` | `false` |
//! | one-to-one | TEXT id | raw id | null |
//! | one-to-many | TEXT JSON id array | raw JSON text | null |

use crate::column::{ColumnType, RelationKind, ScalarKind};
use crate::record::{date_from_millis, Fields, Record, Value};
use crate::schema::TableDeclaration;
use crate::storage::{RawRow, SqlValue};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};

/// Write-side default for a missing field
pub fn default_value(column: &ColumnType) -> Value {
    match column {
        ColumnType::Scalar(kind) => match kind {
            ScalarKind::Text | ScalarKind::LongText | ScalarKind::Image => Value::Text(String::new()),
            ScalarKind::Date => Value::Date(Utc::now()),
            ScalarKind::Json => Value::Json(JsonValue::Object(Map::new())),
            ScalarKind::Number => Value::Number(0.0),
            ScalarKind::Bool => Value::Bool(false),
        },
        ColumnType::Relation { .. } => Value::Null,
    }
}

/// Convert a logical value to its stored form
pub fn to_storage(column: &ColumnType, value: &Value) -> SqlValue {
    match column {
        ColumnType::Scalar(kind) => scalar_to_storage(*kind, value),
        ColumnType::Relation { kind: RelationKind::OneToOne, .. } => match value {
            Value::Text(id) => SqlValue::Text(id.clone()),
            Value::Record(_) | Value::Json(_) => value
                .reference_id()
                .map(|id| SqlValue::Text(id.to_string()))
                .unwrap_or(SqlValue::Null),
            _ => SqlValue::Null,
        },
        ColumnType::Relation { kind: RelationKind::OneToMany, .. } => match value {
            Value::Text(raw) => SqlValue::Text(raw.clone()),
            Value::List(items) => {
                let ids: Vec<JsonValue> = items
                    .iter()
                    .filter_map(Value::reference_id)
                    .map(|id| JsonValue::String(id.to_string()))
                    .collect();
                SqlValue::Text(JsonValue::Array(ids).to_string())
            }
            _ => SqlValue::Null,
        },
    }
}

fn scalar_to_storage(kind: ScalarKind, value: &Value) -> SqlValue {
    match kind {
        // Truthiness, so NULL stores as 0
        ScalarKind::Bool => {
            let truthy = match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => *n != 0.0,
                Value::Text(s) => !s.is_empty(),
                _ => true,
            };
            SqlValue::Integer(i64::from(truthy))
        }
        _ if value.is_null() => SqlValue::Null,
        ScalarKind::Text | ScalarKind::LongText | ScalarKind::Image => SqlValue::Text(render(value)),
        ScalarKind::Date => match value {
            Value::Date(dt) => SqlValue::Integer(dt.timestamp_millis()),
            Value::Number(n) => SqlValue::Integer(*n as i64),
            Value::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| SqlValue::Integer(dt.timestamp_millis()))
                .unwrap_or(SqlValue::Null),
            _ => SqlValue::Null,
        },
        ScalarKind::Json => SqlValue::Text(value.to_json().to_string()),
        ScalarKind::Number => match value {
            Value::Number(n) => SqlValue::Real(*n),
            Value::Bool(b) => SqlValue::Real(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse::<f64>().map(SqlValue::Real).unwrap_or(SqlValue::Null),
            _ => SqlValue::Null,
        },
    }
}

fn render(value: &Value) -> String {
    match value.to_json() {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

/// Reconstruct a logical value from its stored form
pub fn from_storage(column: &ColumnType, raw: &SqlValue) -> Value {
    match column {
        ColumnType::Scalar(kind) => scalar_from_storage(*kind, raw),
        ColumnType::Relation { .. } => match raw {
            SqlValue::Null => Value::Null,
            SqlValue::Text(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        },
    }
}

fn scalar_from_storage(kind: ScalarKind, raw: &SqlValue) -> Value {
    match kind {
        ScalarKind::Text | ScalarKind::LongText | ScalarKind::Image => match raw {
            SqlValue::Null => Value::Text(String::new()),
            SqlValue::Text(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        },
        ScalarKind::Date => {
            let millis = match raw {
                SqlValue::Integer(ms) => Some(*ms),
                SqlValue::Real(ms) => Some(*ms as i64),
                SqlValue::Text(s) => s.trim().parse::<i64>().ok(),
                SqlValue::Null => None,
            };
            millis.and_then(date_from_millis).map(Value::Date).unwrap_or(Value::Null)
        }
        ScalarKind::Json => {
            let parsed = match raw {
                SqlValue::Text(s) => serde_json::from_str(s).ok(),
                _ => None,
            };
            Value::Json(parsed.unwrap_or_else(|| JsonValue::Object(Map::new())))
        }
        ScalarKind::Number => {
            let n = match raw {
                SqlValue::Integer(i) => *i as f64,
                SqlValue::Real(f) => *f,
                SqlValue::Text(s) if s.trim().is_empty() => 0.0,
                SqlValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
                SqlValue::Null => 0.0,
            };
            Value::Number(if n.is_finite() { n } else { 0.0 })
        }
        ScalarKind::Bool => Value::Bool(raw.as_integer() == Some(1)),
    }
}

/// Stored values for every declared field, in declaration order.
///
/// Fields absent from `fields` get the type default.
pub fn storage_columns<'a>(table: &'a TableDeclaration, fields: &Fields) -> Vec<(&'a str, SqlValue)> {
    table
        .fields()
        .map(|(name, column)| {
            let stored = match fields.get(name) {
                Some(value) => to_storage(column, value),
                None => to_storage(column, &default_value(column)),
            };
            (name, stored)
        })
        .collect()
}

/// Fill declared columns absent from a raw row with their stored default
pub fn fill_missing(table: &TableDeclaration, row: &mut RawRow) {
    for (name, column) in table.fields() {
        if !row.contains_key(name) {
            row.insert(name.to_string(), to_storage(column, &default_value(column)));
        }
    }
}

pub fn encode_metadata(metadata: &Map<String, JsonValue>) -> SqlValue {
    SqlValue::Text(JsonValue::Object(metadata.clone()).to_string())
}

/// Parse stored metadata; anything but a JSON object degrades to `{}`
pub fn decode_metadata(id: &str, raw: Option<&SqlValue>) -> Map<String, JsonValue> {
    match raw {
        Some(SqlValue::Text(s)) => match serde_json::from_str::<JsonValue>(s) {
            Ok(JsonValue::Object(map)) => map,
            Ok(_) => {
                tracing::warn!("Metadata for record {} is not an object, using empty metadata", id);
                Map::new()
            }
            Err(e) => {
                tracing::warn!("Failed to parse metadata for record {}: {}", id, e);
                Map::new()
            }
        },
        _ => Map::new(),
    }
}

fn timestamp(raw: Option<&SqlValue>) -> DateTime<Utc> {
    raw.and_then(SqlValue::as_integer)
        .and_then(date_from_millis)
        .unwrap_or_default()
}

/// Turn a raw row into a record with every declared field present
pub fn hydrate(table: &TableDeclaration, mut row: RawRow) -> Record {
    fill_missing(table, &mut row);

    let id = row.get("id").and_then(SqlValue::as_text).unwrap_or_default().to_string();
    let metadata = decode_metadata(&id, row.get("metadata"));
    let created_at = timestamp(row.get("createdAt"));
    let updated_at = timestamp(row.get("updatedAt"));

    let fields = table
        .fields()
        .map(|(name, column)| {
            let value = row
                .get(name)
                .map(|raw| from_storage(column, raw))
                .unwrap_or(Value::Null);
            (name.to_string(), value)
        })
        .collect();

    Record { id, metadata, created_at, updated_at, fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::blog;
    use serde_json::json;

    fn scalar(kind: ScalarKind) -> ColumnType {
        ColumnType::Scalar(kind)
    }

    /// Storing a read-back value stores the same thing again
    fn assert_stable(column: &ColumnType, value: Value) {
        let stored = to_storage(column, &value);
        let reread = from_storage(column, &stored);
        assert_eq!(to_storage(column, &reread), stored, "unstable for {:?}", column);
    }

    #[test]
    fn test_storage_roundtrip_is_stable() {
        let date = date_from_millis(1_700_000_000_123).unwrap();
        assert_stable(&scalar(ScalarKind::Text), Value::from("hello"));
        assert_stable(&scalar(ScalarKind::LongText), Value::from("line\nline"));
        assert_stable(&scalar(ScalarKind::Image), Value::from("https://example.com/cat.png"));
        assert_stable(&scalar(ScalarKind::Date), Value::Date(date));
        assert_stable(&scalar(ScalarKind::Json), Value::Json(json!({"a": [1, 2], "b": null})));
        assert_stable(&scalar(ScalarKind::Number), Value::Number(-3.25));
        assert_stable(&scalar(ScalarKind::Bool), Value::Bool(true));
        assert_stable(&scalar(ScalarKind::Bool), Value::Bool(false));
        assert_stable(&ColumnType::one_to_one("user"), Value::from("user_1"));
        assert_stable(&ColumnType::one_to_many("post"), Value::List(vec![Value::from("post_1")]));
    }

    #[test]
    fn test_date_millisecond_precision() {
        let stored = to_storage(&scalar(ScalarKind::Date), &Value::Date(date_from_millis(1_700_000_000_123).unwrap()));
        assert_eq!(stored, SqlValue::Integer(1_700_000_000_123));
        let back = from_storage(&scalar(ScalarKind::Date), &stored);
        assert_eq!(back, Value::Date(date_from_millis(1_700_000_000_123).unwrap()));
        assert_eq!(from_storage(&scalar(ScalarKind::Date), &SqlValue::Null), Value::Null);
    }

    #[test]
    fn test_read_side_fallbacks() {
        assert_eq!(from_storage(&scalar(ScalarKind::Text), &SqlValue::Null), Value::from(""));
        assert_eq!(
            from_storage(&scalar(ScalarKind::Json), &SqlValue::Text("{not json".into())),
            Value::Json(json!({}))
        );
        assert_eq!(from_storage(&scalar(ScalarKind::Number), &SqlValue::Text("abc".into())), Value::Number(0.0));
        assert_eq!(from_storage(&scalar(ScalarKind::Number), &SqlValue::Text("4.5".into())), Value::Number(4.5));
        assert_eq!(from_storage(&scalar(ScalarKind::Number), &SqlValue::Integer(7)), Value::Number(7.0));
        assert_eq!(from_storage(&scalar(ScalarKind::Bool), &SqlValue::Integer(1)), Value::Bool(true));
        assert_eq!(from_storage(&scalar(ScalarKind::Bool), &SqlValue::Integer(2)), Value::Bool(false));
        assert_eq!(from_storage(&ColumnType::one_to_one("user"), &SqlValue::Null), Value::Null);
    }

    #[test]
    fn test_relation_storage_forms() {
        let one = ColumnType::one_to_one("user");
        let many = ColumnType::one_to_many("post");

        assert_eq!(to_storage(&one, &Value::Json(json!({"id": "user_9"}))), SqlValue::Text("user_9".into()));
        assert_eq!(to_storage(&one, &Value::Null), SqlValue::Null);

        let list = Value::List(vec![Value::from("post_1"), Value::Json(json!({"id": "post_2"})), Value::Number(3.0)]);
        assert_eq!(to_storage(&many, &list), SqlValue::Text(r#"["post_1","post_2"]"#.into()));
        assert_eq!(
            from_storage(&many, &SqlValue::Text(r#"["post_1"]"#.into())),
            Value::Text(r#"["post_1"]"#.into())
        );
    }

    #[test]
    fn test_bool_stores_truthiness() {
        assert_eq!(to_storage(&scalar(ScalarKind::Bool), &Value::Null), SqlValue::Integer(0));
        assert_eq!(to_storage(&scalar(ScalarKind::Bool), &Value::Bool(true)), SqlValue::Integer(1));
    }

    #[test]
    fn test_metadata_degrades_to_empty() {
        assert!(decode_metadata("user_1", Some(&SqlValue::Text("oops".into()))).is_empty());
        assert!(decode_metadata("user_1", Some(&SqlValue::Text("[1]".into()))).is_empty());
        assert!(decode_metadata("user_1", None).is_empty());
        let map = decode_metadata("user_1", Some(&SqlValue::Text(r#"{"role":"admin"}"#.into())));
        assert_eq!(map["role"], json!("admin"));
        assert_eq!(encode_metadata(&map), SqlValue::Text(r#"{"role":"admin"}"#.into()));
    }

    #[test]
    fn test_hydrate_fills_missing_fields() {
        let decl = blog();
        let user = decl.table("user").unwrap();
        let mut row = RawRow::new();
        row.insert("id".into(), "user_1".into());
        row.insert("metadata".into(), "not json".into());
        row.insert("createdAt".into(), SqlValue::Integer(1_000));
        row.insert("updatedAt".into(), SqlValue::Integer(2_000));
        row.insert("email".into(), "a@b.c".into());

        let record = hydrate(user, row);
        assert_eq!(record.id, "user_1");
        assert!(record.metadata.is_empty());
        assert_eq!(record.created_at, date_from_millis(1_000).unwrap());
        assert_eq!(record.updated_at, date_from_millis(2_000).unwrap());
        assert_eq!(record.text("email"), Some("a@b.c"));
        assert_eq!(record.text("password"), Some(""));
        assert_eq!(record.get("posts"), Some(&Value::Null));
    }

    #[test]
    fn test_storage_columns_defaults() {
        let decl = blog();
        let user = decl.table("user").unwrap();
        let mut fields = Fields::new();
        fields.insert("email".into(), Value::from("a@b.c"));

        let columns = storage_columns(user, &fields);
        assert_eq!(
            columns,
            vec![
                ("email", SqlValue::Text("a@b.c".into())),
                ("password", SqlValue::Text(String::new())),
                ("posts", SqlValue::Null),
            ]
        );
    }
}
