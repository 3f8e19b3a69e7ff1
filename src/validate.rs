//! Shape validation for incoming records
//!
//! Runs before every write. Walks the keys of the input, not the schema, so
//! missing fields are fine (they get defaults) but unknown ones are not.

use crate::column::{ColumnType, RelationKind, ScalarKind};
use crate::record::{Fields, Value};
use crate::schema::{is_reserved, TableDeclaration};
use crate::{Error, Result};
use serde_json::Value as JsonValue;

/// Check every input field against the table declaration
pub fn validate(table: &TableDeclaration, fields: &Fields) -> Result<()> {
    for (name, value) in fields {
        if is_reserved(name) {
            continue;
        }

        let column = table
            .column(name)
            .ok_or_else(|| Error::UnexpectedField(name.clone()))?;

        validate_value(name, column, value)?;
    }
    Ok(())
}

fn validate_value(name: &str, column: &ColumnType, value: &Value) -> Result<()> {
    match column {
        ColumnType::Relation { kind, .. } => {
            let ok = match value {
                Value::Text(_) | Value::Null => true,
                Value::List(_) => *kind == RelationKind::OneToMany,
                Value::Record(_) | Value::Json(JsonValue::Object(_)) => *kind == RelationKind::OneToOne,
                _ => false,
            };
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidRelation(name.to_string()))
            }
        }
        ColumnType::Scalar(kind) => {
            let ok = match kind {
                ScalarKind::Text | ScalarKind::LongText | ScalarKind::Image => matches!(value, Value::Text(_)),
                ScalarKind::Date => matches!(value, Value::Date(_)),
                ScalarKind::Json => matches!(value, Value::Json(JsonValue::Object(_) | JsonValue::Array(_))),
                ScalarKind::Number => matches!(value, Value::Number(_)),
                ScalarKind::Bool => matches!(value, Value::Bool(_)),
            };
            if ok {
                Ok(())
            } else {
                Err(Error::TypeMismatch {
                    field: name.to_string(),
                    expected: expected_shape(*kind),
                })
            }
        }
    }
}

fn expected_shape(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Text | ScalarKind::LongText | ScalarKind::Image => "a string",
        ScalarKind::Date => "a Date",
        ScalarKind::Json => "an object",
        ScalarKind::Number => "a number",
        ScalarKind::Bool => "a boolean",
    }
}
