//! Column types - the closed set of field types a declaration can use
//!
//! Every field is either a scalar or a relation:
//! - `Scalar`: text, long text, image, date, json, number, bool
//! - `Relation`: one-to-one / one-to-many reference to another table
//!
//! Relations only ever store identifiers at rest.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar field kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Short free text
    Text,
    /// Multi-line free text
    LongText,
    /// Image URL or data reference
    Image,
    /// Point in time, stored as epoch milliseconds
    Date,
    /// Arbitrary JSON object or array
    Json,
    /// Floating point number
    Number,
    /// Boolean, stored as 0/1
    Bool,
}

impl ScalarKind {
    /// Get the declaration tag of the scalar kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Text => "text",
            ScalarKind::LongText => "long text",
            ScalarKind::Image => "image",
            ScalarKind::Date => "date",
            ScalarKind::Json => "json",
            ScalarKind::Number => "number",
            ScalarKind::Bool => "bool",
        }
    }

    /// Get all scalar kinds
    pub fn all() -> &'static [ScalarKind] {
        &[
            ScalarKind::Text,
            ScalarKind::LongText,
            ScalarKind::Image,
            ScalarKind::Date,
            ScalarKind::Json,
            ScalarKind::Number,
            ScalarKind::Bool,
        ]
    }

    /// Whether values of this kind are plain strings
    pub fn is_textual(&self) -> bool {
        matches!(self, ScalarKind::Text | ScalarKind::LongText | ScalarKind::Image)
    }
}

impl FromStr for ScalarKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Ok(ScalarKind::Text),
            "long text" | "long-text" | "longtext" => Ok(ScalarKind::LongText),
            "image" => Ok(ScalarKind::Image),
            "date" => Ok(ScalarKind::Date),
            "json" => Ok(ScalarKind::Json),
            "number" => Ok(ScalarKind::Number),
            "bool" | "boolean" => Ok(ScalarKind::Bool),
            _ => Err(Error::InvalidDeclaration(format!("Unknown column type: {}", s))),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relationship cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    /// Field holds a single target id
    OneToOne,
    /// Field holds a JSON array of target ids
    OneToMany,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::OneToOne => "one-to-one",
            RelationKind::OneToMany => "one-to-many",
        }
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "one-to-one" | "one_to_one" => Ok(RelationKind::OneToOne),
            "one-to-many" | "one_to_many" => Ok(RelationKind::OneToMany),
            _ => Err(Error::InvalidDeclaration(format!("Unknown relation kind: {}", s))),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared type of a single field.
///
/// Every dispatch over field types (SQL type, default, coercion, validation)
/// matches on this enum exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Scalar(ScalarKind),
    Relation { kind: RelationKind, target: String },
}

impl ColumnType {
    pub fn text() -> Self {
        ColumnType::Scalar(ScalarKind::Text)
    }

    pub fn one_to_one(target: impl Into<String>) -> Self {
        ColumnType::Relation { kind: RelationKind::OneToOne, target: target.into() }
    }

    pub fn one_to_many(target: impl Into<String>) -> Self {
        ColumnType::Relation { kind: RelationKind::OneToMany, target: target.into() }
    }

    /// SQL column type used for storage
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Scalar(kind) => match kind {
                ScalarKind::Text | ScalarKind::LongText | ScalarKind::Image | ScalarKind::Json => "TEXT",
                ScalarKind::Date | ScalarKind::Bool => "INTEGER",
                ScalarKind::Number => "REAL",
            },
            ColumnType::Relation { .. } => "TEXT",
        }
    }

    /// Relation kind and target table, if this is a relation
    pub fn relation(&self) -> Option<(RelationKind, &str)> {
        match self {
            ColumnType::Scalar(_) => None,
            ColumnType::Relation { kind, target } => Some((*kind, target.as_str())),
        }
    }

    /// Check if this column references `table`
    pub fn references(&self, table: &str) -> bool {
        self.relation().is_some_and(|(_, target)| target == table)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Scalar(kind) => write!(f, "{}", kind),
            ColumnType::Relation { kind, target } => write!(f, "{} → {}", kind, target),
        }
    }
}

/// Declaration-file shape: a bare tag or `{ type, ref }`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawColumnType {
    Tag(String),
    Relation {
        #[serde(rename = "type")]
        kind: RelationKind,
        #[serde(rename = "ref")]
        target: String,
    },
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let raw = match self {
            ColumnType::Scalar(kind) => RawColumnType::Tag(kind.as_str().to_string()),
            ColumnType::Relation { kind, target } => RawColumnType::Relation {
                kind: *kind,
                target: target.clone(),
            },
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match RawColumnType::deserialize(deserializer)? {
            RawColumnType::Tag(tag) => ScalarKind::from_str(&tag)
                .map(ColumnType::Scalar)
                .map_err(serde::de::Error::custom),
            RawColumnType::Relation { kind, target } => Ok(ColumnType::Relation { kind, target }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kind_roundtrip() {
        for kind in ScalarKind::all() {
            let parsed: ScalarKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
        assert_eq!("long-text".parse::<ScalarKind>().unwrap(), ScalarKind::LongText);
        assert!("blob".parse::<ScalarKind>().is_err());
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(ColumnType::Scalar(ScalarKind::Date).sql_type(), "INTEGER");
        assert_eq!(ColumnType::Scalar(ScalarKind::Bool).sql_type(), "INTEGER");
        assert_eq!(ColumnType::Scalar(ScalarKind::Number).sql_type(), "REAL");
        assert_eq!(ColumnType::Scalar(ScalarKind::Json).sql_type(), "TEXT");
        assert_eq!(ColumnType::one_to_many("post").sql_type(), "TEXT");
    }

    #[test]
    fn test_deserialize_tag_and_relation() {
        let tag: ColumnType = serde_json::from_str("\"long text\"").unwrap();
        assert_eq!(tag, ColumnType::Scalar(ScalarKind::LongText));

        let rel: ColumnType = serde_json::from_str(r#"{"type": "one-to-many", "ref": "post"}"#).unwrap();
        assert_eq!(rel, ColumnType::one_to_many("post"));
        assert!(rel.references("post"));
        assert!(!rel.references("user"));

        assert!(serde_json::from_str::<ColumnType>("\"varchar\"").is_err());
        assert!(serde_json::from_str::<ColumnType>(r#"{"type": "many-to-many", "ref": "x"}"#).is_err());
    }

    #[test]
    fn test_serialize_matches_declaration_shape() {
        let json = serde_json::to_value(ColumnType::one_to_one("user")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "one-to-one", "ref": "user"}));
        let json = serde_json::to_value(ColumnType::text()).unwrap();
        assert_eq!(json, serde_json::json!("text"));
    }
}
