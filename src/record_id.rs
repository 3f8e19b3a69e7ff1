//! Record identifiers - globally unique, table-prefixed ids
//!
//! Format: `<table>_<uuid-v4>`
//!
//! Examples:
//! - `user_0b6f3f0e-6c8e-4f57-9a53-2f2c3f4f3a8d`
//! - `post_9d1c2b7a-0f43-4a5e-8d5e-6a3a1b2c3d4e`
//!
//! Operations that only receive an id (`get`, `delete`) recover the table
//! from the prefix, so table names never contain `_`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Parsed record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Owning table
    pub table: String,
    /// Random part after the first `_`
    pub key: String,
}

impl RecordId {
    /// Generate a fresh id for `table`
    pub fn generate(table: &str) -> Self {
        Self {
            table: table.to_string(),
            key: Uuid::new_v4().to_string(),
        }
    }

    /// Parse an id string, splitting the table on the first `_`
    pub fn parse(id: &str) -> Result<Self> {
        let (table, key) = id
            .split_once('_')
            .ok_or_else(|| Error::InvalidId(id.to_string()))?;

        if table.is_empty() || key.is_empty() {
            return Err(Error::InvalidId(id.to_string()));
        }

        Ok(Self {
            table: table.to_string(),
            key: key.to_string(),
        })
    }

    /// Table name embedded in an id string, if it has one
    pub fn table_of(id: &str) -> Option<&str> {
        id.split_once('_').map(|(table, _)| table).filter(|t| !t.is_empty())
    }

    /// Convert to id string
    pub fn to_id_string(&self) -> String {
        format!("{}_{}", self.table, self.key)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_id_string())
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_id_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_roundtrip() {
        let id = RecordId::generate("user");
        let id_str = id.to_id_string();
        assert!(id_str.starts_with("user_"));

        let parsed = RecordId::parse(&id_str).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.table, "user");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = RecordId::generate("post");
        let b = RecordId::generate("post");
        assert_ne!(a, b);
    }

    #[test]
    fn test_split_on_first_underscore() {
        let parsed = RecordId::parse("post_abc_def").unwrap();
        assert_eq!(parsed.table, "post");
        assert_eq!(parsed.key, "abc_def");
        assert_eq!(RecordId::table_of("post_abc_def"), Some("post"));
    }

    #[test]
    fn test_invalid_id() {
        assert!(RecordId::parse("nounderscore").is_err());
        assert!(RecordId::parse("_abc").is_err());
        assert!(RecordId::parse("user_").is_err());
        assert_eq!(RecordId::table_of("plain"), None);
    }
}
