//! Storage Layer - minimal row adapter the mapper talks SQL through
//!
//! The mapper only needs four things from a store:
//! - `all(sql, params)`: every row of a query
//! - `get(sql, params)`: the first row, if any
//! - `run(sql, params)`: execute without reading rows
//! - `close()`
//!
//! Table and column names are interpolated from the declaration; values are
//! always bound as parameters.

pub mod sql;
pub mod sqlite;

pub use sqlite::SqliteAdapter;

use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// Storage-native scalar
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Real(f)
    }
}

/// A raw row: column name → storage value
pub type RawRow = BTreeMap<String, SqlValue>;

/// Async row-level access to a SQL engine.
///
/// Implementations must serialize or otherwise make concurrent calls safe;
/// the mapper does no locking of its own.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Run a query and return every row
    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<RawRow>>;

    /// Run a query and return the first row, if any
    async fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<RawRow>>;

    /// Execute a statement that returns no rows
    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<()>;

    /// Release the underlying connection
    async fn close(&self) -> Result<()>;
}
