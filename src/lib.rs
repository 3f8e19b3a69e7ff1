//! # Quickorm - Quick-n-easy record mapper
//!
//! Declare tables as plain field → type maps and get:
//! - Table creation and additive migration on connect
//! - Validated, type-coerced CRUD over a minimal storage adapter
//! - Bidirectional one-to-one / one-to-many relations kept in sync on write
//! - Bounded-depth, cycle-safe relation expansion on read

pub mod column;
pub mod schema;
pub mod record_id;
pub mod record;
pub mod coerce;
pub mod validate;
pub mod storage;
pub mod mapper;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use column::{ColumnType, RelationKind, ScalarKind};
pub use schema::{DatabaseDeclaration, TableDeclaration};
pub use record_id::RecordId;
pub use record::{Fields, Record, Value};
pub use storage::{SqlValue, SqliteAdapter, StorageAdapter};
pub use mapper::{MigrationReport, RecordMapper};
pub use config::MapperOptions;

/// Result type alias for Quickorm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Quickorm operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Record with id {0} not found")]
    NotFound(String),

    #[error("Unexpected field \"{0}\"")]
    UnexpectedField(String),

    #[error("Field \"{field}\" should be {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("Field \"{0}\" should be a string reference id, null, or a valid relationship object")]
    InvalidRelation(String),

    #[error("Missing id in record to update")]
    MissingId,

    #[error("Invalid record id: {0}")]
    InvalidId(String),

    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage adapter is closed")]
    Closed,

    #[error("Storage task failed: {0}")]
    Task(String),
}

impl Error {
    /// Whether the caller caused this error (bad input, unknown table or id).
    ///
    /// Presentation layers map these to 4xx responses and everything else to 5xx.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownTable(_)
                | Error::NotFound(_)
                | Error::UnexpectedField(_)
                | Error::TypeMismatch { .. }
                | Error::InvalidRelation(_)
                | Error::MissingId
                | Error::InvalidId(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::NotFound("user_1".into()).is_client_error());
        assert!(Error::TypeMismatch { field: "email".into(), expected: "a string" }.is_client_error());
        assert!(Error::MissingId.is_client_error());
        assert!(!Error::Closed.is_client_error());
        assert!(!Error::Task("panicked".into()).is_client_error());
    }

    #[test]
    fn test_type_mismatch_names_field() {
        let err = Error::TypeMismatch { field: "email".into(), expected: "a string" };
        assert_eq!(err.to_string(), "Field \"email\" should be a string");
    }
}
