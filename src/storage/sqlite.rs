//! SQLite storage adapter

use std::path::Path;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use crate::{Result, Error};
use super::{RawRow, SqlValue, StorageAdapter};

/// SQLite-backed storage adapter.
///
/// Statements run on the blocking pool; the connection mutex serializes them.
pub struct SqliteAdapter {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteAdapter {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::Task("connection mutex poisoned".to_string()))?;
            let conn = guard.as_ref().ok_or(Error::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }
}

#[async_trait]
impl StorageAdapter for SqliteAdapter {
    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<RawRow>> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| query_rows(conn, &sql, &params, None)).await
    }

    async fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<RawRow>> {
        let sql = sql.to_string();
        let params = params.to_vec();
        let rows = self.with_conn(move |conn| query_rows(conn, &sql, &params, Some(1))).await?;
        Ok(rows.into_iter().next())
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<()> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| {
            conn.execute(&sql, params_from_iter(params.iter()))?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Task("connection mutex poisoned".to_string()))?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| Error::Storage(e))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }
}

/// Run a query and collect rows as column-name maps
fn query_rows(conn: &Connection, sql: &str, params: &[SqlValue], limit: Option<usize>) -> Result<Vec<RawRow>> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut raw = RawRow::new();
        for (i, name) in names.iter().enumerate() {
            raw.insert(name.clone(), from_value_ref(row.get_ref(i)?));
        }
        out.push(raw);
        if limit.is_some_and(|limit| out.len() >= limit) {
            break;
        }
    }
    Ok(out)
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(SqliteValue::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}
