//! Record Mapper - CRUD over declared tables
//!
//! Write path: validate → assign system fields → coerce → write row →
//! propagate back-references → return the expanded record.
//!
//! Read path: fetch row → fill defaults → coerce → expand relations.
//!
//! Nothing here is transactional; back-reference propagation runs after the
//! primary write and its failures are only logged.

pub mod migrate;
pub mod relations;


pub use migrate::MigrationReport;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use chrono::Utc;
use serde_json::Map;
use crate::{Error, Result};
use crate::coerce::{self, encode_metadata};
use crate::config::MapperOptions;
use crate::record::{Fields, Record};
use crate::record_id::RecordId;
use crate::schema::DatabaseDeclaration;
use crate::storage::{sql, RawRow, SqlValue, StorageAdapter};
use crate::validate::validate;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Schema-driven record mapper over a `StorageAdapter`
pub struct RecordMapper {
    adapter: Arc<dyn StorageAdapter>,
    declaration: DatabaseDeclaration,
    options: MapperOptions,
}

impl RecordMapper {
    /// Build a mapper and migrate the store to the declaration
    pub async fn connect(adapter: Arc<dyn StorageAdapter>, declaration: DatabaseDeclaration) -> Result<Self> {
        Self::connect_with_options(adapter, declaration, MapperOptions::default()).await
    }

    pub async fn connect_with_options(
        adapter: Arc<dyn StorageAdapter>,
        declaration: DatabaseDeclaration,
        options: MapperOptions,
    ) -> Result<Self> {
        let mapper = Self { adapter, declaration, options };
        let report = mapper.migrate().await?;
        if !report.is_noop() {
            tracing::info!("Added {} column(s) during migration", report.added_columns.len());
        }
        Ok(mapper)
    }

    /// Create missing tables and columns. Runs on connect; safe to repeat.
    pub async fn migrate(&self) -> Result<MigrationReport> {
        migrate::run(self.adapter.as_ref(), &self.declaration).await
    }

    /// The declaration this mapper was built with
    pub fn declaration(&self) -> &DatabaseDeclaration {
        &self.declaration
    }

    pub fn options(&self) -> MapperOptions {
        self.options
    }

    /// Insert a new record into `table`
    pub async fn insert(&self, table: &str, fields: Fields) -> Result<Record> {
        let decl = self.declaration.table(table)?;
        validate(decl, &fields)?;

        let id = RecordId::generate(table).to_id_string();
        let now = now_millis();

        let mut columns: Vec<&str> = vec!["id", "metadata", "createdAt", "updatedAt"];
        let mut params = vec![
            SqlValue::Text(id.clone()),
            encode_metadata(&Map::new()),
            SqlValue::Integer(now),
            SqlValue::Integer(now),
        ];
        for (name, stored) in coerce::storage_columns(decl, &fields) {
            columns.push(name);
            params.push(stored);
        }

        self.adapter.run(&sql::insert(table, &columns), &params).await?;
        tracing::debug!("Inserted {}", id);

        self.propagate(table, &id, &fields).await;

        let row: RawRow = columns.iter().map(|c| c.to_string()).zip(params).collect();
        let record = coerce::hydrate(decl, row);
        Ok(self.expand(record).await)
    }

    /// Fetch a record by id with relations expanded
    pub async fn get(&self, id: &str) -> Result<Record> {
        self.get_with(id, true).await
    }

    /// Fetch a record by id; `expand = false` returns raw relation ids
    pub async fn get_with(&self, id: &str, expand: bool) -> Result<Record> {
        let record_id = RecordId::parse(id)?;
        let decl = self.declaration.table(&record_id.table)?;

        let row = self
            .adapter
            .get(&sql::select_by_id(&record_id.table), &[SqlValue::Text(id.to_string())])
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let record = coerce::hydrate(decl, row);
        if expand {
            Ok(self.expand(record).await)
        } else {
            Ok(record)
        }
    }

    /// Every record of `table`, in storage order, with relations expanded
    pub async fn list(&self, table: &str) -> Result<Vec<Record>> {
        self.list_with(table, true).await
    }

    pub async fn list_with(&self, table: &str, expand: bool) -> Result<Vec<Record>> {
        let decl = self.declaration.table(table)?;
        let rows = self.adapter.all(&sql::select_all(table), &[]).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = coerce::hydrate(decl, row);
            // Each root gets its own visited set
            let record = if expand { self.expand(record).await } else { record };
            records.push(record);
        }
        Ok(records)
    }

    /// Rewrite a whole record; returns it with relations expanded.
    ///
    /// Undeclared fields are stripped after validation and absent declared
    /// fields are reset to their defaults. `createdAt` is never written.
    pub async fn update(&self, record: Record) -> Result<Record> {
        self.update_record(record, true).await
    }

    pub(crate) fn update_record(&self, record: Record, expand: bool) -> BoxFuture<'_, Result<Record>> {
        Box::pin(async move {
            if record.id.is_empty() {
                return Err(Error::MissingId);
            }
            let record_id = RecordId::parse(&record.id)?;
            let table = record_id.table.as_str();
            let decl = self.declaration.table(table)?;

            validate(decl, &record.fields)?;

            let Record { id, metadata, created_at, fields, .. } = record;
            let fields: Fields = fields.into_iter().filter(|(name, _)| decl.contains(name)).collect();
            let now = now_millis();

            let mut columns: Vec<&str> = vec!["metadata", "updatedAt"];
            let mut params = vec![encode_metadata(&metadata), SqlValue::Integer(now)];
            for (name, stored) in coerce::storage_columns(decl, &fields) {
                columns.push(name);
                params.push(stored);
            }

            let mut bound = params.clone();
            bound.push(SqlValue::Text(id.clone()));
            self.adapter.run(&sql::update_by_id(table, &columns), &bound).await?;
            tracing::debug!("Updated {}", id);

            self.propagate(table, &id, &fields).await;

            let mut row: RawRow = columns.iter().map(|c| c.to_string()).zip(params).collect();
            row.insert("id".to_string(), SqlValue::Text(id));
            row.insert("createdAt".to_string(), SqlValue::Integer(created_at.timestamp_millis()));

            let updated = coerce::hydrate(decl, row);
            if expand {
                Ok(self.expand(updated).await)
            } else {
                Ok(updated)
            }
        })
    }

    /// Remove a record by id.
    ///
    /// Does not cascade and leaves back-references in other tables dangling.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let record_id = RecordId::parse(id)?;
        self.declaration.table(&record_id.table)?;
        self.adapter
            .run(&sql::delete_by_id(&record_id.table), &[SqlValue::Text(id.to_string())])
            .await?;
        tracing::debug!("Deleted {}", id);
        Ok(())
    }

    /// Close the underlying storage adapter
    pub async fn close(&self) -> Result<()> {
        self.adapter.close().await
    }
}

/// Current time truncated to what storage keeps
fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
