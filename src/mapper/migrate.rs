//! Migration-on-connect: create missing tables, add missing columns.
//!
//! Purely additive. Columns dropped from the declaration stay in the live
//! table untouched.

use std::collections::HashSet;
use serde::Serialize;
use crate::Result;
use crate::schema::DatabaseDeclaration;
use crate::storage::{sql, SqlValue, StorageAdapter};

/// What a migration pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Every declared table, ensured to exist
    pub tables: Vec<String>,
    /// `(table, column)` pairs added by `ALTER TABLE`
    pub added_columns: Vec<(String, String)>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.added_columns.is_empty()
    }
}

impl std::fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Migration:")?;
        writeln!(f, "  Tables: {}", self.tables.join(", "))?;
        if self.added_columns.is_empty() {
            write!(f, "  Added columns: none")
        } else {
            let added: Vec<String> = self
                .added_columns
                .iter()
                .map(|(table, column)| format!("{}.{}", table, column))
                .collect();
            write!(f, "  Added columns: {}", added.join(", "))
        }
    }
}

/// Bring the live store in line with the declaration
pub async fn run(adapter: &dyn StorageAdapter, declaration: &DatabaseDeclaration) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    for (table, decl) in declaration.tables() {
        adapter.run(&sql::create_table(table, decl), &[]).await?;
        tracing::info!("Table ready: {}", table);
        report.tables.push(table.to_string());
    }

    for (table, decl) in declaration.tables() {
        let live: HashSet<String> = adapter
            .all(&sql::table_info(table), &[])
            .await?
            .into_iter()
            .filter_map(|row| row.get("name").and_then(SqlValue::as_text).map(str::to_string))
            .collect();

        for (field, column) in decl.fields() {
            if live.contains(field) {
                continue;
            }
            tracing::info!("Adding missing column {} to table {}", field, table);
            adapter.run(&sql::add_column(table, field, column), &[]).await?;
            report.added_columns.push((table.to_string(), field.to_string()));
        }
    }

    Ok(report)
}
