use crate::{OutputMode, emit_success};
use anyhow::Context;
use owo_colors::OwoColorize;
use quickorm::config::{self, QuickormConfig, DEFAULT_MAX_DEPTH};
use quickorm::mapper::migrate;
use quickorm::record::fields_from_json;
use quickorm::ui::{self, section, success, Icons};
use quickorm::{DatabaseDeclaration, Record, RecordMapper, StorageAdapter};
use std::path::Path;

const STARTER_SCHEMA: &str = r#"[post]
title = "text"
body = "long text"
author = { type = "one-to-one", ref = "user" }

[user]
email = "text"
posts = { type = "one-to-many", ref = "post" }
"#;

pub fn run_init(output_mode: OutputMode, config_path: &Path, force: bool) -> anyhow::Result<()> {
    let config = QuickormConfig {
        database: Some(config::default_database_path().display().to_string()),
        schema: Some(config::default_schema_path().display().to_string()),
        max_depth: Some(DEFAULT_MAX_DEPTH),
    };
    config::write_config(config_path, &config, force)?;

    let schema_path = config::default_schema_path();
    let wrote_schema = !schema_path.exists();
    if wrote_schema {
        std::fs::write(&schema_path, STARTER_SCHEMA)
            .with_context(|| format!("failed to write {}", schema_path.display()))?;
    }

    if output_mode.is_human() {
        success(&format!("Wrote {}", config_path.display()));
        if wrote_schema {
            println!("{} Starter schema: {}", Icons::NEW, schema_path.display());
        }
    } else {
        let data = serde_json::json!({
            "config": config_path.display().to_string(),
            "schema": wrote_schema.then(|| schema_path.display().to_string()),
        });
        emit_success(output_mode, "init", data)?;
    }
    Ok(())
}

pub fn run_schema(output_mode: OutputMode, declaration: &DatabaseDeclaration, only: Option<&str>) -> anyhow::Result<()> {
    if let Some(name) = only {
        declaration.table(name)?;
    }
    let selected: Vec<_> = declaration
        .tables()
        .filter(|(name, _)| only.is_none_or(|wanted| wanted == *name))
        .collect();

    if output_mode.is_human() {
        for (name, table) in selected {
            section(&format!(" {} {} ", Icons::TABLE, name));
            if table.is_empty() {
                println!("  {}", ui::muted("(no fields)"));
            } else {
                println!("{}", ui::schema_table(table));
            }
        }
    } else {
        let data: serde_json::Map<String, serde_json::Value> = selected
            .into_iter()
            .map(|(name, table)| Ok((name.to_string(), serde_json::to_value(table)?)))
            .collect::<anyhow::Result<_>>()?;
        emit_success(output_mode, "schema", data)?;
    }
    Ok(())
}

pub async fn run_migrate(
    output_mode: OutputMode,
    adapter: &dyn StorageAdapter,
    declaration: &DatabaseDeclaration,
) -> anyhow::Result<()> {
    let report = migrate::run(adapter, declaration).await?;

    if output_mode.is_human() {
        println!("{}", report);
        if report.is_noop() {
            success("Schema up to date");
        } else {
            success(&format!("Added {} column(s)", report.added_columns.len()));
        }
    } else {
        emit_success(output_mode, "migrate", &report)?;
    }
    Ok(())
}

pub async fn run_insert(output_mode: OutputMode, mapper: &RecordMapper, table: &str, data: &str) -> anyhow::Result<()> {
    let json: serde_json::Value = serde_json::from_str(data).context("--data is not valid JSON")?;
    let fields = fields_from_json(mapper.declaration().table(table)?, json)?;
    let record = mapper.insert(table, fields).await?;
    show_record(output_mode, "insert", &record, "Inserted")
}

pub async fn run_get(output_mode: OutputMode, mapper: &RecordMapper, id: &str, expand: bool) -> anyhow::Result<()> {
    let record = mapper.get_with(id, expand).await?;
    show_record(output_mode, "get", &record, "Record")
}

pub async fn run_list(output_mode: OutputMode, mapper: &RecordMapper, table: &str, expand: bool) -> anyhow::Result<()> {
    let records = mapper.list_with(table, expand).await?;

    if output_mode.is_human() {
        if records.is_empty() {
            println!("{} No records in {}", Icons::INFO, table.bold());
        }
        for record in &records {
            section(&format!(" {} ", record.id));
            println!("{}", ui::record_table(record));
        }
        ui::summary_row("Total:", &records.len().to_string());
    } else {
        emit_success(output_mode, "list", &records)?;
    }
    Ok(())
}

pub async fn run_update(output_mode: OutputMode, mapper: &RecordMapper, data: &str) -> anyhow::Result<()> {
    let json: serde_json::Value = serde_json::from_str(data).context("--data is not valid JSON")?;
    let record = Record::from_json(mapper.declaration(), json)?;
    let record = mapper.update(record).await?;
    show_record(output_mode, "update", &record, "Updated")
}

pub async fn run_delete(output_mode: OutputMode, mapper: &RecordMapper, id: &str) -> anyhow::Result<()> {
    mapper.delete(id).await?;

    if output_mode.is_human() {
        println!("{} Deleted {}", Icons::DEL.style(ui::theme().error.clone()), id);
    } else {
        emit_success(output_mode, "delete", serde_json::json!({ "id": id }))?;
    }
    Ok(())
}

fn show_record(output_mode: OutputMode, command: &str, record: &Record, label: &str) -> anyhow::Result<()> {
    if output_mode.is_human() {
        success(&format!("{} {}", label, record.id.bold()));
        println!("{}", ui::record_table(record));
    } else {
        emit_success(output_mode, command, record)?;
    }
    Ok(())
}
