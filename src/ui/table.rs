use owo_colors::OwoColorize;
use tabled::{settings::Style, Table, Tabled};
use crate::ui::theme;
use crate::record::{Record, Value};
use crate::schema::TableDeclaration;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct SchemaRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Type")]
    pub kind: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            field: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Declared fields of one table, in declaration order
pub fn schema_table(table: &TableDeclaration) -> String {
    let rows: Vec<SchemaRow> = table
        .fields()
        .map(|(name, column)| SchemaRow {
            field: name.to_string(),
            kind: column.to_string(),
        })
        .collect();

    if rows.is_empty() {
        return String::new();
    }
    Table::new(&rows).with(Style::rounded()).to_string()
}

/// One record as a two-column table; nested records collapse to their id
pub fn record_table(record: &Record) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("id", &record.id);
    builder.add_row("createdAt", &record.created_at.to_rfc3339());
    builder.add_row("updatedAt", &record.updated_at.to_rfc3339());
    if !record.metadata.is_empty() {
        builder.add_row("metadata", &serde_json::Value::Object(record.metadata.clone()).to_string());
    }
    for (name, value) in &record.fields {
        builder.add_row(name, &cell(value));
    }
    builder.build()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Text(s) => s.clone(),
        Value::Record(nested) => format!("→ {}", nested.id.style(theme().relation.clone())),
        Value::List(items) => {
            let ids: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Record(nested) => nested.id.clone(),
                    other => cell(other),
                })
                .collect();
            format!("[{}]", ids.join(", "))
        }
        other => other.to_json().to_string(),
    }
}
