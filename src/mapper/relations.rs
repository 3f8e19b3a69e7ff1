//! Relationship engine
//!
//! Two halves:
//! - propagation: after a write, point the other side of each declared
//!   relationship back at the written record
//! - expansion: on read, replace raw ids with nested records up to
//!   `max_depth` hops, never revisiting a record within one expansion

use std::collections::HashSet;
use serde_json::Value as JsonValue;
use crate::Result;
use crate::column::RelationKind;
use crate::record::{Fields, Record, Value};
use crate::record_id::RecordId;
use crate::schema::DatabaseDeclaration;
use super::{BoxFuture, RecordMapper};

/// A relation field of a written record that names a target record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub field: &'a str,
    pub target_table: &'a str,
    pub target_id: String,
}

/// Relation fields in `fields` that carry a single id of their target table.
///
/// Lists are not followed, so one-to-many input arrays never propagate.
pub fn references<'a>(declaration: &'a DatabaseDeclaration, table: &str, fields: &Fields) -> Vec<Reference<'a>> {
    let Ok(decl) = declaration.table(table) else {
        return Vec::new();
    };

    decl.relations()
        .filter_map(|(field, _, target_table)| {
            let value = fields.get(field)?;
            if matches!(value, Value::List(_)) {
                return None;
            }
            let target_id = value.reference_id()?;
            if RecordId::table_of(target_id) != Some(target_table) {
                return None;
            }
            Some(Reference { field, target_table, target_id: target_id.to_string() })
        })
        .collect()
}

/// Ids stored in a raw one-to-many value, in order
pub fn parse_id_list(raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    JsonValue::String(s) => Some(s),
                    JsonValue::Object(mut obj) => match obj.remove("id") {
                        Some(JsonValue::String(s)) => Some(s),
                        _ => None,
                    },
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

impl RecordMapper {
    /// Write the back-reference on every record `fields` points at.
    ///
    /// Failures are logged and skipped; the primary write has already landed.
    pub(crate) async fn propagate(&self, table: &str, id: &str, fields: &Fields) {
        for reference in references(&self.declaration, table, fields) {
            for (back_field, kind) in self.declaration.back_references(reference.target_table, table) {
                if let Err(e) = self.propagate_one(&reference.target_id, back_field, kind, id).await {
                    tracing::warn!(
                        "Failed to update {}.{} on {} for {}.{}: {}",
                        reference.target_table, back_field, reference.target_id, table, reference.field, e
                    );
                }
            }
        }
    }

    async fn propagate_one(&self, target_id: &str, back_field: &str, kind: RelationKind, source_id: &str) -> Result<()> {
        let mut target = self.get_with(target_id, false).await?;

        match kind {
            RelationKind::OneToOne => {
                if target.text(back_field) == Some(source_id) {
                    return Ok(());
                }
                target.set(back_field, source_id);
            }
            RelationKind::OneToMany => {
                let mut ids = match target.get(back_field) {
                    Some(Value::Text(raw)) => parse_id_list(raw).unwrap_or_else(|| {
                        tracing::warn!("{}.{} is not a JSON id array, starting over", target_id, back_field);
                        Vec::new()
                    }),
                    _ => Vec::new(),
                };
                if ids.iter().any(|existing| existing == source_id) {
                    return Ok(());
                }
                ids.push(source_id.to_string());
                target.set(back_field, JsonValue::from(ids).to_string());
            }
        }

        tracing::debug!("Back-reference {}.{} -> {}", target_id, back_field, source_id);
        self.update_record(target, false).await?;
        Ok(())
    }

    /// Expand relation fields of a root record
    pub(crate) async fn expand(&self, record: Record) -> Record {
        let mut visited = HashSet::from([record.id.clone()]);
        self.fetch_relations(record, 0, &mut visited).await
    }

    fn fetch_relations<'a>(
        &'a self,
        mut record: Record,
        depth: usize,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Record> {
        Box::pin(async move {
            if depth >= self.options.max_depth {
                return record;
            }
            let Some(table) = record.table().map(str::to_string) else {
                return record;
            };
            let Ok(decl) = self.declaration.table(&table) else {
                return record;
            };
            let relations: Vec<(String, RelationKind)> = decl
                .relations()
                .map(|(field, kind, _)| (field.to_string(), kind))
                .collect();

            for (field, kind) in relations {
                let Some(Value::Text(raw)) = record.get(&field).cloned() else {
                    continue;
                };
                if raw.is_empty() {
                    continue;
                }
                match kind {
                    RelationKind::OneToOne => {
                        if visited.contains(&raw) {
                            continue;
                        }
                        match self.resolve_reference(&raw, depth, visited).await {
                            Ok(nested) => record.set(field, Value::Record(Box::new(nested))),
                            Err(e) => tracing::warn!("Could not expand {}.{} ({}): {}", record.id, field, raw, e),
                        }
                    }
                    RelationKind::OneToMany => {
                        let ids = match serde_json::from_str::<JsonValue>(&raw) {
                            Ok(JsonValue::Array(_)) => parse_id_list(&raw).unwrap_or_default(),
                            // Valid JSON of another shape stays raw
                            Ok(_) => continue,
                            // A bare id
                            Err(_) => vec![raw.clone()],
                        };

                        let mut items = Vec::with_capacity(ids.len());
                        for id in ids {
                            if visited.contains(&id) {
                                continue;
                            }
                            match self.resolve_reference(&id, depth, visited).await {
                                Ok(nested) => items.push(Value::Record(Box::new(nested))),
                                Err(e) => tracing::warn!("Skipping {} in {}.{}: {}", id, record.id, field, e),
                            }
                        }
                        record.set(field, Value::List(items));
                    }
                }
            }

            record
        })
    }

    async fn resolve_reference(&self, id: &str, depth: usize, visited: &mut HashSet<String>) -> Result<Record> {
        let nested = self.get_with(id, false).await?;
        visited.insert(id.to_string());
        Ok(self.fetch_relations(nested, depth + 1, visited).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::blog;

    #[test]
    fn test_references_follow_matching_ids() {
        let decl = blog();
        let mut fields = Fields::new();
        fields.insert("title".into(), Value::from("Hello"));
        fields.insert("author".into(), Value::from("user_abc"));

        let refs = references(&decl, "post", &fields);
        assert_eq!(
            refs,
            vec![Reference { field: "author", target_table: "user", target_id: "user_abc".into() }]
        );
    }

    #[test]
    fn test_references_skip_lists_and_foreign_ids() {
        let decl = blog();
        let mut fields = Fields::new();
        fields.insert("posts".into(), Value::List(vec![Value::from("post_1")]));
        assert!(references(&decl, "user", &fields).is_empty());

        let mut fields = Fields::new();
        fields.insert("author".into(), Value::from("post_1"));
        assert!(references(&decl, "post", &fields).is_empty());

        let mut fields = Fields::new();
        fields.insert("author".into(), Value::Null);
        assert!(references(&decl, "post", &fields).is_empty());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list(r#"["a_1","b_2"]"#), Some(vec!["a_1".to_string(), "b_2".to_string()]));
        assert_eq!(parse_id_list(r#"[{"id":"a_1"}, 3]"#), Some(vec!["a_1".to_string()]));
        assert_eq!(parse_id_list("post_1"), None);
        assert_eq!(parse_id_list(r#"{"id":"a_1"}"#), None);
    }
}
