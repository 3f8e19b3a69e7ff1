//! Schema model - declared tables, their fields and relation back-references

use crate::column::{ColumnType, RelationKind};
use crate::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde::ser::SerializeMap;
use std::fmt;
use std::marker::PhantomData;

/// System fields present on every record; never declarable
pub const RESERVED_FIELDS: &[&str] = &["id", "metadata", "createdAt", "updatedAt"];

/// Check if a field name is one of the system fields
pub fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Ordered field → type list of a single table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDeclaration {
    fields: Vec<(String, ColumnType)>,
}

impl TableDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field declaration
    pub fn field(mut self, name: impl Into<String>, column: ColumnType) -> Self {
        self.fields.push((name.into(), column));
        self
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ColumnType)> {
        self.fields.iter().map(|(name, column)| (name.as_str(), column))
    }

    /// Declared relation fields, in declaration order
    pub fn relations(&self) -> impl Iterator<Item = (&str, RelationKind, &str)> {
        self.fields
            .iter()
            .filter_map(|(name, column)| column.relation().map(|(kind, target)| (name.as_str(), kind, target)))
    }

    /// Look up a field's type
    pub fn column(&self, name: &str) -> Option<&ColumnType> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, column)| column)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// All declared tables. Immutable once a mapper is built on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseDeclaration {
    tables: Vec<(String, TableDeclaration)>,
}

impl DatabaseDeclaration {
    /// Build a declaration, rejecting names the storage layer cannot carry
    pub fn new<N: Into<String>>(tables: impl IntoIterator<Item = (N, TableDeclaration)>) -> Result<Self> {
        let declaration = Self {
            tables: tables.into_iter().map(|(name, table)| (name.into(), table)).collect(),
        };
        declaration.check()?;
        Ok(declaration)
    }

    fn check(&self) -> Result<()> {
        for (i, (table_name, table)) in self.tables.iter().enumerate() {
            // Ids are "{table}_{uuid}" and split on the first underscore
            if !is_identifier(table_name) || table_name.contains('_') {
                return Err(Error::InvalidDeclaration(format!(
                    "table name \"{}\" must be alphanumeric and contain no underscore",
                    table_name
                )));
            }
            if self.tables[..i].iter().any(|(other, _)| other == table_name) {
                return Err(Error::InvalidDeclaration(format!("duplicate table \"{}\"", table_name)));
            }

            for (j, (field_name, column)) in table.fields.iter().enumerate() {
                if is_reserved(field_name) {
                    return Err(Error::InvalidDeclaration(format!(
                        "field \"{}.{}\" uses a reserved name",
                        table_name, field_name
                    )));
                }
                if !is_identifier(field_name) {
                    return Err(Error::InvalidDeclaration(format!(
                        "field name \"{}.{}\" is not a valid identifier",
                        table_name, field_name
                    )));
                }
                if table.fields[..j].iter().any(|(other, _)| other == field_name) {
                    return Err(Error::InvalidDeclaration(format!(
                        "duplicate field \"{}.{}\"",
                        table_name, field_name
                    )));
                }
                if let Some((_, target)) = column.relation() {
                    if !self.contains(target) {
                        return Err(Error::InvalidDeclaration(format!(
                            "field \"{}.{}\" references undeclared table \"{}\"",
                            table_name, field_name, target
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Declared tables, in declaration order
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableDeclaration)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    /// Look up a table, failing with `UnknownTable`
    pub fn table(&self, name: &str) -> Result<&TableDeclaration> {
        self.tables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, table)| table)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|(n, _)| n == name)
    }

    /// Fields of `table` whose relation points at `source`
    pub fn back_references(&self, table: &str, source: &str) -> Vec<(&str, RelationKind)> {
        match self.table(table) {
            Ok(decl) => decl
                .relations()
                .filter(|(_, _, target)| *target == source)
                .map(|(name, kind, _)| (name, kind))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Collects a map in document order
struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            entries.push((key, value));
        }
        Ok(entries)
    }
}

impl<'de> Deserialize<'de> for TableDeclaration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = deserializer.deserialize_map(OrderedMapVisitor::<ColumnType>(PhantomData))?;
        Ok(Self { fields })
    }
}

impl<'de> Deserialize<'de> for DatabaseDeclaration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tables = deserializer.deserialize_map(OrderedMapVisitor::<TableDeclaration>(PhantomData))?;
        Self::new(tables).map_err(serde::de::Error::custom)
    }
}

impl Serialize for TableDeclaration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, column) in &self.fields {
            map.serialize_entry(name, column)?;
        }
        map.end()
    }
}

impl Serialize for DatabaseDeclaration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for (name, table) in &self.tables {
            map.serialize_entry(name, table)?;
        }
        map.end()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::column::ScalarKind;

    pub(crate) fn blog() -> DatabaseDeclaration {
        DatabaseDeclaration::new([
            (
                "post",
                TableDeclaration::new()
                    .field("title", ColumnType::text())
                    .field("body", ColumnType::Scalar(ScalarKind::LongText))
                    .field("author", ColumnType::one_to_one("user"))
                    .field("image", ColumnType::Scalar(ScalarKind::Image)),
            ),
            (
                "user",
                TableDeclaration::new()
                    .field("email", ColumnType::text())
                    .field("password", ColumnType::text())
                    .field("posts", ColumnType::one_to_many("post")),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_back_references() {
        let decl = blog();
        assert_eq!(decl.back_references("user", "post"), vec![("posts", RelationKind::OneToMany)]);
        assert_eq!(decl.back_references("post", "user"), vec![("author", RelationKind::OneToOne)]);
        assert!(decl.back_references("post", "post").is_empty());
        assert!(decl.back_references("comment", "post").is_empty());
    }

    #[test]
    fn test_unknown_table() {
        let decl = blog();
        assert!(matches!(decl.table("comment"), Err(Error::UnknownTable(t)) if t == "comment"));
    }

    #[test]
    fn test_rejects_reserved_and_bad_names() {
        let reserved = DatabaseDeclaration::new([("user", TableDeclaration::new().field("createdAt", ColumnType::text()))]);
        assert!(matches!(reserved, Err(Error::InvalidDeclaration(_))));

        let underscore = DatabaseDeclaration::new([("blog_post", TableDeclaration::new())]);
        assert!(matches!(underscore, Err(Error::InvalidDeclaration(_))));

        let injected = DatabaseDeclaration::new([("user", TableDeclaration::new().field("a; DROP", ColumnType::text()))]);
        assert!(matches!(injected, Err(Error::InvalidDeclaration(_))));

        let dangling = DatabaseDeclaration::new([("post", TableDeclaration::new().field("author", ColumnType::one_to_one("user")))]);
        assert!(matches!(dangling, Err(Error::InvalidDeclaration(_))));
    }

    #[test]
    fn test_self_reference_is_legal() {
        let decl = DatabaseDeclaration::new([(
            "node",
            TableDeclaration::new()
                .field("parent", ColumnType::one_to_one("node"))
                .field("children", ColumnType::one_to_many("node")),
        )])
        .unwrap();
        assert_eq!(decl.back_references("node", "node").len(), 2);
    }

    #[test]
    fn test_deserialize_keeps_order() {
        let decl: DatabaseDeclaration = serde_json::from_str(
            r#"{
                "user": {"zeta": "text", "alpha": "number", "posts": {"type": "one-to-many", "ref": "post"}},
                "post": {"title": "text", "author": {"type": "one-to-one", "ref": "user"}}
            }"#,
        )
        .unwrap();

        let tables: Vec<_> = decl.tables().map(|(name, _)| name).collect();
        assert_eq!(tables, vec!["user", "post"]);

        let fields: Vec<_> = decl.table("user").unwrap().fields().map(|(name, _)| name).collect();
        assert_eq!(fields, vec!["zeta", "alpha", "posts"]);
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let result = serde_json::from_str::<DatabaseDeclaration>(r#"{"user": {"id": "text"}}"#);
        assert!(result.is_err());
    }
}
