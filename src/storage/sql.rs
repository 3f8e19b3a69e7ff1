//! SQL statement text generated from the declaration

use crate::column::ColumnType;
use crate::schema::TableDeclaration;

/// System columns every table starts with
pub const SYSTEM_COLUMNS: &[&str] = &[
    "\"id\" TEXT PRIMARY KEY",
    "\"metadata\" TEXT",
    "\"createdAt\" INTEGER",
    "\"updatedAt\" INTEGER",
];

/// Quote an identifier so keyword-named tables and fields stay usable.
///
/// Declared names are plain identifiers, so no escaping is needed.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

/// `CREATE TABLE IF NOT EXISTS` with system columns plus one column per field
pub fn create_table(table: &str, decl: &TableDeclaration) -> String {
    let mut columns: Vec<String> = SYSTEM_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(decl.fields().map(|(name, column)| format!("{} {}", quote(name), column.sql_type())));
    format!("CREATE TABLE IF NOT EXISTS {} ({})", quote(table), columns.join(", "))
}

/// Additive migration for one missing field
pub fn add_column(table: &str, field: &str, column: &ColumnType) -> String {
    format!("ALTER TABLE {} ADD COLUMN {} {}", quote(table), quote(field), column.sql_type())
}

/// Live column listing; rows carry a `name` column
pub fn table_info(table: &str) -> String {
    format!("PRAGMA table_info({})", quote(table))
}

pub fn select_all(table: &str) -> String {
    format!("SELECT * FROM {}", quote(table))
}

pub fn select_by_id(table: &str) -> String {
    format!("SELECT * FROM {} WHERE \"id\" = ?", quote(table))
}

pub fn insert(table: &str, columns: &[&str]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!("INSERT INTO {} ({}) VALUES ({})", quote(table), names.join(", "), placeholders)
}

/// `UPDATE ... SET col = ?, ... WHERE id = ?`; the id binds last
pub fn update_by_id(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns.iter().map(|c| format!("{} = ?", quote(c))).collect();
    format!("UPDATE {} SET {} WHERE \"id\" = ?", quote(table), assignments.join(", "))
}

pub fn delete_by_id(table: &str) -> String {
    format!("DELETE FROM {} WHERE \"id\" = ?", quote(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ScalarKind;

    #[test]
    fn test_create_table() {
        let decl = TableDeclaration::new()
            .field("title", ColumnType::text())
            .field("score", ColumnType::Scalar(ScalarKind::Number))
            .field("published", ColumnType::Scalar(ScalarKind::Date))
            .field("author", ColumnType::one_to_one("user"));
        assert_eq!(
            create_table("post", &decl),
            r#"CREATE TABLE IF NOT EXISTS "post" ("id" TEXT PRIMARY KEY, "metadata" TEXT, "createdAt" INTEGER, "updatedAt" INTEGER, "title" TEXT, "score" REAL, "published" INTEGER, "author" TEXT)"#
        );
    }

    #[test]
    fn test_write_statements() {
        assert_eq!(insert("user", &["id", "email"]), r#"INSERT INTO "user" ("id", "email") VALUES (?, ?)"#);
        assert_eq!(
            update_by_id("user", &["email", "updatedAt"]),
            r#"UPDATE "user" SET "email" = ?, "updatedAt" = ? WHERE "id" = ?"#
        );
        assert_eq!(delete_by_id("user"), r#"DELETE FROM "user" WHERE "id" = ?"#);
        assert_eq!(
            add_column("user", "age", &ColumnType::Scalar(ScalarKind::Number)),
            r#"ALTER TABLE "user" ADD COLUMN "age" REAL"#
        );
    }

    #[test]
    fn test_keyword_names_are_quoted() {
        assert_eq!(select_all("order"), r#"SELECT * FROM "order""#);
        assert_eq!(table_info("group"), r#"PRAGMA table_info("group")"#);
    }
}
