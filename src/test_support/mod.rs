//! Container helpers shared by the database integration tests.

pub(crate) mod postgres;
pub(crate) mod runtime;

use uuid::Uuid;

pub(crate) fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Splits a schema file into individual statements.
/// Assumes every statement ends with `;` at the end of a line.
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sql_statements_skips_comments() {
        let sql = "-- header; not a statement\nCREATE TABLE a (\n  id INT\n);\n\nCREATE INDEX b ON a (id);\n";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
        assert_eq!(statements[1], "CREATE INDEX b ON a (id);");
    }

    #[test]
    fn schema_declares_catalog_backstops() {
        let schema = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));
        assert!(schema.contains("authors_name_lower_idx ON authors (lower(name))"));
        assert!(schema.contains("CONSTRAINT categories_parent_id_fkey"));
        assert!(schema.contains("CHECK (level >= 0)"));
        assert!(split_sql_statements(schema).len() >= 10);
    }
}
