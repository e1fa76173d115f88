//! SQL dialect differences between the two stores.
//!
//! Only the differences the pipeline needs are modelled: parameter
//! placeholders, column type names and the surrogate key declaration.

use crate::core::schema::{ColumnKind, TableDef};
use crate::core::traits::Statement;
use crate::core::value::SqlValue;

/// SQL dialect of a [`Store`](crate::core::traits::Store).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
        }
    }

    /// Quote an identifier. Both dialects use double quotes.
    pub fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Placeholder for the 1-based parameter `idx` bound to `value`.
    ///
    /// PostgreSQL placeholders carry an explicit cast so NULLs and integers
    /// bind with a known type; assignment casts convert to the column type.
    pub fn placeholder(&self, idx: usize, value: &SqlValue) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", idx),
            Dialect::Postgres => format!("${}{}", idx, value.pg_cast()),
        }
    }

    /// Column type for a logical column kind.
    pub fn column_type(&self, kind: ColumnKind) -> &'static str {
        match (self, kind) {
            (Dialect::Sqlite, ColumnKind::Id) => "INTEGER PRIMARY KEY AUTOINCREMENT",
            (Dialect::Postgres, ColumnKind::Id) => "SERIAL PRIMARY KEY",
            (_, ColumnKind::Text) => "TEXT",
            (_, ColumnKind::Integer) => "INTEGER",
            (Dialect::Sqlite, ColumnKind::Float) => "REAL",
            (Dialect::Postgres, ColumnKind::Float) => "DOUBLE PRECISION",
            (_, ColumnKind::Bool) => "BOOLEAN",
            (Dialect::Sqlite, ColumnKind::Timestamp) => "TIMESTAMP",
            (Dialect::Postgres, ColumnKind::Timestamp) => "TIMESTAMPTZ",
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` for a table definition.
    pub fn create_table(&self, def: &TableDef) -> String {
        let mut parts: Vec<String> = def
            .columns
            .iter()
            .map(|c| {
                let mut part = format!(
                    "{} {}",
                    self.quote_ident(c.name),
                    self.column_type(c.kind)
                );
                if c.not_null {
                    part.push_str(" NOT NULL");
                }
                if c.unique {
                    part.push_str(" UNIQUE");
                }
                if let Some(parent) = c.references {
                    part.push_str(&format!(" REFERENCES {}(\"id\")", self.quote_ident(parent)));
                }
                part
            })
            .collect();

        if !def.unique_together.is_empty() {
            let cols: Vec<String> = def
                .unique_together
                .iter()
                .map(|c| self.quote_ident(c))
                .collect();
            parts.push(format!("UNIQUE ({})", cols.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quote_ident(def.name),
            parts.join(", ")
        )
    }

    /// `INSERT ... RETURNING id` for one record.
    pub fn insert_returning_id(&self, table: &str, fields: Vec<(&str, SqlValue)>) -> Statement {
        let mut columns = Vec::with_capacity(fields.len());
        let mut placeholders = Vec::with_capacity(fields.len());
        let mut params = Vec::with_capacity(fields.len());

        for (idx, (column, value)) in fields.into_iter().enumerate() {
            columns.push(self.quote_ident(column));
            placeholders.push(self.placeholder(idx + 1, &value));
            params.push(value);
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING \"id\"",
            self.quote_ident(table),
            columns.join(", "),
            placeholders.join(", ")
        );

        Statement::new(sql, params)
    }

    /// `SELECT *` ordered by id.
    pub fn select_all(&self, table: &str) -> String {
        format!("SELECT * FROM {} ORDER BY \"id\"", self.quote_ident(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::SKILL_RESOURCES;
    use crate::core::value::SqlNullType;

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Sqlite.placeholder(3, &SqlValue::Int(1)), "?3");
        assert_eq!(
            Dialect::Postgres.placeholder(2, &SqlValue::Null(SqlNullType::Float)),
            "$2::double precision"
        );
    }

    #[test]
    fn test_create_table_declares_keys() {
        let sql = Dialect::Postgres.create_table(&SKILL_RESOURCES);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"skill_resources\""));
        assert!(sql.contains("\"id\" SERIAL PRIMARY KEY"));
        assert!(sql.contains("\"skill_id\" INTEGER NOT NULL REFERENCES \"emerging_skills\"(\"id\")"));
        assert!(sql.contains("UNIQUE (\"skill_id\", \"resource_id\")"));

        let sql = Dialect::Sqlite.create_table(&SKILL_RESOURCES);
        assert!(sql.contains("INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"relevance_score\" REAL"));
    }

    #[test]
    fn test_insert_returning_id() {
        let stmt = Dialect::Postgres.insert_returning_id(
            "quiz_attempts",
            vec![
                ("resource_id", SqlValue::Int(4)),
                ("answers", SqlValue::opt_text(None)),
            ],
        );
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"quiz_attempts\" (\"resource_id\", \"answers\") VALUES ($1::bigint, $2::text) RETURNING \"id\""
        );
        assert_eq!(stmt.params.len(), 2);
    }
}
