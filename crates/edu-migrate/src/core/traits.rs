//! Core trait for the relational stores the pipeline reads and writes.
//!
//! Both the embedded SQLite store and the hosted PostgreSQL store implement
//! [`Store`]. Components only ever see `&dyn Store`, so the Extractor, Loader,
//! Verifier and Linker run unchanged against either side.

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::Result;

use super::value::{Row, SqlValue};

/// Column metadata as reported by the store catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared type as the store spells it.
    pub data_type: String,
    /// Declared character bound, `None` for unbounded text and non-text types.
    pub max_length: Option<i32>,
}

impl ColumnInfo {
    /// True for `varchar(n)` / `char(n)` style columns.
    pub fn is_bounded(&self) -> bool {
        matches!(self.max_length, Some(n) if n > 0)
    }
}

/// A parameterized statement executed as part of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Outcome of one statement inside [`Store::insert_batch`]: the generated id
/// on success, the driver message on failure.
pub type RecordOutcome = std::result::Result<Option<i64>, String>;

/// A relational store.
///
/// Placeholders in `sql` follow [`Store::dialect`]; build them with
/// [`Dialect::placeholder`] so the same statement text works on both sides.
#[async_trait]
pub trait Store: Send + Sync {
    /// SQL dialect of this store.
    fn dialect(&self) -> Dialect;

    /// Human label used in logs and the migration envelope.
    fn label(&self) -> &str;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<()>;

    /// Whether `table` exists in the default schema.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Columns of `table` in ordinal order. Empty when the table is absent.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Run a query and decode every row.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run a statement, returning the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run all statements in one transaction. Any failure rolls back every
    /// statement and is returned.
    async fn execute_atomic(&self, statements: &[String]) -> Result<()>;

    /// Run insert statements in one transaction, each inside its own
    /// savepoint, and commit the survivors.
    ///
    /// A statement ending in `RETURNING id` reports the generated id. A failing
    /// statement is rolled back to its savepoint and reported in place; it does
    /// not abort the batch. The returned vector is parallel to `statements`.
    async fn insert_batch(&self, statements: &[Statement]) -> Result<Vec<RecordOutcome>>;

    /// Release pooled connections.
    async fn close(&self);
}
