//! SQLite store (the local source).
//!
//! Uses SQLx with a single pooled connection. One connection keeps
//! `sqlite::memory:` databases alive for the lifetime of the store and matches
//! the strictly sequential pipeline.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::core::traits::{ColumnInfo, RecordOutcome, Statement, Store};
use crate::core::value::{Row, SqlNullType, SqlValue};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// SQLite implementation of [`Store`].
pub struct SqliteStore {
    pool: SqlitePool,
    label: String,
}

impl SqliteStore {
    /// Open an existing database file.
    pub async fn open(path: impl AsRef<Path>, label: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MigrateError::source_unavailable(
                "database file not found",
                format!("opening SQLite store {}", path.display()),
            ));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false);
        Self::connect(
            options,
            label.into(),
            path.display().to_string(),
            |e, ctx| MigrateError::source_unavailable(e, ctx),
        )
        .await
    }

    /// Open a database file as a load or link target, creating it when absent.
    pub async fn create(path: impl AsRef<Path>, label: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(
            options,
            label.into(),
            path.display().to_string(),
            |e, ctx| MigrateError::target_unavailable(e, ctx),
        )
        .await
    }

    /// Private in-memory database.
    pub async fn in_memory(label: impl Into<String>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| MigrateError::source_unavailable(e, "configuring in-memory SQLite"))?;
        Self::connect(
            options,
            label.into(),
            ":memory:".to_string(),
            |e, ctx| MigrateError::source_unavailable(e, ctx),
        )
        .await
    }

    /// `unavailable` builds the error for the side this store plays.
    async fn connect(
        options: SqliteConnectOptions,
        label: String,
        location: String,
        unavailable: fn(sqlx::Error, String) -> MigrateError,
    ) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| unavailable(e, format!("opening SQLite store {}", location)))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| unavailable(e, format!("testing SQLite store {}", location)))?;

        info!("Opened SQLite store {} ({})", label, location);
        Ok(Self { pool, label })
    }

    fn context(&self, what: &str) -> String {
        format!("{} on {}", what, self.label)
    }
}

/// Bind values in placeholder order.
fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            SqlValue::Null(_) => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Timestamp(t) => query.bind(t.to_rfc3339()),
        };
    }
    query
}

/// Decode a row by the storage class of each value.
///
/// SQLite column types are advisory, so the runtime storage class decides
/// the decoded type, not the declared column type.
fn decode_row(row: &SqliteRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        out.push(column.name(), decode_value(row, column.ordinal()));
    }
    out
}

fn decode_value(row: &SqliteRow, idx: usize) -> SqlValue {
    let storage = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return SqlValue::Null(SqlNullType::Text),
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return SqlValue::Null(SqlNullType::Text),
    };

    match storage.as_str() {
        "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => row
            .try_get_unchecked::<i64, _>(idx)
            .map(SqlValue::Int)
            .unwrap_or(SqlValue::Null(SqlNullType::Int)),
        "REAL" | "NUMERIC" => row
            .try_get_unchecked::<f64, _>(idx)
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null(SqlNullType::Float)),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(idx)
            .map(|b| SqlValue::Text(String::from_utf8_lossy(&b).into_owned()))
            .unwrap_or(SqlValue::Null(SqlNullType::Text)),
        _ => row
            .try_get_unchecked::<String, _>(idx)
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null(SqlNullType::Text)),
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::source_unavailable(e, self.context("ping")))?;
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, self.context("checking table existence")))?;
        Ok(row.is_some())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = sqlx::query("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, self.context("loading columns")))?;

        // Declared lengths are not enforced by SQLite, so every column is
        // reported unbounded.
        let columns = rows
            .iter()
            .map(|row| ColumnInfo {
                name: row.try_get::<String, _>(0).unwrap_or_default(),
                data_type: row.try_get::<String, _>(1).unwrap_or_default(),
                max_length: None,
            })
            .collect::<Vec<_>>();

        debug!("Loaded {} columns for {}", columns.len(), table);
        Ok(columns)
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, self.context(sql)))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, self.context(sql)))?;
        Ok(result.rows_affected())
    }

    async fn execute_atomic(&self, statements: &[String]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrateError::query(e, self.context("beginning transaction")))?;

        for sql in statements {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrateError::query(e, self.context(sql)))?;
        }

        tx.commit()
            .await
            .map_err(|e| MigrateError::query(e, self.context("committing transaction")))?;
        Ok(())
    }

    async fn insert_batch(&self, statements: &[Statement]) -> Result<Vec<RecordOutcome>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrateError::query(e, self.context("beginning batch")))?;
        let mut outcomes = Vec::with_capacity(statements.len());

        for stmt in statements {
            sqlx::query("SAVEPOINT record")
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrateError::query(e, self.context("creating savepoint")))?;

            let result = bind_all(sqlx::query(&stmt.sql), &stmt.params)
                .fetch_optional(&mut *tx)
                .await;

            match result {
                Ok(row) => {
                    outcomes.push(Ok(row.as_ref().map(decode_row).and_then(|r| r.int("id"))));
                }
                Err(e) => {
                    sqlx::query("ROLLBACK TO SAVEPOINT record")
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| MigrateError::query(e, self.context("rolling back record")))?;
                    outcomes.push(Err(e.to_string()));
                }
            }

            sqlx::query("RELEASE SAVEPOINT record")
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrateError::query(e, self.context("releasing savepoint")))?;
        }

        tx.commit()
            .await
            .map_err(|e| MigrateError::query(e, self.context("committing batch")))?;
        Ok(outcomes)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
