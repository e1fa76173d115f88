use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio_postgres::config::Host;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Config as PgConfig, NoTls};
use tracing::{debug, info, warn};

use crate::core::traits::{ColumnInfo, RecordOutcome, Statement, Store};
use crate::core::value::{Row, SqlNullType, SqlValue};
use crate::dialect::Dialect;
use crate::drivers::common::{SslMode, TlsBuilder};
use crate::error::{MigrateError, Result};

/// Connection timeout for the initial connect.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL implementation of [`Store`].
pub struct PostgresStore {
    pool: Pool,
    label: String,
}

impl PostgresStore {
    /// Connect using a `postgres://` URL or key/value connection string.
    pub async fn connect(url: &str, ssl_mode: SslMode, label: impl Into<String>) -> Result<Self> {
        let mut pg_config: PgConfig = url
            .parse()
            .map_err(|e| MigrateError::Config(format!("Invalid target connection string: {}", e)))?;
        pg_config.connect_timeout(CONNECT_TIMEOUT);
        pg_config.keepalives(true);

        let target = describe(&pg_config);
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match TlsBuilder::new(ssl_mode).build()? {
            Some(tls) => {
                let mgr = Manager::from_config(pg_config, tls, mgr_config);
                Pool::builder(mgr).max_size(1).build()
            }
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
                Pool::builder(mgr).max_size(1).build()
            }
        }
        .map_err(|e| MigrateError::pool(e, "creating PostgreSQL target pool"))?;

        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::target_unavailable(e, format!("connecting to {}", target)))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| MigrateError::target_unavailable(e, format!("testing {}", target)))?;

        info!("Connected to PostgreSQL target: {} (ssl_mode={})", target, ssl_mode);

        Ok(Self {
            pool,
            label: label.into(),
        })
    }

    async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, format!("getting connection for {}", self.label)))
    }

    fn context(&self, what: &str) -> String {
        format!("{} on {}", what, self.label)
    }
}

/// Host/port/database summary without credentials.
fn describe(config: &PgConfig) -> String {
    let host = config
        .get_hosts()
        .first()
        .map(|h| match h {
            Host::Tcp(name) => name.clone(),
            #[cfg(unix)]
            Host::Unix(path) => path.display().to_string(),
        })
        .unwrap_or_else(|| "localhost".to_string());
    let port = config.get_ports().first().copied().unwrap_or(5432);
    let db = config.get_dbname().unwrap_or("postgres");
    format!("{}:{}/{}", host, port, db)
}

/// Box a value for binding. NULLs keep their type hint.
fn to_param(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null(SqlNullType::Bool) => Box::new(None::<bool>),
        SqlValue::Null(SqlNullType::Int) => Box::new(None::<i64>),
        SqlValue::Null(SqlNullType::Float) => Box::new(None::<f64>),
        SqlValue::Null(SqlNullType::Text) => Box::new(None::<String>),
        SqlValue::Null(SqlNullType::Timestamp) => Box::new(None::<DateTime<Utc>>),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::Int(i) => Box::new(*i),
        SqlValue::Float(f) => Box::new(*f),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Timestamp(t) => Box::new(*t),
    }
}

fn to_params(values: &[SqlValue]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    values.iter().map(to_param).collect()
}

fn param_refs(params: &[Box<dyn ToSql + Sync + Send>]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

fn decode_row(row: &tokio_postgres::Row) -> Row {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.push(column.name(), decode_value(row, idx, column.type_().name()));
    }
    out
}

/// Convert one column by its PostgreSQL type name.
fn decode_value(row: &tokio_postgres::Row, idx: usize, type_name: &str) -> SqlValue {
    match type_name {
        "bool" => row
            .try_get::<_, bool>(idx)
            .ok()
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null(SqlNullType::Bool)),
        "int2" => row
            .try_get::<_, i16>(idx)
            .ok()
            .map(|v| SqlValue::Int(v.into()))
            .unwrap_or(SqlValue::Null(SqlNullType::Int)),
        "int4" => row
            .try_get::<_, i32>(idx)
            .ok()
            .map(|v| SqlValue::Int(v.into()))
            .unwrap_or(SqlValue::Null(SqlNullType::Int)),
        "int8" => row
            .try_get::<_, i64>(idx)
            .ok()
            .map(SqlValue::Int)
            .unwrap_or(SqlValue::Null(SqlNullType::Int)),
        "float4" => row
            .try_get::<_, f32>(idx)
            .ok()
            .map(|v| SqlValue::Float(v.into()))
            .unwrap_or(SqlValue::Null(SqlNullType::Float)),
        "float8" => row
            .try_get::<_, f64>(idx)
            .ok()
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null(SqlNullType::Float)),
        "numeric" => row
            .try_get::<_, Decimal>(idx)
            .ok()
            .and_then(|d| d.to_f64())
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null(SqlNullType::Float)),
        "timestamptz" => row
            .try_get::<_, DateTime<Utc>>(idx)
            .ok()
            .map(SqlValue::Timestamp)
            .unwrap_or(SqlValue::Null(SqlNullType::Timestamp)),
        "timestamp" => row
            .try_get::<_, NaiveDateTime>(idx)
            .ok()
            .map(|v| SqlValue::Timestamp(v.and_utc()))
            .unwrap_or(SqlValue::Null(SqlNullType::Timestamp)),
        "date" => row
            .try_get::<_, NaiveDate>(idx)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|v| SqlValue::Timestamp(v.and_utc()))
            .unwrap_or(SqlValue::Null(SqlNullType::Timestamp)),
        "json" | "jsonb" => row
            .try_get::<_, serde_json::Value>(idx)
            .ok()
            .map(|v| SqlValue::Text(v.to_string()))
            .unwrap_or(SqlValue::Null(SqlNullType::Text)),
        _ => row
            .try_get::<_, String>(idx)
            .ok()
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null(SqlNullType::Text)),
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| MigrateError::target_unavailable(e, self.context("ping")))?;
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1)",
                &[&table],
            )
            .await
            .map_err(|e| MigrateError::query(e, self.context("checking table existence")))?;
        Ok(row.try_get::<_, bool>(0)?)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let client = self.client().await?;
        let rows = client
            .query(
                r#"
                SELECT
                    column_name::text,
                    data_type::text,
                    character_maximum_length::int4
                FROM information_schema.columns
                WHERE table_schema = current_schema() AND table_name = $1
                ORDER BY ordinal_position
                "#,
                &[&table],
            )
            .await
            .map_err(|e| MigrateError::query(e, self.context("loading columns")))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(ColumnInfo {
                name: row.try_get(0)?,
                data_type: row.try_get(1)?,
                max_length: row.try_get(2)?,
            });
        }

        debug!("Loaded {} columns for {}", columns.len(), table);
        Ok(columns)
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let client = self.client().await?;
        let boxed = to_params(params);
        let rows = client
            .query(sql, &param_refs(&boxed))
            .await
            .map_err(|e| MigrateError::query(e, self.context(sql)))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let client = self.client().await?;
        let boxed = to_params(params);
        client
            .execute(sql, &param_refs(&boxed))
            .await
            .map_err(|e| MigrateError::query(e, self.context(sql)))
    }

    async fn execute_atomic(&self, statements: &[String]) -> Result<()> {
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| MigrateError::query(e, self.context("beginning transaction")))?;

        for sql in statements {
            tx.batch_execute(sql)
                .await
                .map_err(|e| MigrateError::query(e, self.context(sql)))?;
        }

        tx.commit()
            .await
            .map_err(|e| MigrateError::query(e, self.context("committing transaction")))?;
        Ok(())
    }

    async fn insert_batch(&self, statements: &[Statement]) -> Result<Vec<RecordOutcome>> {
        let mut client = self.client().await?;
        let mut tx = client
            .transaction()
            .await
            .map_err(|e| MigrateError::query(e, self.context("beginning batch")))?;
        let mut outcomes = Vec::with_capacity(statements.len());

        for stmt in statements {
            let boxed = to_params(&stmt.params);
            let refs = param_refs(&boxed);

            let savepoint = tx
                .savepoint("record")
                .await
                .map_err(|e| MigrateError::query(e, self.context("creating savepoint")))?;

            match savepoint.query_opt(&stmt.sql, &refs).await {
                Ok(row) => {
                    savepoint
                        .commit()
                        .await
                        .map_err(|e| MigrateError::query(e, self.context("releasing savepoint")))?;
                    outcomes.push(Ok(row.as_ref().map(decode_row).and_then(|r| r.int("id"))));
                }
                Err(e) => {
                    savepoint
                        .rollback()
                        .await
                        .map_err(|e| MigrateError::query(e, self.context("rolling back record")))?;
                    outcomes.push(Err(e.to_string()));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| MigrateError::query(e, self.context("committing batch")))?;
        Ok(outcomes)
    }

    async fn close(&self) {
        self.pool.close();
    }
}
